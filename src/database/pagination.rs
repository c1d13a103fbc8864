use serde::Serialize;

use crate::constants::{MAX_PAGE_SIZE, RECIPE_COUNT_PER_PAGE};

/// One page of a listing. `count` is the total over the whole filtered set,
/// taken from a window count the listing query carries on every row.
#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(results: Vec<T>, count: i64, page_size: i64, offset: i64) -> Self {
        if results.is_empty() {
            return Self::empty();
        }

        let next_offset = if offset + page_size < count {
            Some(offset + page_size)
        } else {
            None
        };
        let prev_offset = if offset > 0 {
            Some((offset - page_size).max(0))
        } else {
            None
        };

        Self {
            count,
            next_offset,
            prev_offset,
            results,
        }
    }

    pub fn empty() -> Self {
        Self {
            count: 0,
            next_offset: None,
            prev_offset: None,
            results: vec![],
        }
    }
}

/// Bounds a caller-supplied `limit` query parameter.
pub fn clamp_page_size(limit: Option<i64>) -> i64 {
    match limit {
        Some(limit) => limit.clamp(1, MAX_PAGE_SIZE),
        None => RECIPE_COUNT_PER_PAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_prev() {
        let page = Page::from_rows(vec![1, 2, 3], 8, 3, 0);
        assert_eq!(page.count, 8);
        assert_eq!(page.next_offset, Some(3));
        assert_eq!(page.prev_offset, None);
    }

    #[test]
    fn middle_page_points_both_ways() {
        let page = Page::from_rows(vec![4, 5, 6], 8, 3, 3);
        assert_eq!(page.next_offset, Some(6));
        assert_eq!(page.prev_offset, Some(0));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::from_rows(vec![7, 8], 8, 3, 6);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(3));
    }

    #[test]
    fn empty_result_is_the_empty_page() {
        let page: Page<i32> = Page::from_rows(vec![], 0, 3, 0);
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(None), RECIPE_COUNT_PER_PAGE);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(3)), 3);
        assert_eq!(clamp_page_size(Some(100)), MAX_PAGE_SIZE);
    }
}
