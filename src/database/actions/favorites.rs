use sqlx::{Pool, Postgres};

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    pagination::Page,
    schema::{RecipeSummary, RecipeSummaryRow, Uuid},
};

use super::recipes::get_recipe;

pub async fn is_favorite(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM favorites WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

/// The unique (user, recipe) pair makes a concurrent double-add resolve to
/// exactly one success; the loser surfaces the same validation error as a
/// sequential duplicate.
pub async fn add_to_favorites(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::NotFound(String::from(
            "No recipe exists with specified id",
        )));
    }

    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::invalid("Recipe is already in favorites"));
    }

    Ok(())
}

/// Removing a pair that was never added is a client error (400), distinct
/// from the recipe itself not existing (404).
pub async fn remove_from_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::NotFound(String::from(
            "No recipe exists with specified id",
        )));
    }

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotPresent(String::from(
            "Recipe is not in favorites",
        )));
    }

    Ok(())
}

pub async fn fetch_favorites(
    user_id: Uuid,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeSummary>, ApiError> {
    let rows: Vec<RecipeSummaryRow> = sqlx::query_as(
        "
        SELECT r.id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
        FROM favorites f
        INNER JOIN recipes r ON r.id = f.recipe_id
        WHERE f.user_id = $1
        ORDER BY r.name
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(RECIPE_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let rows: Vec<RecipeSummary> = rows.into_iter().map(RecipeSummary::from).collect();

    Ok(Page::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset))
}
