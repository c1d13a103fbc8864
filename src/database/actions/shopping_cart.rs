use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    error::{ApiError, QueryError},
    schema::{CartIngredientRow, ShoppingListRow, Uuid},
};

use super::recipes::get_recipe;

pub async fn is_in_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM shopping_carts WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn add_to_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::NotFound(String::from(
            "No recipe exists with specified id",
        )));
    }

    let result = sqlx::query(
        "INSERT INTO shopping_carts (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::invalid("Recipe is already in the shopping cart"));
    }

    Ok(())
}

/// Removing a pair that was never added is a client error (400), distinct
/// from the recipe itself not existing (404).
pub async fn remove_from_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::NotFound(String::from(
            "No recipe exists with specified id",
        )));
    }

    let result = sqlx::query("DELETE FROM shopping_carts WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotPresent(String::from(
            "Recipe is not in the shopping cart",
        )));
    }

    Ok(())
}

/// Every ingredient row belonging to any recipe in the user's cart, one row
/// per (recipe, ingredient) pair.
pub async fn fetch_cart_ingredient_rows(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, ApiError> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Groups by (name, measurement_unit) — semantic identity, not row id — and
/// sums amounts. Output is ordered alphabetically by name, then unit.
pub fn sum_cart_ingredients(rows: Vec<CartIngredientRow>) -> Vec<ShoppingListRow> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListRow {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

/// Renders the plain-text export: a header line, then one line per
/// aggregated group.
pub fn format_shopping_list(rows: &[ShoppingListRow]) -> String {
    let mut lines = vec![format!("{SHOPPING_LIST_HEADER}\n")];
    lines.extend(rows.iter().map(|row| {
        format!("\n{} - {}, {}", row.name, row.total_amount, row.measurement_unit)
    }));

    lines.join("\n")
}

pub async fn export_shopping_list(user_id: Uuid, pool: &Pool<Postgres>) -> Result<String, ApiError> {
    let rows = fetch_cart_ingredient_rows(user_id, pool).await?;
    let aggregated = sum_cart_ingredients(rows);

    Ok(format_shopping_list(&aggregated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn amounts_merge_by_name_and_unit() {
        let rows = vec![row("Salt", "g", 5), row("Salt", "g", 7)];
        let aggregated = sum_cart_ingredients(rows);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].name, "Salt");
        assert_eq!(aggregated[0].total_amount, 12);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let forward = sum_cart_ingredients(vec![
            row("Salt", "g", 5),
            row("Olive oil", "ml", 30),
            row("Salt", "g", 7),
        ]);
        let backward = sum_cart_ingredients(vec![
            row("Salt", "g", 7),
            row("Olive oil", "ml", 30),
            row("Salt", "g", 5),
        ]);

        assert_eq!(forward, backward);
    }

    #[test]
    fn same_name_under_another_unit_stays_separate() {
        let aggregated = sum_cart_ingredients(vec![row("Salt", "g", 5), row("Salt", "tsp", 2)]);

        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].measurement_unit, "g");
        assert_eq!(aggregated[1].measurement_unit, "tsp");
    }

    #[test]
    fn removing_a_recipe_reduces_the_sum() {
        let both = sum_cart_ingredients(vec![row("Salt", "g", 5), row("Salt", "g", 7)]);
        let one = sum_cart_ingredients(vec![row("Salt", "g", 7)]);

        assert_eq!(both[0].total_amount, 12);
        assert_eq!(one[0].total_amount, 7);
    }

    #[test]
    fn output_is_ordered_alphabetically() {
        let aggregated = sum_cart_ingredients(vec![
            row("Salt", "g", 5),
            row("Beetroot", "g", 300),
            row("Olive oil", "ml", 30),
        ]);

        let names: Vec<&str> = aggregated.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Beetroot", "Olive oil", "Salt"]);
    }

    #[test]
    fn export_layout_matches_the_reference_renderer() {
        let aggregated = sum_cart_ingredients(vec![
            row("Salt", "g", 5),
            row("Olive oil", "ml", 30),
            row("Salt", "g", 7),
        ]);
        let text = format_shopping_list(&aggregated);

        assert_eq!(text, "Shopping List:\n\n\nOlive oil - 30, ml\n\nSalt - 12, g");
    }

    #[test]
    fn empty_cart_exports_only_the_header() {
        assert_eq!(format_shopping_list(&[]), "Shopping List:\n");
    }
}
