use serde::Deserialize;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{ApiError, QueryError, TypeError},
    schema::{Ingredient, Uuid},
};

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

/// Case-insensitive prefix search over ingredient names.
pub async fn search_ingredients(
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 || '%' ORDER BY name")
            .bind(name)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// The (name, measurement_unit) pair is unique; the same name under another
/// unit is a distinct row.
pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some((id,)) => Ok(id),
        None => Err(ApiError::invalid(
            "An ingredient with this name and measurement unit already exists",
        )),
    }
}

/// Bulk-loads `[{ "name": ..., "measurement_unit": ... }]` records, skipping
/// pairs that already exist. Returns the number of rows inserted.
pub async fn import_ingredients(json: &str, pool: &Pool<Postgres>) -> Result<u64, ApiError> {
    let records: Vec<IngredientRecord> = serde_json::from_str(json)
        .map_err(|_| TypeError::new("Invalid ingredient import payload"))?;

    if records.is_empty() {
        return Ok(0);
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
    query_builder.push_values(records.iter(), |mut b, record| {
        b.push_bind(record.name.as_str())
            .push_bind(record.measurement_unit.as_str());
    });
    query_builder.push(" ON CONFLICT DO NOTHING");

    let result = query_builder
        .build()
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!(
        "imported {} of {} ingredient records",
        result.rows_affected(),
        records.len()
    );

    Ok(result.rows_affected())
}
