use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    schema::{Tag, Uuid},
};

/// Seeds a classification label. Tags are read-only through the API; this
/// exists for the administrative side. A duplicate name or slug fails as a
/// validation error through constraint translation.
pub async fn create_tag(name: &str, slug: &str, pool: &Pool<Postgres>) -> Result<Uuid, ApiError> {
    let id: (Uuid,) = sqlx::query_as("INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(id.0)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, ApiError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.map(|tag| tag.0))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}
