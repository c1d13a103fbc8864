use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    schema::{RecipeSummary, SubscriptionView, User, Uuid},
};

use super::users::get_user_by_id;

/// A subscription must point at another identity.
pub fn validate_subscription_target(user_id: Uuid, author_id: Uuid) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::invalid("You cannot subscribe to yourself"));
    }

    Ok(())
}

pub async fn is_subscribed(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = $2
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn subscribe(user_id: Uuid, author_id: Uuid, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    validate_subscription_target(user_id, author_id)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::NotFound(String::from(
            "No user exists with specified id",
        )));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::invalid("You are already subscribed to this user"));
    }

    Ok(())
}

/// Unsubscribing without a subscription row is a client error (400), kept
/// distinct from the author not existing (404).
pub async fn unsubscribe(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::NotFound(String::from(
            "No user exists with specified id",
        )));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotPresent(String::from(
            "You are not subscribed to this user",
        )));
    }

    Ok(())
}

/// Every author the user follows, annotated with that author's recipes
/// (truncated to `recipes_limit` when given) and the total recipe count.
pub async fn list_subscriptions(
    user_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, ApiError> {
    let authors: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        let recipes = list_author_recipes(author.id, recipes_limit, pool).await?;
        let recipes_count = count_author_recipes(author.id, pool).await?;

        views.push(SubscriptionView {
            id: author.id,
            email: author.email,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            avatar: author.avatar,
            is_subscribed: true,
            recipes,
            recipes_count,
        });
    }

    Ok(views)
}

async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, ApiError> {
    let rows: Vec<RecipeSummary> = match limit {
        Some(limit) => sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1 ORDER BY name LIMIT $2
        ",
        )
        .bind(author_id)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1 ORDER BY name
        ",
        )
        .bind(author_id)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
    };

    Ok(rows)
}

async fn count_author_recipes(author_id: Uuid, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_subscription_always_fails() {
        let err = validate_subscription_target(7, 7).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn distinct_identities_pass_the_target_check() {
        assert!(validate_subscription_target(7, 8).is_ok());
    }
}
