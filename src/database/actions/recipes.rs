use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    composition::{replace_composition, validate_recipe_form},
    constants::RECIPE_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    jwt::SessionData,
    pagination::Page,
    schema::{IngredientLine, Recipe, RecipeForm, RecipeQuery, RecipeRow, RecipeView, Tag, Uuid},
};

use super::favorites::is_favorite;
use super::shopping_cart::is_in_shopping_cart;
use super::users::present_user;

/// Filtered, name-ordered recipe listing with a window total for paging.
/// Viewer-relative filters are skipped for anonymous viewers.
pub async fn fetch_recipes(
    query: &RecipeQuery,
    viewer: Option<Uuid>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeRow>, ApiError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = query.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if let Some(tag) = &query.tag {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags_map m INNER JOIN tags t ON t.id = m.tag_id WHERE m.recipe_id = r.id AND t.slug = ")
            .push_bind(tag.as_str())
            .push(")");
    }

    if let Some(viewer) = viewer {
        if query.favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if query.in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_carts sc WHERE sc.recipe_id = r.id AND sc.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    query_builder
        .push(" ORDER BY r.name LIMIT ")
        .push_bind(RECIPE_COUNT_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(Page::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset))
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe for mutation. Only the author may modify a recipe; admins
/// pass through `ManageAllRecipes`.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(ApiError::Unauthorized(String::from(
                        "Only the author may modify this recipe",
                    )))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ApiError::NotFound(String::from(
            "No recipe exists with specified id",
        ))),
    }
}

/// Validates the payload, then inserts the recipe and its composition as one
/// transaction. Nothing is persisted when any part of the submission fails.
pub async fn create_recipe(
    form: &RecipeForm,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    let composition = validate_recipe_form(form)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&form.name)
    .bind(&form.image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_composition(&mut tr, id.0, &composition).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(id.0)
}

/// Updates attributes and replaces the whole composition in one transaction.
pub async fn update_recipe(
    id: Uuid,
    form: &RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    let composition = validate_recipe_form(form)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5")
        .bind(&form.name)
        .bind(&form.image)
        .bind(&form.text)
        .bind(form.cooking_time)
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    replace_composition(&mut tr, recipe.id, &composition).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    for table in [
        "recipe_ingredients",
        "recipe_tags_map",
        "favorites",
        "shopping_carts",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
            .bind(recipe.id)
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
    }

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<IngredientLine>, ApiError> {
    let rows: Vec<IngredientLine> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(recipe_id: Uuid, pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags_map m
        INNER JOIN tags t ON t.id = m.tag_id
        WHERE m.recipe_id = $1
        ORDER BY t.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Read-side assembly of a full recipe representation. The derived booleans
/// come from single existence checks, never from loading whole collections.
pub async fn present_recipe(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => {
            return Err(ApiError::NotFound(String::from(
                "No recipe exists with specified id",
            )))
        }
    };

    let author = present_user(recipe.author_id, viewer, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;
    let tags = list_recipe_tags(recipe.id, pool).await?;

    let (is_favorited, is_in_cart) = match viewer {
        Some(viewer) => (
            is_favorite(recipe.id, viewer, pool).await?,
            is_in_shopping_cart(recipe.id, viewer, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart: is_in_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}
