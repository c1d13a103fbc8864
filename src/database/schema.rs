use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TypeError;

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub uid: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Recipe row carrying the window total of the filtered result set.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,

    pub count: i64,
}

/// Brief recipe shape embedded in favorite, cart and subscription responses.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,

    pub count: i64,
}

impl From<RecipeSummaryRow> for RecipeSummary {
    fn from(row: RecipeSummaryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            cooking_time: row.cooking_time,
        }
    }
}

/// One ingredient of a recipe, joined with its amount.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLine {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Flat join row over every recipe in a user's cart; aggregation input.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListRow {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

impl TryFrom<Value> for IngredientAmount {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|_| TypeError::new("Invalid ingredient reference"))
    }
}

/// Recipe write payload. Ingredients are (id, amount) pairs, tags are ids;
/// the image is an opaque reference produced by the upload collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

impl TryFrom<Value> for RecipeForm {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|_| TypeError::new("Invalid recipe payload"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl TryFrom<Value> for SignUpForm {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|_| TypeError::new("Invalid sign-up payload"))
    }
}

/// Listing filter for `fetch_recipes`. Viewer-relative filters are ignored
/// for anonymous viewers.
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub author: Option<Uuid>,
    pub tag: Option<String>,
    pub favorited: bool,
    pub in_shopping_cart: bool,
}
