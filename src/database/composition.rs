use std::collections::HashSet;

use sqlx::{Postgres, QueryBuilder, Transaction};

use crate::constants::{
    MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, NAME_MAX_LENGTH,
};

use super::error::{ApiError, QueryError};
use super::schema::{IngredientAmount, RecipeForm, Uuid};

/// The (ingredients, tags) portion of a recipe write payload.
#[derive(Debug, Clone)]
pub struct RecipeComposition {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

impl From<&RecipeForm> for RecipeComposition {
    fn from(form: &RecipeForm) -> Self {
        Self {
            ingredients: form.ingredients.clone(),
            tags: form.tags.clone(),
        }
    }
}

impl RecipeComposition {
    /// Both lists required and non-empty, references pairwise distinct,
    /// every amount within the configured bounds. Nothing is corrected
    /// silently; the first violation fails the whole submission.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.ingredients.is_empty() {
            return Err(ApiError::validation("ingredients", "This field is required"));
        }

        let ingredient_ids: HashSet<Uuid> = self.ingredients.iter().map(|part| part.id).collect();
        if ingredient_ids.len() != self.ingredients.len() {
            return Err(ApiError::validation(
                "ingredients",
                "Duplicate ingredients are not allowed",
            ));
        }

        for part in self.ingredients.iter() {
            if part.amount < MIN_INGREDIENT_AMOUNT || part.amount > MAX_INGREDIENT_AMOUNT {
                return Err(ApiError::validation(
                    "amount",
                    &format!(
                        "Amount must be between {MIN_INGREDIENT_AMOUNT} and {MAX_INGREDIENT_AMOUNT}"
                    ),
                ));
            }
        }

        if self.tags.is_empty() {
            return Err(ApiError::validation("tags", "This field is required"));
        }

        let tag_ids: HashSet<Uuid> = self.tags.iter().copied().collect();
        if tag_ids.len() != self.tags.len() {
            return Err(ApiError::validation("tags", "Duplicate tags are not allowed"));
        }

        Ok(())
    }
}

/// Validates a full recipe payload and hands back its composition.
pub fn validate_recipe_form(form: &RecipeForm) -> Result<RecipeComposition, ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::validation("name", "This field is required"));
    }
    if form.name.chars().count() > NAME_MAX_LENGTH {
        return Err(ApiError::validation("name", "Name is too long"));
    }
    if form.cooking_time < MIN_COOKING_TIME {
        return Err(ApiError::validation(
            "cooking_time",
            &format!("Cooking time must be at least {MIN_COOKING_TIME}"),
        ));
    }

    let composition = RecipeComposition::from(form);
    composition.validate()?;

    Ok(composition)
}

/// Replaces the recipe's ingredient and tag associations with exactly the
/// given set, inside the caller's transaction. A replace, never a merge:
/// prior rows are gone even if they do not reappear in the new set. A
/// nonexistent ingredient or tag id surfaces as a validation error through
/// foreign-key translation.
pub async fn replace_composition(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    composition: &RecipeComposition,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(composition.ingredients.iter(), |mut b, part| {
        b.push_bind(recipe_id).push_bind(part.id).push_bind(part.amount);
    });
    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags_map WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags_map (recipe_id, tag_id) ");
    query_builder.push_values(composition.tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: Uuid, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    fn composition() -> RecipeComposition {
        RecipeComposition {
            ingredients: vec![part(1, 100), part(2, 50)],
            tags: vec![1, 2],
        }
    }

    #[test]
    fn a_valid_composition_passes() {
        assert!(composition().validate().is_ok());
    }

    #[test]
    fn empty_ingredients_are_rejected() {
        let mut c = composition();
        c.ingredients.clear();
        assert_eq!(
            c.validate(),
            Err(ApiError::validation("ingredients", "This field is required"))
        );
    }

    #[test]
    fn duplicate_ingredient_ids_are_rejected() {
        let mut c = composition();
        c.ingredients = vec![part(1, 100), part(1, 50)];
        assert_eq!(
            c.validate(),
            Err(ApiError::validation(
                "ingredients",
                "Duplicate ingredients are not allowed"
            ))
        );
    }

    #[test]
    fn amount_boundaries_are_inclusive() {
        let mut c = composition();

        c.ingredients = vec![part(1, MIN_INGREDIENT_AMOUNT)];
        assert!(c.validate().is_ok());

        c.ingredients = vec![part(1, MAX_INGREDIENT_AMOUNT)];
        assert!(c.validate().is_ok());

        c.ingredients = vec![part(1, MIN_INGREDIENT_AMOUNT - 1)];
        assert!(c.validate().is_err());

        c.ingredients = vec![part(1, MAX_INGREDIENT_AMOUNT + 1)];
        assert!(c.validate().is_err());
    }

    #[test]
    fn empty_and_duplicate_tags_are_rejected() {
        let mut c = composition();
        c.tags.clear();
        assert!(c.validate().is_err());

        c.tags = vec![3, 3];
        assert_eq!(
            c.validate(),
            Err(ApiError::validation("tags", "Duplicate tags are not allowed"))
        );
    }

    #[test]
    fn form_level_rules_cover_name_and_cooking_time() {
        let form = RecipeForm {
            name: String::from("Borscht"),
            image: String::from("recipes/images/borscht.png"),
            text: String::from("Classic beet soup."),
            cooking_time: MIN_COOKING_TIME,
            ingredients: vec![part(1, 300)],
            tags: vec![1],
        };
        assert!(validate_recipe_form(&form).is_ok());

        let mut bad = form.clone();
        bad.name = String::from("   ");
        assert!(validate_recipe_form(&bad).is_err());

        let mut bad = form.clone();
        bad.cooking_time = MIN_COOKING_TIME - 1;
        assert!(validate_recipe_form(&bad).is_err());

        let mut bad = form;
        bad.name = "x".repeat(NAME_MAX_LENGTH + 1);
        assert!(validate_recipe_form(&bad).is_err());
    }
}
