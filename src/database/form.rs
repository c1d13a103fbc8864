use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::error::{ApiError, TypeError};

pub type FormData = HashMap<String, Value>;

/// Typed access into a JSON form payload. Handler crates deserialize request
/// bodies into a `FormData` map and pull fields out through this wrapper.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, ApiError>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| TypeError::new("Invalid type conversion").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, ApiError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => v
                    .to_owned()
                    .parse()
                    .map_err(|_e| TypeError::new("Invalid type conversion").into()),
                None => Err(TypeError::new("Failed to parse value as str").into()),
            },
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Invalid key")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RecipeForm, UserRole};
    use serde_json::json;

    fn form(value: Value) -> Form {
        Form::from_data(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn decodes_a_recipe_payload() {
        let form = form(json!({
            "recipe": {
                "name": "Borscht",
                "image": "recipes/images/borscht.png",
                "text": "Classic beet soup.",
                "cooking_time": 90,
                "ingredients": [{"id": 1, "amount": 300}, {"id": 2, "amount": 50}],
                "tags": [1, 2]
            }
        }));

        let recipe: RecipeForm = form.get_value("recipe").unwrap();
        assert_eq!(recipe.name, "Borscht");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.tags, vec![1, 2]);
    }

    #[test]
    fn missing_keys_and_bad_types_are_validation_errors() {
        let form = form(json!({"cooking_time": "45", "role": "admin"}));

        assert_eq!(form.get_number::<i32>("cooking_time").unwrap(), 45);
        assert!(form.get_number::<i32>("missing").is_err());
        assert!(form.get_str("cooking_time").is_ok());
        assert_eq!(form.get_value::<UserRole>("role").unwrap(), UserRole::Admin);
        assert!(form.get_value::<RecipeForm>("cooking_time").is_err());
    }
}
