use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::pagination::parse_flag;
use crate::tags::Tag;
use crate::users::dto::UserProfile;

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Body of recipe create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeWrite {
    pub name: String,
    /// Base64 data URL. Required on create; on update `None` keeps the current image.
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeIngredientRead {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeRead {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientRead>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

/// Short form used in relation responses and author profiles.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeMinified {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Default)]
pub struct RecipeFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub author: Option<Uuid>,
    /// Tag slugs; a recipe matches if it has any of them.
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    /// Builds the filter from raw query pairs. `tags` may be repeated and
    /// each value may itself be a comma separated list. Unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        fn invalid(key: &str, value: &str) -> AppError {
            AppError::validation(format!("invalid {} `{}`", key, value))
        }

        let mut filter = Self::default();
        for (key, value) in pairs {
            let raw = value.trim();
            match key.as_str() {
                "limit" => filter.limit = Some(raw.parse().map_err(|_| invalid(&key, raw))?),
                "offset" => filter.offset = Some(raw.parse().map_err(|_| invalid(&key, raw))?),
                "author" => filter.author = Some(raw.parse().map_err(|_| invalid(&key, raw))?),
                "tags" => filter.tags.extend(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                ),
                "is_favorited" => filter.is_favorited = parse_flag(raw).map_err(AppError::validation)?,
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = parse_flag(raw).map_err(AppError::validation)?
                }
                _ => {}
            }
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    fn filter_from(uri: &str) -> Result<RecipeFilter, AppError> {
        let uri: Uri = uri.parse().unwrap();
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&uri).unwrap();
        RecipeFilter::from_pairs(pairs)
    }

    #[test]
    fn tags_accept_repeated_and_comma_forms() {
        let f = filter_from("/api/recipes?tags=breakfast&tags=lunch,,dinner%20&tags=").unwrap();
        assert_eq!(f.tags, vec!["breakfast", "lunch", "dinner"]);
        assert!(filter_from("/api/recipes").unwrap().tags.is_empty());
    }

    #[test]
    fn scalar_params_and_flags() {
        let author = Uuid::new_v4();
        let f = filter_from(&format!(
            "/api/recipes?limit=3&offset=6&author={}&is_favorited=1&is_in_shopping_cart=false&page=2",
            author
        ))
        .unwrap();
        assert_eq!(f.limit, Some(3));
        assert_eq!(f.offset, Some(6));
        assert_eq!(f.author, Some(author));
        assert_eq!(f.is_favorited, Some(true));
        assert_eq!(f.is_in_shopping_cart, Some(false));
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        for uri in [
            "/api/recipes?limit=many",
            "/api/recipes?author=nobody",
            "/api/recipes?is_favorited=maybe",
        ] {
            assert!(
                matches!(filter_from(uri), Err(AppError::Validation(_))),
                "accepted {uri}"
            );
        }
    }

    #[test]
    fn write_body_parses() {
        let body: RecipeWrite = serde_json::from_str(
            r#"{
                "name": "Pancakes",
                "image": null,
                "text": "Mix and fry.",
                "cooking_time": 20,
                "tags": [],
                "ingredients": [{"id": "7f1d1c33-39f5-4c34-9c6b-7a6f0e6c2b11", "amount": 200}]
            }"#,
        )
        .unwrap();
        assert_eq!(body.ingredients[0].amount, 200);
        assert!(body.image.is_none());
    }
}
