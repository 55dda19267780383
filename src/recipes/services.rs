use std::collections::HashSet;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{RecipeMinified, RecipeRead, RecipeWrite},
    images::{decode_data_url, discard_image, image_url, store_recipe_image},
    repo::{self, Recipe, RecipeFields},
};
use crate::{
    auth::repo::User,
    error::AppError,
    relations::{PgRelationStore, RelationKind, RelationStore},
    state::AppState,
    storage::StorageClient,
    tags, users,
};

const MIN_AMOUNT_MESSAGE: &str = "Ensure this value is greater than or equal to 1.";

/// Checks everything that does not need the database. Runs before any write.
pub fn validate_write(body: &RecipeWrite, creating: bool) -> Result<(), AppError> {
    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > 200 {
        return Err(AppError::validation("name must be 1 to 200 characters"));
    }
    if body.text.trim().is_empty() {
        return Err(AppError::validation("text must not be empty"));
    }
    if body.cooking_time < 1 {
        return Err(AppError::validation(format!("cooking_time: {}", MIN_AMOUNT_MESSAGE)));
    }
    if creating && body.image.is_none() {
        return Err(AppError::validation("image is required"));
    }
    if body.ingredients.is_empty() {
        return Err(AppError::validation("at least one ingredient is required"));
    }

    let mut seen = HashSet::with_capacity(body.ingredients.len());
    for item in &body.ingredients {
        if item.amount < 1 {
            return Err(AppError::validation(format!("amount: {}", MIN_AMOUNT_MESSAGE)));
        }
        if !seen.insert(item.id) {
            return Err(AppError::validation(format!("ingredient {} is listed twice", item.id)));
        }
    }
    Ok(())
}

pub fn can_modify(user: &User, recipe: &Recipe) -> bool {
    user.is_staff || recipe.author_id == user.id
}

async fn ensure_references(state: &AppState, body: &RecipeWrite) -> Result<(), AppError> {
    let ingredient_ids: Vec<Uuid> = body.ingredients.iter().map(|i| i.id).collect();
    if let Some(id) = repo::missing_ingredients(&state.db, &ingredient_ids).await?.first() {
        warn!(ingredient_id = %id, "unknown ingredient in recipe");
        return Err(AppError::not_found("ingredient"));
    }
    if let Some(id) = repo::missing_tags(&state.db, &body.tags).await?.first() {
        warn!(tag_id = %id, "unknown tag in recipe");
        return Err(AppError::not_found("tag"));
    }
    Ok(())
}

pub async fn create_recipe(
    state: &AppState,
    author_id: Uuid,
    body: RecipeWrite,
) -> Result<Recipe, AppError> {
    validate_write(&body, true)?;
    ensure_references(state, &body).await?;

    let image = decode_data_url(body.image.as_deref().unwrap_or_default())?;
    let recipe_id = Uuid::new_v4();
    let key = store_recipe_image(state.storage.as_ref(), author_id, recipe_id, image).await?;

    let fields = RecipeFields {
        name: body.name.trim(),
        image: &key,
        text: &body.text,
        cooking_time: body.cooking_time,
    };
    let written = async {
        let mut tx = state.db.begin().await.context("begin tx")?;
        let recipe = repo::insert_tx(&mut tx, recipe_id, author_id, &fields).await?;
        repo::replace_ingredients_tx(&mut tx, recipe.id, &body.ingredients).await?;
        repo::replace_tags_tx(&mut tx, recipe.id, &body.tags).await?;
        tx.commit().await.context("commit tx")?;
        anyhow::Ok(recipe)
    }
    .await;

    match written {
        Ok(recipe) => {
            info!(recipe_id = %recipe.id, %author_id, "recipe created");
            Ok(recipe)
        }
        Err(e) => {
            discard_image(state.storage.as_ref(), &key).await;
            Err(e.into())
        }
    }
}

/// Replaces the recipe's fields, ingredient rows and tags in one transaction.
/// A rejected request leaves the recipe untouched.
pub async fn update_recipe(
    state: &AppState,
    user: &User,
    recipe_id: Uuid,
    body: RecipeWrite,
) -> Result<Recipe, AppError> {
    let current = repo::get(&state.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe"))?;
    if !can_modify(user, &current) {
        warn!(%recipe_id, user_id = %user.id, "recipe update forbidden");
        return Err(AppError::Forbidden);
    }
    validate_write(&body, false)?;
    ensure_references(state, &body).await?;

    let new_key = match body.image.as_deref() {
        Some(raw) => {
            let image = decode_data_url(raw)?;
            Some(store_recipe_image(state.storage.as_ref(), current.author_id, recipe_id, image).await?)
        }
        None => None,
    };

    let fields = RecipeFields {
        name: body.name.trim(),
        image: new_key.as_deref().unwrap_or(current.image.as_str()),
        text: &body.text,
        cooking_time: body.cooking_time,
    };
    let written = async {
        let mut tx = state.db.begin().await.context("begin tx")?;
        if repo::get_for_update_tx(&mut tx, recipe_id).await?.is_none() {
            return Ok(None);
        }
        let recipe = repo::update_tx(&mut tx, recipe_id, &fields).await?;
        repo::replace_ingredients_tx(&mut tx, recipe_id, &body.ingredients).await?;
        repo::replace_tags_tx(&mut tx, recipe_id, &body.tags).await?;
        tx.commit().await.context("commit tx")?;
        anyhow::Ok(Some(recipe))
    }
    .await;

    match written {
        Ok(Some(recipe)) => {
            if new_key.is_some() {
                discard_image(state.storage.as_ref(), &current.image).await;
            }
            info!(%recipe_id, user_id = %user.id, "recipe updated");
            Ok(recipe)
        }
        other => {
            if let Some(key) = &new_key {
                discard_image(state.storage.as_ref(), key).await;
            }
            match other {
                Ok(_) => Err(AppError::not_found("recipe")),
                Err(e) => Err(e.into()),
            }
        }
    }
}

pub async fn delete_recipe(state: &AppState, user: &User, recipe_id: Uuid) -> Result<(), AppError> {
    let current = repo::get(&state.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe"))?;
    if !can_modify(user, &current) {
        warn!(%recipe_id, user_id = %user.id, "recipe delete forbidden");
        return Err(AppError::Forbidden);
    }
    if !repo::delete(&state.db, recipe_id).await? {
        return Err(AppError::not_found("recipe"));
    }
    discard_image(state.storage.as_ref(), &current.image).await;
    info!(%recipe_id, user_id = %user.id, "recipe deleted");
    Ok(())
}

pub async fn minified(storage: &dyn StorageClient, recipe: &Recipe) -> anyhow::Result<RecipeMinified> {
    Ok(RecipeMinified {
        id: recipe.id,
        name: recipe.name.clone(),
        image: image_url(storage, &recipe.image).await?,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn read_view(
    state: &AppState,
    viewer: Option<Uuid>,
    recipe: Recipe,
) -> Result<RecipeRead, AppError> {
    let author = User::find_by_id(&state.db, recipe.author_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    let store = PgRelationStore::new(state.db.clone());
    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            store.exists(RelationKind::Favorite, user_id, recipe.id).await?,
            store.exists(RelationKind::Purchase, user_id, recipe.id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeRead {
        id: recipe.id,
        tags: tags::repo::list_for_recipe(&state.db, recipe.id).await?,
        author: users::services::profile(&store, viewer, &author).await?,
        ingredients: repo::ingredients_for(&state.db, recipe.id).await?,
        is_favorited,
        is_in_shopping_cart,
        image: image_url(state.storage.as_ref(), &recipe.image).await?,
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::dto::IngredientAmount;

    fn body(amounts: &[i32]) -> RecipeWrite {
        RecipeWrite {
            name: "Borscht".into(),
            image: Some("data:image/png;base64,AAAA".into()),
            text: "Simmer.".into(),
            cooking_time: 90,
            tags: vec![],
            ingredients: amounts
                .iter()
                .map(|&amount| IngredientAmount {
                    id: Uuid::new_v4(),
                    amount,
                })
                .collect(),
        }
    }

    fn user(is_staff: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            username: "a".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password_hash: String::new(),
            is_staff,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    fn recipe_by(author_id: Uuid) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            author_id,
            name: "Borscht".into(),
            image: "recipes/x.png".into(),
            text: "Simmer.".into(),
            cooking_time: 90,
            pub_date: time::OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn accepts_positive_amounts() {
        assert!(validate_write(&body(&[1, 250]), true).is_ok());
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        for bad in [0, -5] {
            let err = validate_write(&body(&[100, bad]), false).unwrap_err();
            assert!(
                matches!(err, AppError::Validation(ref m) if m.contains("greater than or equal to 1")),
                "amount {bad} accepted"
            );
        }
    }

    #[test]
    fn rejects_duplicate_ingredients() {
        let mut b = body(&[10, 20]);
        b.ingredients[1].id = b.ingredients[0].id;
        assert!(matches!(validate_write(&b, true), Err(AppError::Validation(_))));
    }

    #[test]
    fn image_required_only_on_create() {
        let mut b = body(&[10]);
        b.image = None;
        assert!(validate_write(&b, true).is_err());
        assert!(validate_write(&b, false).is_ok());
    }

    #[test]
    fn rejects_bad_scalars() {
        let mut b = body(&[10]);
        b.cooking_time = 0;
        assert!(validate_write(&b, true).is_err());

        let mut b = body(&[10]);
        b.name = "   ".into();
        assert!(validate_write(&b, true).is_err());

        assert!(validate_write(&body(&[]), true).is_err());
    }

    #[test]
    fn only_author_or_staff_modify() {
        let author = user(false);
        let recipe = recipe_by(author.id);
        assert!(can_modify(&author, &recipe));
        assert!(!can_modify(&user(false), &recipe));
        assert!(can_modify(&user(true), &recipe));
    }
}
