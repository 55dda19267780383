use uuid::Uuid;

use super::dto::{SubscriptionProfile, UserProfile};
use crate::{
    auth::repo::User,
    recipes,
    relations::{RelationKind, RelationStore},
    state::AppState,
};

pub async fn profile<S>(store: &S, viewer: Option<Uuid>, user: &User) -> anyhow::Result<UserProfile>
where
    S: RelationStore + ?Sized,
{
    let is_subscribed = match viewer {
        Some(viewer_id) if viewer_id != user.id => {
            store
                .exists(RelationKind::Subscription, viewer_id, user.id)
                .await?
        }
        _ => false,
    };
    Ok(UserProfile {
        email: user.email.clone(),
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_subscribed,
    })
}

/// `recipes_limit` of `None` or below zero returns every recipe.
pub async fn subscription_profile<S>(
    state: &AppState,
    store: &S,
    viewer: Uuid,
    author: &User,
    recipes_limit: Option<i64>,
) -> anyhow::Result<SubscriptionProfile>
where
    S: RelationStore + ?Sized,
{
    let limit = recipes_limit.filter(|l| *l >= 0);
    let rows = recipes::repo::list_by_author(&state.db, author.id, limit).await?;
    let mut recipes = Vec::with_capacity(rows.len());
    for recipe in &rows {
        recipes.push(recipes::services::minified(state.storage.as_ref(), recipe).await?);
    }
    Ok(SubscriptionProfile {
        profile: profile(store, Some(viewer), author).await?,
        recipes,
        recipes_count: recipes::repo::count_by_author(&state.db, author.id).await?,
    })
}
