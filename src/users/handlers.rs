use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{SubscriptionProfile, SubscriptionQuery, UserProfile},
    repo,
    services::{profile, subscription_profile},
};
use crate::{
    auth::{repo::User, AuthUser, MaybeUser},
    error::AppError,
    pagination::{Page, Pagination},
    relations::{add_relation, remove_relation, PgRelationStore, RelationKind},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id", get(get_user))
        .route("/users/:id/subscribe", post(subscribe).delete(unsubscribe))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Page<UserProfile>>, AppError> {
    let (count, users) = repo::list(&state.db, p.normalized()).await?;
    let store = PgRelationStore::new(state.db.clone());
    let mut results = Vec::with_capacity(users.len());
    for user in &users {
        results.push(profile(&store, viewer, user).await?);
    }
    Ok(Json(Page { count, results }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    let store = PgRelationStore::new(state.db.clone());
    Ok(Json(profile(&store, viewer, &user).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let store = PgRelationStore::new(state.db.clone());
    Ok(Json(profile(&store, Some(user_id), &user).await?))
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SubscriptionQuery>,
) -> Result<Json<Page<SubscriptionProfile>>, AppError> {
    let defaults = Pagination::default();
    let page = Pagination {
        limit: q.limit.unwrap_or(defaults.limit),
        offset: q.offset.unwrap_or(defaults.offset),
    }
    .normalized();

    let (count, authors) = repo::followed_authors(&state.db, user_id, page).await?;
    let store = PgRelationStore::new(state.db.clone());
    let mut results = Vec::with_capacity(authors.len());
    for author in &authors {
        results.push(subscription_profile(&state, &store, user_id, author, q.recipes_limit).await?);
    }
    Ok(Json(Page { count, results }))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubscriptionProfile>), AppError> {
    let store = PgRelationStore::new(state.db.clone());
    add_relation(&store, &state.messages, RelationKind::Subscription, user_id, author_id).await?;

    let author = User::find_by_id(&state.db, author_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    let body = subscription_profile(&state, &store, user_id, &author, None).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let store = PgRelationStore::new(state.db.clone());
    remove_relation(&store, &state.messages, RelationKind::Subscription, user_id, author_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
