use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{RecipeFilter, RecipeMinified, RecipeRead, RecipeWrite},
    repo,
    services::{self, create_recipe, delete_recipe, read_view, update_recipe},
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
        .route("/recipes", get(list_recipes).post(create))
        .route("/recipes/:id", get(get_recipe).patch(update).delete(delete))
        .route("/recipes/:id/favorite", post(add_favorite).delete(remove_favorite))
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

async fn current_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeRead>>, AppError> {
    let filter = RecipeFilter::from_pairs(pairs)?;
    let defaults = Pagination::default();
    let page = Pagination {
        limit: filter.limit.unwrap_or(defaults.limit),
        offset: filter.offset.unwrap_or(defaults.offset),
    }
    .normalized();

    let (count, rows) = repo::list(&state.db, &filter, viewer, page).await?;
    let mut results = Vec::with_capacity(rows.len());
    for recipe in rows {
        results.push(read_view(&state, viewer, recipe).await?);
    }
    Ok(Json(Page { count, results }))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeRead>, AppError> {
    let recipe = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe"))?;
    Ok(Json(read_view(&state, viewer, recipe).await?))
}

#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<RecipeWrite>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeRead>), AppError> {
    let recipe = create_recipe(&state, user_id, body).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/recipes/{}", recipe.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(read_view(&state, Some(user_id), recipe).await?),
    ))
}

#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RecipeWrite>,
) -> Result<Json<RecipeRead>, AppError> {
    let user = current_user(&state, user_id).await?;
    let recipe = update_recipe(&state, &user, id, body).await?;
    Ok(Json(read_view(&state, Some(user_id), recipe).await?))
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, user_id).await?;
    delete_recipe(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_recipe_relation(
    state: &AppState,
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<(StatusCode, Json<RecipeMinified>), AppError> {
    let store = PgRelationStore::new(state.db.clone());
    add_relation(&store, &state.messages, kind, user_id, recipe_id).await?;
    let recipe = repo::get(&state.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe"))?;
    let body = services::minified(state.storage.as_ref(), &recipe).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

async fn remove_recipe_relation(
    state: &AppState,
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<StatusCode, AppError> {
    let store = PgRelationStore::new(state.db.clone());
    remove_relation(&store, &state.messages, kind, user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeMinified>), AppError> {
    add_recipe_relation(&state, RelationKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    remove_recipe_relation(&state, RelationKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeMinified>), AppError> {
    add_recipe_relation(&state, RelationKind::Purchase, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    remove_recipe_relation(&state, RelationKind::Purchase, user_id, id).await
}
