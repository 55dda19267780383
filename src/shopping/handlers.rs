use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, info, instrument};

use super::{repo::PgShoppingSource, services::collect};
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub const SHOPPING_LIST_FILENAME: &str = "Purchase_list.txt";

pub fn routes() -> Router<AppState> {
    Router::new().route("/recipes/download_shopping_cart", get(download_shopping_cart))
}

/// Rendered shopping list delivered as a file download.
pub struct ShoppingListFile(pub String);

impl IntoResponse for ShoppingListFile {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
                ),
            ],
            self.0,
        )
            .into_response()
    }
}

#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ShoppingListFile, AppError> {
    let source = PgShoppingSource::new(state.db.clone());
    let list = collect(&source, user_id).await?;
    if list.is_empty() {
        debug!(%user_id, "shopping cart is empty");
    }
    info!(
        %user_id,
        items = list.len(),
        unit_conflicts = list.unit_conflicts().len(),
        "shopping list rendered"
    );
    Ok(ShoppingListFile(list.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopping::aggregate::{aggregate, IngredientLine};
    use axum::body::to_bytes;

    #[tokio::test]
    async fn attachment_headers_and_body() {
        let list = aggregate(vec![
            IngredientLine::new("Flour", "g", 200),
            IngredientLine::new("Salt", "g", 5),
        ]);
        let resp = ShoppingListFile(list.to_string()).into_response();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Purchase_list.txt\""
        );
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], "Flour (g) — 200\nSalt (g) — 5\n".as_bytes());
    }

    #[tokio::test]
    async fn empty_list_is_an_empty_file() {
        let resp = ShoppingListFile(aggregate(Vec::new()).to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
