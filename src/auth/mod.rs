use crate::state::AppState;
use axum::Router;

mod dto;
mod handlers;
pub mod jwt;
mod password;
pub mod repo;

pub use jwt::{AuthUser, MaybeUser};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
