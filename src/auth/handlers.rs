use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    dto::{AccountInfo, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::{NewUser, User},
};
use crate::{error::AppError, state::AppState};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    username.chars().count() <= 150 && USERNAME_RE.is_match(username)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), AppError> {
    if !is_valid_email(&payload.email) {
        return Err(AppError::validation("Invalid email"));
    }
    if !is_valid_username(&payload.username) {
        return Err(AppError::validation("Invalid username"));
    }
    for (field, value) in [
        ("first_name", &payload.first_name),
        ("last_name", &payload.last_name),
    ] {
        if value.trim().is_empty() || value.chars().count() > 150 {
            return Err(AppError::validation(format!("Invalid {}", field)));
        }
    }
    if payload.password.len() < 8 {
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: AccountInfo {
            id: user.id,
            email: user.email,
            username: user.username,
        },
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if let Err(e) = validate_registration(&payload) {
        warn!(email = %payload.email, error = %e, "registration rejected");
        return Err(e);
    }

    if User::email_or_username_taken(&state.db, &payload.email, &payload.username).await? {
        warn!(email = %payload.email, "email or username already registered");
        return Err(AppError::EmailTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            username: &payload.username,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            password_hash: &hash,
        },
    )
    .await?
    .ok_or(AppError::EmailTaken)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(invalid());
    }

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: "cook@example.com".into(),
            username: "cook.42".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password: "long-enough".into(),
        }
    }

    #[test]
    fn email_and_username_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(is_valid_username("chef_anna+1"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn registration_validation() {
        assert!(validate_registration(&request()).is_ok());

        let mut short = request();
        short.password = "short".into();
        assert!(matches!(
            validate_registration(&short),
            Err(AppError::Validation(ref m)) if m == "Password too short"
        ));

        let mut blank = request();
        blank.last_name = "  ".into();
        assert!(matches!(
            validate_registration(&blank),
            Err(AppError::Validation(ref m)) if m == "Invalid last_name"
        ));
    }

    #[tokio::test]
    async fn tokens_carry_account() {
        let state = AppState::fake();
        let user = User {
            id: uuid::Uuid::new_v4(),
            email: "cook@example.com".into(),
            username: "cook".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password_hash: String::new(),
            is_staff: false,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let id = user.id;
        let resp = issue_tokens(&state, user).unwrap();
        let keys = JwtKeys::from_ref(&state);
        assert_eq!(keys.verify(&resp.access_token).unwrap().sub, id);
        assert_eq!(keys.verify_refresh(&resp.refresh_token).unwrap().sub, id);
        let json = serde_json::to_string(&resp.user).unwrap();
        assert!(json.contains("cook@example.com"));
    }
}
