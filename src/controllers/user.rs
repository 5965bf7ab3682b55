use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::{field_error, Payload, Validated};
use crate::{
    database::is_unique_violation,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::user::{NewUser, User, UserChanges, UserResponse},
    services::password,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register/", post(register))
        .route("/token/", post(obtain_token))
        .route("/token/refresh/", post(refresh_token))
        .route("/token/verify/", post(verify_token))
        .route("/me/", get(me).put(update_me).patch(update_me))
}

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

fn email_taken() -> ApiError {
    field_error("email", "unique", "user with this email already exists.".to_string())
}

/* ---------- REGISTER ---------- */

// POST /api/user/register/
#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Validated(req): Validated<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let password_hash = password::hash_password(req.password, state.config.jwt.bcrypt_cost).await?;

    let new_user = NewUser {
        email: req.email.trim().to_string(),
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        is_staff: false,
    };

    let user = User::create(&state.db.pool, &new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            email_taken()
        } else {
            ApiError::Database(e)
        }
    })?;

    tracing::info!("User {} registered", user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/* ---------- TOKENS ---------- */

// POST /api/user/token/
#[derive(Debug, Deserialize)]
struct TokenRequest {
    email: String,
    password: String,
}

async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<TokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_email(&state.db.pool, req.email.trim())
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !password::verify_password(req.password, user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let pair = state
        .jwt
        .issue_pair(user.id, &user.email, user.is_staff)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(pair))
}

// POST /api/user/token/refresh/
#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let access = state
        .jwt
        .refresh(&req.refresh)
        .map_err(|_| ApiError::Unauthorized("Token is invalid or expired".to_string()))?;

    Ok(Json(json!({ "access": access })))
}

// POST /api/user/token/verify/
#[derive(Debug, Deserialize)]
struct VerifyRequest {
    token: String,
}

async fn verify_token(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<VerifyRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .jwt
        .verify(&req.token)
        .map_err(|_| ApiError::Unauthorized("Token is invalid or expired".to_string()))?;

    Ok(Json(json!({})))
}

/* ---------- ME ---------- */

// GET /api/user/me/
async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_id(&state.db.pool, user.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

// PUT|PATCH /api/user/me/
#[derive(Debug, Deserialize, Validate)]
struct UpdateMeRequest {
    #[validate(email(message = "Enter a valid email address."))]
    email: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Validated(req): Validated<UpdateMeRequest>,
) -> ApiResult<impl IntoResponse> {
    let password_hash = match req.password {
        Some(p) => Some(password::hash_password(p, state.config.jwt.bcrypt_cost).await?),
        None => None,
    };

    let changes = UserChanges {
        email: req.email.map(|e| e.trim().to_string()),
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
    };

    let updated = User::update(&state.db.pool, user.user_id, &changes)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                email_taken()
            } else {
                ApiError::Database(e)
            }
        })?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(UserResponse::from(updated)))
}
