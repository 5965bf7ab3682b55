use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::{error::ApiError, models::User};

/// Caller identified by a valid access token.
///
/// Read from the token alone: a deactivated user keeps read access until the
/// access token expires (`JWT_ACCESS_EXPIRES_IN_MINUTES`, 30 by default).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub is_staff: bool,
}

/// Active staff user. The token's `is_staff` claim is rechecked against the
/// database, so demotion or deactivation takes effect immediately.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

const NO_PERMISSION: &str = "You do not have permission to perform this action.";

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authentication credentials were not provided.".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header must be a Bearer token.".to_string()))
}

// Bearer JWT extractor, без обращения к БД
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = state.jwt.verify_access(token).map_err(|e| {
            tracing::debug!("rejected access token: {}", e);
            ApiError::Unauthorized("Given token not valid for any token type".to_string())
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            is_staff: claims.is_staff,
        })
    }
}

impl FromRequestParts<Arc<crate::AppState>> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::Forbidden(NO_PERMISSION.to_string()));
        }

        let stored = User::find_by_id(&state.db.pool, user.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;
        if !stored.is_staff {
            return Err(ApiError::Forbidden(NO_PERMISSION.to_string()));
        }
        Ok(StaffUser(user))
    }
}
