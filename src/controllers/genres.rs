use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use super::{field_error, Validated};
use crate::{
    database::is_unique_violation,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, StaffUser},
    models::{genre::CreateGenre, Genre},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/genres/", get(list_genres).post(create_genre))
}

// GET /api/cinema/genres/
async fn list_genres(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(Genre::list(&state.db.pool).await?))
}

// POST /api/cinema/genres/
async fn create_genre(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Validated(req): Validated<CreateGenre>,
) -> ApiResult<impl IntoResponse> {
    let genre = Genre::create(&state.db.pool, req.name.trim()).await.map_err(|e| {
        if is_unique_violation(&e) {
            field_error("name", "unique", "genre with this name already exists.".to_string())
        } else {
            ApiError::Database(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(genre)))
}
