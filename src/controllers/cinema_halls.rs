use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use super::Validated;
use crate::{
    error::ApiResult,
    middleware::{AuthUser, StaffUser},
    models::cinema_hall::{CinemaHall, CinemaHallResponse, CreateCinemaHall},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/cinema_halls/", get(list_halls).post(create_hall))
}

// GET /api/cinema/cinema_halls/
async fn list_halls(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let halls: Vec<CinemaHallResponse> = CinemaHall::list(&state.db.pool)
        .await?
        .into_iter()
        .map(CinemaHallResponse::from)
        .collect();
    Ok(Json(halls))
}

// POST /api/cinema/cinema_halls/
async fn create_hall(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Validated(req): Validated<CreateCinemaHall>,
) -> ApiResult<impl IntoResponse> {
    let hall = CinemaHall::create(&state.db.pool, &req).await?;
    Ok((StatusCode::CREATED, Json(CinemaHallResponse::from(hall))))
}
