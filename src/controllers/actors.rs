use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use super::Validated;
use crate::{
    error::ApiResult,
    middleware::{AuthUser, StaffUser},
    models::actor::{Actor, ActorResponse, CreateActor},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/actors/", get(list_actors).post(create_actor))
}

// GET /api/cinema/actors/
async fn list_actors(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let actors: Vec<ActorResponse> = Actor::list(&state.db.pool)
        .await?
        .into_iter()
        .map(ActorResponse::from)
        .collect();
    Ok(Json(actors))
}

// POST /api/cinema/actors/
async fn create_actor(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Validated(req): Validated<CreateActor>,
) -> ApiResult<impl IntoResponse> {
    let actor = Actor::create(&state.db.pool, &req).await?;
    Ok((StatusCode::CREATED, Json(ActorResponse::from(actor))))
}
