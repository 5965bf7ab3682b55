use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::{field_error, movies::build_list_items, Payload};
use crate::{
    database::is_foreign_key_violation,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, StaffUser},
    models::{
        cinema_hall::CinemaHallResponse,
        movie_session::{
            CreateMovieSession, MovieSessionDetail, MovieSessionListItem, MovieSessionResponse,
            MovieSessionRow, PatchMovieSession, SessionFilter,
        },
        CinemaHall, Movie, MovieSession,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movie_sessions/", get(list_sessions).post(create_session))
        .route(
            "/movie_sessions/{id}/",
            get(retrieve_session)
                .put(replace_session)
                .patch(update_session)
                .delete(delete_session),
        )
}

/* ---------- helpers ---------- */

pub fn list_items(state: &AppState, rows: Vec<MovieSessionRow>) -> Vec<MovieSessionListItem> {
    rows.into_iter()
        .map(|row| {
            let image = row.movie_image.as_deref().map(|p| state.media.url_for(p));
            MovieSessionListItem::new(row, image)
        })
        .collect()
}

// movie_id / cinema_hall_id указывают на несуществующие записи
fn unknown_reference(e: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&e) {
        field_error(
            "movie",
            "does_not_exist",
            "Invalid pk - movie or cinema hall does not exist.".to_string(),
        )
    } else {
        ApiError::Database(e)
    }
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    date: Option<String>,
    movie: Option<String>,
}

impl SessionsQuery {
    fn into_filter(self) -> Result<SessionFilter, ApiError> {
        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("date: {:?} is not a valid date, use YYYY-MM-DD", raw))
            })?),
            None => None,
        };
        let movie = match self.movie.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| ApiError::BadRequest(format!("movie: {:?} is not a valid id", raw)))?,
            ),
            None => None,
        };
        Ok(SessionFilter { date, movie })
    }
}

/* ---------- LIST / CREATE ---------- */

// GET /api/cinema/movie_sessions/?date=2022-06-02&movie=1
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<SessionsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let rows = MovieSession::list(&state.db.pool, &filter).await?;
    Ok(Json(list_items(&state, rows)))
}

// POST /api/cinema/movie_sessions/
async fn create_session(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Payload(req): Payload<CreateMovieSession>,
) -> ApiResult<impl IntoResponse> {
    let session = MovieSession::create(&state.db.pool, &req)
        .await
        .map_err(unknown_reference)?;

    tracing::info!("Movie session {} scheduled at {}", session.id, session.show_time);
    Ok((StatusCode::CREATED, Json(MovieSessionResponse::from(session))))
}

/* ---------- DETAIL ---------- */

// GET /api/cinema/movie_sessions/{id}/
async fn retrieve_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let session = MovieSession::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie session", id))?;

    let movie = Movie::find(&state.db.pool, session.movie_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", session.movie_id))?;
    let hall = CinemaHall::find(&state.db.pool, session.cinema_hall_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cinema hall", session.cinema_hall_id))?;

    let movie = build_list_items(&state, vec![movie])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal("movie list item missing".to_string()))?;
    let taken_places = state.cache.taken_places(id).await?;

    Ok(Json(MovieSessionDetail {
        id: session.id,
        show_time: session.show_time,
        movie,
        cinema_hall: CinemaHallResponse::from(hall),
        taken_places,
    }))
}

// PUT /api/cinema/movie_sessions/{id}/
async fn replace_session(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    Payload(req): Payload<CreateMovieSession>,
) -> ApiResult<impl IntoResponse> {
    let changes = PatchMovieSession {
        show_time: Some(req.show_time),
        movie: Some(req.movie),
        cinema_hall: Some(req.cinema_hall),
    };
    apply_changes(&state, id, changes).await
}

// PATCH /api/cinema/movie_sessions/{id}/
async fn update_session(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    Payload(req): Payload<PatchMovieSession>,
) -> ApiResult<impl IntoResponse> {
    apply_changes(&state, id, req).await
}

async fn apply_changes(state: &AppState, id: i64, changes: PatchMovieSession) -> ApiResult<Json<MovieSessionResponse>> {
    let session = MovieSession::update(&state.db.pool, id, &changes)
        .await
        .map_err(unknown_reference)?
        .ok_or_else(|| ApiError::not_found("Movie session", id))?;

    state.cache.invalidate_taken_places(&[id]).await;
    Ok(Json(MovieSessionResponse::from(session)))
}

// DELETE /api/cinema/movie_sessions/{id}/
async fn delete_session(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = MovieSession::delete(&state.db.pool, id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            ApiError::Conflict("Movie session has sold tickets and cannot be deleted.".to_string())
        } else {
            ApiError::Database(e)
        }
    })?;

    if !deleted {
        return Err(ApiError::not_found("Movie session", id));
    }

    state.cache.invalidate_taken_places(&[id]).await;
    Ok(StatusCode::NO_CONTENT)
}
