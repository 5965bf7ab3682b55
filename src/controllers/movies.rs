use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::{field_error, missing_ids, parse_ids, Payload};
use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, StaffUser},
    models::{
        movie::{CreateMovie, MovieDetail, MovieFilter, MovieListItem},
        Actor, Genre, Movie,
    },
    services::media::MediaError,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies/", get(list_movies).post(create_movie))
        .route("/movies/{id}/", get(retrieve_movie))
        .route("/movies/{id}/upload-image/", post(upload_image))
}

/* ---------- helpers ---------- */

fn image_url(state: &AppState, image: Option<&str>) -> Option<String> {
    image.map(|path| state.media.url_for(path))
}

/// Movie list items with their genres and actors, loaded in two queries.
pub async fn build_list_items(state: &AppState, movies: Vec<Movie>) -> Result<Vec<MovieListItem>, sqlx::Error> {
    let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
    let genres = Movie::genres_for(&state.db.pool, &ids).await?;
    let actors = Movie::actors_for(&state.db.pool, &ids).await?;

    Ok(movies
        .into_iter()
        .map(|m| {
            let image = image_url(state, m.image.as_deref());
            let g = genres.get(&m.id).map(Vec::as_slice).unwrap_or_default();
            let a = actors.get(&m.id).map(Vec::as_slice).unwrap_or_default();
            MovieListItem::new(m, g, a, image)
        })
        .collect())
}

pub async fn build_detail(state: &AppState, movie: Movie) -> Result<MovieDetail, sqlx::Error> {
    let ids = [movie.id];
    let genres = Movie::genres_for(&state.db.pool, &ids).await?.remove(&movie.id).unwrap_or_default();
    let actors = Movie::actors_for(&state.db.pool, &ids).await?.remove(&movie.id).unwrap_or_default();
    let image = image_url(state, movie.image.as_deref());
    Ok(MovieDetail::new(movie, genres, actors, image))
}

fn invalid_pks(field: &'static str, missing: &[i64]) -> ApiError {
    let ids: Vec<String> = missing.iter().map(i64::to_string).collect();
    field_error(
        field,
        "does_not_exist",
        format!("Invalid pk \"{}\" - object does not exist.", ids.join(", ")),
    )
}

/// Movie create payload, sent either as JSON or as `multipart/form-data`.
/// An `image` part of a form is ignored: images go through `upload-image`.
struct MovieForm(CreateMovie);

impl<S> FromRequest<S> for MovieForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let movie = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            read_movie_form(multipart).await?
        } else {
            let Payload(movie) = Payload::<CreateMovie>::from_request(req, state).await?;
            movie
        };

        movie.validate()?;
        Ok(MovieForm(movie))
    }
}

fn required(field: &'static str) -> ApiError {
    field_error(field, "required", "This field is required.".to_string())
}

async fn read_movie_form(mut multipart: Multipart) -> Result<CreateMovie, ApiError> {
    let mut title = None;
    let mut description = None;
    let mut duration = None;
    let mut genres = Vec::new();
    let mut actors = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if !matches!(name.as_str(), "title" | "description" | "duration" | "genres" | "actors") {
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        match name.as_str() {
            "title" => title = Some(value),
            "description" => description = Some(value),
            "duration" => {
                let parsed = value.trim().parse::<i32>().map_err(|_| {
                    field_error("duration", "invalid", "A valid integer is required.".to_string())
                })?;
                duration = Some(parsed);
            }
            "genres" => genres.extend(parse_ids(&value, "genres")?),
            _ => actors.extend(parse_ids(&value, "actors")?),
        }
    }

    Ok(CreateMovie {
        title: title.ok_or_else(|| required("title"))?,
        description: description.ok_or_else(|| required("description"))?,
        duration: duration.ok_or_else(|| required("duration"))?,
        genres,
        actors,
    })
}

/* ---------- LIST / CREATE ---------- */

#[derive(Debug, Deserialize)]
struct MoviesQuery {
    title: Option<String>,
    genres: Option<String>,
    actors: Option<String>,
}

impl MoviesQuery {
    fn into_filter(self) -> Result<MovieFilter, ApiError> {
        Ok(MovieFilter {
            title: self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            genres: self.genres.as_deref().map(|g| parse_ids(g, "genres")).transpose()?.unwrap_or_default(),
            actors: self.actors.as_deref().map(|a| parse_ids(a, "actors")).transpose()?.unwrap_or_default(),
        })
    }
}

// GET /api/cinema/movies/?title=&genres=1,2&actors=3
async fn list_movies(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<MoviesQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let movies = Movie::list(&state.db.pool, &filter).await?;
    Ok(Json(build_list_items(&state, movies).await?))
}

// POST /api/cinema/movies/
async fn create_movie(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    MovieForm(req): MovieForm,
) -> ApiResult<impl IntoResponse> {
    if !req.genres.is_empty() {
        let existing = Genre::existing_ids(&state.db.pool, &req.genres).await?;
        let missing = missing_ids(&req.genres, &existing);
        if !missing.is_empty() {
            return Err(invalid_pks("genres", &missing));
        }
    }
    if !req.actors.is_empty() {
        let existing = Actor::existing_ids(&state.db.pool, &req.actors).await?;
        let missing = missing_ids(&req.actors, &existing);
        if !missing.is_empty() {
            return Err(invalid_pks("actors", &missing));
        }
    }

    let movie = Movie::create(&state.db.pool, &req).await?;
    tracing::info!("Movie {} created", movie.id);

    Ok((StatusCode::CREATED, Json(build_detail(&state, movie).await?)))
}

/* ---------- DETAIL ---------- */

// GET /api/cinema/movies/{id}/
async fn retrieve_movie(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let movie = Movie::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", id))?;

    Ok(Json(build_detail(&state, movie).await?))
}

/* ---------- IMAGE ---------- */

// POST /api/cinema/movies/{id}/upload-image/  (multipart, field "image")
async fn upload_image(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let movie = Movie::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", id))?;

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            image = Some(bytes.to_vec());
        }
    }

    let bytes = image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| field_error("image", "required", "No file was submitted.".to_string()))?;

    let path = state
        .media
        .save_movie_image(&movie.title, bytes)
        .await
        .map_err(|e| match e {
            MediaError::InvalidImage => {
                field_error("image", "invalid_image", MediaError::InvalidImage.to_string())
            }
            MediaError::Io(io) => ApiError::Internal(io.to_string()),
        })?;

    let movie = Movie::set_image(&state.db.pool, id, &path)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", id))?;

    Ok(Json(json!({
        "id": movie.id,
        "image": image_url(&state, movie.image.as_deref()),
    })))
}
