pub mod user;
pub mod genres;
pub mod actors;
pub mod cinema_halls;
pub mod movies;
pub mod movie_sessions;
pub mod orders;

use axum::{
    extract::{FromRequest, Request},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

pub fn routes() -> Router<Arc<crate::AppState>> {
    let cinema = Router::new()
        .merge(genres::routes())
        .merge(actors::routes())
        .merge(cinema_halls::routes())
        .merge(movies::routes())
        .merge(movie_sessions::routes())
        .merge(orders::routes());

    Router::new()
        .nest("/user", user::routes())
        .nest("/cinema", cinema)
}

/* ---------- extractors ---------- */

/// JSON body whose parse errors come back as 400 with a JSON body.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Payload(value))
    }
}

/// JSON body that is also run through `validator` before the handler sees it.
pub struct Validated<T>(pub T);

impl<S, T> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Payload(value) = Payload::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Validated(value))
    }
}

/* ---------- helpers ---------- */

/// Single-field validation error, rendered like the derived ones.
pub fn field_error(field: &'static str, code: &'static str, message: String) -> ApiError {
    let mut errors = ValidationErrors::new();
    errors.add(field, ValidationError::new(code).with_message(message.into()));
    ApiError::Validation(errors)
}

/// Parses a comma separated id list such as `1,2,3`.
pub fn parse_ids(raw: &str, field: &'static str) -> Result<Vec<i64>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("{}: {:?} is not a valid id", field, s)))
        })
        .collect()
}

/// Ids from `requested` that are not in `existing`, in request order.
pub fn missing_ids(requested: &[i64], existing: &[i64]) -> Vec<i64> {
    requested
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect()
}

/* ---------- pagination ---------- */

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Offset of `page` (1-based). Pages past the end are invalid, except an empty first page.
pub fn page_offset(page: i64, page_size: i64, count: i64) -> Result<i64, ApiError> {
    let last_page = ((count + page_size - 1) / page_size).max(1);
    if page < 1 || page > last_page {
        return Err(ApiError::NotFound("Invalid page.".to_string()));
    }
    Ok((page - 1) * page_size)
}

pub fn page_links(path: &str, page: i64, page_size: i64, count: i64) -> (Option<String>, Option<String>) {
    let next = (page * page_size < count).then(|| format!("{}?page={}", path, page + 1));
    let previous = match page {
        p if p <= 1 => None,
        2 => Some(path.to_string()),
        p => Some(format!("{}?page={}", path, p - 1)),
    };
    (next, previous)
}
