//! Error type shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

#[derive(Error, Debug)]
pub enum ApiError {
    /// Field-level validation failure
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{} with id {} not found", what, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn field_messages(errs: &[ValidationError]) -> Value {
    errs.iter()
        .map(|e| {
            let text = e
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string());
            Value::String(text)
        })
        .collect()
}

// Вложенные ошибки: объект для структуры, массив по индексам для списка
fn errors_object(errors: &ValidationErrors) -> Map<String, Value> {
    let mut fields = Map::new();
    for (field, kind) in errors.errors() {
        let value = match kind {
            ValidationErrorsKind::Field(errs) => field_messages(errs),
            ValidationErrorsKind::Struct(inner) => Value::Object(errors_object(inner)),
            ValidationErrorsKind::List(items) => {
                let len = items.keys().next_back().map_or(0, |last| last + 1);
                let mut list = vec![Value::Object(Map::new()); len];
                for (index, inner) in items {
                    list[*index] = Value::Object(errors_object(inner));
                }
                Value::Array(list)
            }
        };
        fields.insert(field.to_string(), value);
    }
    fields
}

fn validation_body(errors: &ValidationErrors) -> Value {
    json!({ "errors": errors_object(errors) })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => validation_body(errors),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => json!({ "error": msg }),
            ApiError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                json!({ "error": "Database error" })
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{CreateOrder, TicketRequest};
    use validator::Validate;

    #[test]
    fn statuses_follow_variants() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_are_grouped_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "password",
            ValidationError::new("length").with_message("Ensure this field has at least 5 characters.".into()),
        );
        errors.add("email", ValidationError::new("email"));

        let body = validation_body(&errors);
        assert_eq!(
            body["errors"]["password"][0],
            "Ensure this field has at least 5 characters."
        );
        assert_eq!(body["errors"]["email"][0], "email");
    }

    #[test]
    fn ticket_errors_are_reported_by_index() {
        let order = CreateOrder {
            tickets: vec![
                TicketRequest { movie_session: 1, row: 1, seat: 1 },
                TicketRequest { movie_session: 1, row: 0, seat: 2 },
            ],
        };
        let body = validation_body(&order.validate().unwrap_err());

        let tickets = body["errors"]["tickets"].as_array().unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets[0].as_object().unwrap().is_empty());
        assert_eq!(
            tickets[1]["row"][0],
            "Ensure this value is greater than or equal to 1."
        );
    }
}
