// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One rejected field, reported alongside its sibling failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

/// Every failure a task mutation can surface, one HTTP status each.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Validation Error")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Infrastructure(String),
}

impl TaskError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        TaskError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TaskError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        TaskError::Conflict(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        TaskError::Infrastructure(message.into())
    }
}

impl ResponseError for TaskError {
    fn status_code(&self) -> StatusCode {
        match self {
            TaskError::Validation(_) => StatusCode::BAD_REQUEST,
            TaskError::Authorization(_) => StatusCode::FORBIDDEN,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::Conflict(_) => StatusCode::CONFLICT,
            TaskError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            TaskError::Validation(errors) => HttpResponse::BadRequest().json(json!({
                "message": "Validation Error",
                "errors": errors,
            })),
            // Details were already logged where the failure happened; clients
            // only ever see the generic message.
            TaskError::Infrastructure(_) => HttpResponse::InternalServerError().json(json!({
                "message": "Server error",
            })),
            other => HttpResponse::build(other.status_code()).json(json!({
                "message": other.to_string(),
            })),
        }
    }
}
