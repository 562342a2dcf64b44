//! Mapping from service errors to JSON responses.
//!
//! Every failing route answers with
//!
//! ```json
//! { "error": "Invalid input: ...", "fields": [{ "field": "title", "message": "..." }] }
//! ```
//!
//! where `fields` is only present for validation failures.

use api::ApiError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use store::FieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Session layer is not installed")]
    MissingSession,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<&'a FieldError>>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Api(e) => {
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Session(_) | AppError::MissingSession => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let fields = match &self {
            AppError::Api(ApiError::Validation(errors)) => Some(errors.iter().collect()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
