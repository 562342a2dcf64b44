//! The single error type returned by every service call.

use chrono::NaiveDateTime;
use store::ValidationErrors;
use thiserror::Error;

use crate::crypto::CryptoError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success response from the backend, with its message.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not signed in")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Session can only be joined between {opens} and {closes}")]
    OutsideJoinWindow {
        opens: NaiveDateTime,
        closes: NaiveDateTime,
    },

    #[error("Video sessions are not configured; set the HMS_* variables in .env")]
    VideoNotConfigured,

    #[error("Video service error: {0}")]
    Video(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status that best describes the error.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Backend { status, .. } => *status,
            ApiError::Validation(_) => 422,
            ApiError::NotFound(_) => 404,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden(_) | ApiError::OutsideJoinWindow { .. } => 403,
            ApiError::Conflict(_) => 409,
            ApiError::VideoNotConfigured => 503,
            ApiError::Http(_) | ApiError::Video(_) => 502,
            ApiError::Decode(_)
            | ApiError::Crypto(_)
            | ApiError::PasswordHash(_)
            | ApiError::Config(_) => 500,
        }
    }

    /// Whether the backend rejected a write because of a unique constraint.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ApiError::Backend { status: 409, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), 401);
        assert_eq!(ApiError::NotFound("Note").status(), 404);
        assert_eq!(ApiError::NotFound("Note").to_string(), "Note not found");
        let dup = ApiError::Backend {
            status: 409,
            message: "duplicate key".to_string(),
        };
        assert!(dup.is_duplicate());
        assert_eq!(dup.status(), 409);
    }
}
