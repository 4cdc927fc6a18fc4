//! Error types for the monitor.
//!
//! Domain errors are plain `thiserror` enums. [`AppError`] is the only one
//! that knows about HTTP; it wraps the others and renders the
//! `{"error": ..., "code": ...}` body returned by every failing route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

// ---

/// A sensor payload that could not be turned into a reading at all.
///
/// Individual missing or malformed fields are *not* errors; they fall back to
/// defaults during normalisation.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Why an inbound event produced no reading.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no room named '{0}' is monitored")]
    UnknownRoom(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A rejected threshold update. Nothing is applied when this is returned.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ThresholdError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{lower} ({lower_value}) must be less than or equal to {upper} ({upper_value})")]
    OutOfOrder {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification channel answered with status {0}")]
    Status(u16),

    #[error("notification channel is not configured")]
    Disabled,
}

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unknown room '{0}'")]
    UnknownRoom(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ThresholdError> for AppError {
    fn from(err: ThresholdError) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, code, message) = match &self {
            AppError::UnknownRoom(_) => (StatusCode::NOT_FOUND, "UNKNOWN_ROOM", self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Storage error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
