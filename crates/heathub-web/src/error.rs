//! API error taxonomy and HTTP mapping.
//!
//! Validation and authorization failures are handled at this boundary and
//! never reach storage. Storage failures are logged with full context and
//! returned to callers with a sanitized message. Ownership failures and
//! unknown devices share one response so device existence does not leak.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use heathub_core::StoreError;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Client data failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// Device reported again before its window elapsed.
    #[error("data submitted too frequently")]
    TooFrequent { retry_at: DateTime<Utc> },

    /// Missing or unknown bearer token.
    #[error("authentication required")]
    Unauthorized,

    /// Device absent, or the caller does not own it. Deliberately one
    /// category.
    #[error("device not found or not authorized")]
    NotFound,

    /// Persistence backend failure, with the device involved when known.
    #[error("storage failure: {source}")]
    Storage {
        device_id: Option<String>,
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for ApiError {
    fn from(source: StoreError) -> Self {
        ApiError::Storage {
            device_id: None,
            source,
        }
    }
}

impl ApiError {
    /// Wrap a storage failure with the device it concerned, so the log
    /// line at the response boundary carries the device id.
    pub(crate) fn storage(device_id: &str) -> impl FnOnce(StoreError) -> ApiError + '_ {
        move |source| ApiError::Storage {
            device_id: Some(device_id.to_string()),
            source,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": message }),
            ),
            ApiError::TooFrequent { retry_at } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "status": "error",
                    "message": "Too frequent",
                    "nextSubmission": retry_at.to_rfc3339(),
                }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "status": "error", "message": "Authentication required" }),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "status": "error", "message": "Device not found or not authorized" }),
            ),
            ApiError::Storage { device_id, source } => {
                tracing::error!(
                    device_id = device_id.as_deref().unwrap_or("unknown"),
                    error = %source,
                    "storage failure while handling request"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": "Failed to process device data" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
