//! HTTP-facing error surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facto_core::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the query service.
///
/// Backend detail never leaks to clients; it is logged and replaced with a
/// generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed (bad timestamps, bad cursor, bad limit).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested event or session does not exist.
    #[error("Not found")]
    NotFound,

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not found" })),
            )
                .into_response(),
            ApiError::Store(cause) => {
                error!(error = %cause, "storage backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
