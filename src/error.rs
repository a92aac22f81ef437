//! Error types for the fetch cache
//!
//! Provides unified error handling using thiserror. Producer failures arrive
//! as `anyhow::Error` and are flattened into message strings here, so that
//! `FetchError` stays `Clone` and can be handed to every waiter of a shared
//! in-flight computation.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message used when a producer fails without saying why.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

// == Fetch Error Enum ==
/// Unified error type for the cache, bindings and parallel batches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// A producer or batch operation failed
    #[error("{0}")]
    Producer(String),

    /// A whole batch did not settle within its time limit
    #[error("Batch timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A key pattern could not be compiled
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),

    /// The same key was added twice to one batch
    #[error("Duplicate batch key: {0}")]
    DuplicateKey(String),

    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The upstream API answered with a non-success status
    #[error("Upstream returned {status} for {path}")]
    Upstream { status: u16, path: String },

    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Malformed request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Wraps a producer failure, keeping only its human-readable message.
    pub fn producer(err: &anyhow::Error) -> Self {
        FetchError::Producer(error_message(err))
    }

    /// True for the batch-level timeout, as opposed to per-call failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

/// Renders an error for display, falling back to a generic message when the
/// error carries no text.
pub fn error_message(err: &anyhow::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchError::InvalidPattern(_)
            | FetchError::DuplicateKey(_)
            | FetchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FetchError::Producer(_) | FetchError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            FetchError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the fetch cache.
pub type Result<T> = std::result::Result<T, FetchError>;
