//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::upstream::UpstreamPayload;

/// Response body of `GET /fetch/*path`
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    #[serde(flatten)]
    pub payload: UpstreamPayload,
    /// Whether the payload came from the cache
    pub served_from_cache: bool,
}

impl FetchResponse {
    pub fn new(payload: UpstreamPayload, served_from_cache: bool) -> Self {
        Self {
            payload,
            served_from_cache,
        }
    }
}

/// Response body of the removal endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RemovalResponse {
    /// Human-readable summary
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl RemovalResponse {
    pub fn new(removed: usize, what: &str) -> Self {
        Self {
            message: format!("Removed {} {}", removed, what),
            removed,
        }
    }
}

/// Response body of `DELETE /cache/entries/*key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
