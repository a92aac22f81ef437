//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::KeyPattern;
use crate::error::{FetchError, Result};

/// Upper bound on paths per batch request.
pub const MAX_BATCH_PATHS: usize = 64;

/// Query string of `GET /fetch/*path`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchQuery {
    /// Bypass the cache and fetch upstream
    #[serde(default)]
    pub refresh: bool,
}

/// Request body of `POST /batch`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    /// Upstream paths to fetch concurrently
    pub paths: Vec<String>,
    /// Optional batch time limit in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl BatchRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.paths.is_empty() {
            return Some("At least one path is required".to_string());
        }
        if self.paths.len() > MAX_BATCH_PATHS {
            return Some(format!("At most {} paths per batch", MAX_BATCH_PATHS));
        }
        if self.timeout_ms == Some(0) {
            return Some("timeout_ms must be greater than zero".to_string());
        }
        None
    }
}

/// Request body of `POST /cache/invalidate`; exactly one field must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
}

impl InvalidateRequest {
    /// Converts the request into a key pattern.
    pub fn to_pattern(&self) -> Result<KeyPattern> {
        match (&self.prefix, &self.contains, &self.regex) {
            (Some(prefix), None, None) => Ok(KeyPattern::prefix(prefix.clone())),
            (None, Some(text), None) => Ok(KeyPattern::substring(text.clone())),
            (None, None, Some(re)) => KeyPattern::regex(re),
            _ => Err(FetchError::InvalidRequest(
                "Exactly one of prefix, contains or regex is required".to_string(),
            )),
        }
    }
}
