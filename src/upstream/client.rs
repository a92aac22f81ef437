//! Upstream Client
//!
//! The only code that speaks HTTP to the backend. Every response is
//! normalized into an [`UpstreamPayload`], so caches and batches only ever
//! handle that one shape.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::fetch::{producer, Producer};
use crate::parallel::ParallelCall;

/// Per-request timeout of the HTTP client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// == Upstream Payload ==
/// Normalized result of one upstream GET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamPayload {
    /// Normalized request path, also used as the cache key
    pub path: String,
    /// HTTP status of the response
    pub status: u16,
    /// Decoded JSON body
    pub data: serde_json::Value,
}

/// Normalizes `path` to a single leading slash and no trailing slash.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}", trimmed)
}

// == Upstream Client ==
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl UpstreamClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("fetch_cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`. Query strings are kept as given.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }

    // == Fetch JSON ==
    /// GETs `path` and decodes the JSON body.
    ///
    /// Non-success statuses become [`FetchError::Upstream`].
    pub async fn fetch_json(&self, path: &str) -> anyhow::Result<UpstreamPayload> {
        let path = normalize_path(path);
        let url = format!("{}{}", self.base_url, path);
        debug!("Upstream GET {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                path,
            }
            .into());
        }

        let data = response.json::<serde_json::Value>().await?;
        Ok(UpstreamPayload {
            path,
            status: status.as_u16(),
            data,
        })
    }

    /// Re-invocable producer fetching `path`, for bindings and the cache.
    pub fn producer_for(&self, path: &str) -> Producer<UpstreamPayload> {
        let client = self.clone();
        let path = normalize_path(path);
        producer(move || {
            let client = client.clone();
            let path = path.clone();
            async move { client.fetch_json(&path).await }
        })
    }

    /// Batch call fetching `path`, keyed by its normalized path.
    pub fn call_for(&self, path: &str) -> ParallelCall<UpstreamPayload> {
        let client = self.clone();
        let path = normalize_path(path);
        ParallelCall::new(path.clone(), async move { client.fetch_json(&path).await })
    }
}
