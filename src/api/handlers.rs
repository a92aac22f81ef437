//! API Handlers
//!
//! HTTP request handlers for the gateway: cached upstream reads, parallel
//! batches and cache administration.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::time::Duration;
use tracing::info;

use crate::cache::{CacheStats, SharedCache};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::models::{
    BatchRequest, DeleteResponse, FetchQuery, FetchResponse, HealthResponse, InvalidateRequest,
    RemovalResponse,
};
use crate::parallel::{BatchReport, ParallelBatch, ParallelFetcher};
use crate::upstream::{normalize_path, UpstreamClient, UpstreamPayload};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Response cache keyed by normalized upstream path
    pub cache: SharedCache<UpstreamPayload>,
    pub upstream: UpstreamClient,
    pub fetcher: ParallelFetcher,
}

impl AppState {
    pub fn new(
        cache: SharedCache<UpstreamPayload>,
        upstream: UpstreamClient,
        fetcher: ParallelFetcher,
    ) -> Self {
        Self {
            cache,
            upstream,
            fetcher,
        }
    }

    /// Builds every component from the gateway configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            SharedCache::from_config(&config.cache_config()),
            UpstreamClient::new(&config.upstream_url)?,
            ParallelFetcher::new(config.parallel_config()),
        ))
    }
}

/// Handler for GET /fetch/*path
///
/// Serves the upstream response for `path` from the cache, fetching it on a
/// miss. Concurrent misses for one path share a single upstream request.
/// `?refresh=true` skips the cache lookup.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<FetchResponse>> {
    let key = normalize_path(&path);
    let client = state.upstream.clone();
    let target = key.clone();
    let producer = move || async move { client.fetch_json(&target).await };

    if query.refresh {
        let payload = state.cache.refresh(&key, producer, None).await?;
        return Ok(Json(FetchResponse::new(payload, false)));
    }

    let fetched = state.cache.fetch(&key, producer, None).await?;
    Ok(Json(FetchResponse::new(fetched.value, fetched.served_from_cache)))
}

/// Handler for POST /batch
///
/// Fetches every path concurrently. Successful payloads are cached; failed
/// paths are reported under `errors` without failing the request. With
/// `timeout_ms`, the whole batch fails if it does not settle in time.
pub async fn batch_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchReport<UpstreamPayload>>> {
    if let Some(error_msg) = req.validate() {
        return Err(FetchError::InvalidRequest(error_msg));
    }

    let batch = ParallelBatch::from_calls(req.paths.iter().map(|p| state.upstream.call_for(p)))?;

    let report = match req.timeout_ms {
        Some(ms) => {
            state
                .fetcher
                .within(
                    Some(Duration::from_millis(ms)),
                    state.fetcher.run_all_with_errors(batch),
                )
                .await?
        }
        None => state.fetcher.run_all_with_errors(batch).await,
    };

    state
        .cache
        .set_multiple(
            report
                .results
                .iter()
                .map(|(key, payload)| (key.clone(), payload.clone())),
            None,
        )
        .await;

    Ok(Json(report))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.get_stats().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<RemovalResponse> {
    let removed = state.cache.len().await;
    state.cache.clear().await;
    info!("Cache cleared ({} entries)", removed);
    Json(RemovalResponse::new(removed, "entries"))
}

/// Handler for DELETE /cache/entries/*key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = normalize_path(&key);
    if state.cache.delete(&key).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(FetchError::NotFound(key))
    }
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovalResponse>> {
    let pattern = req.to_pattern()?;
    let removed = state.cache.invalidate_pattern(&pattern).await;
    info!("Invalidated {} entries", removed);
    Ok(Json(RemovalResponse::new(removed, "matching entries")))
}

/// Handler for POST /cache/cleanup
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<RemovalResponse> {
    let removed = state.cache.clear_expired().await;
    Json(RemovalResponse::new(removed, "expired entries"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyedCache;

    fn test_state() -> AppState {
        AppState::new(
            SharedCache::new(KeyedCache::new(100, Duration::from_secs(300))),
            UpstreamClient::new("http://127.0.0.1:9").unwrap(),
            ParallelFetcher::default(),
        )
    }

    fn payload(path: &str) -> UpstreamPayload {
        UpstreamPayload {
            path: path.to_string(),
            status: 200,
            data: serde_json::json!({"cached": true}),
        }
    }

    #[tokio::test]
    async fn test_fetch_served_from_cache() {
        let state = test_state();
        state.cache.set("/users", payload("/users"), None).await;

        let response = fetch_handler(
            State(state),
            Path("users".to_string()),
            Query(FetchQuery::default()),
        )
        .await
        .unwrap();

        assert!(response.served_from_cache);
        assert_eq!(response.payload.data["cached"], true);
    }

    #[tokio::test]
    async fn test_fetch_upstream_failure_is_an_error() {
        let state = test_state();

        let result = fetch_handler(
            State(state.clone()),
            Path("users".to_string()),
            Query(FetchQuery::default()),
        )
        .await;

        assert!(matches!(result, Err(FetchError::Producer(_))));
        assert!(!state.cache.has("/users").await);
    }

    #[tokio::test]
    async fn test_batch_rejects_duplicate_paths() {
        let state = test_state();
        let req = BatchRequest {
            paths: vec!["users".to_string(), "/users/".to_string()],
            timeout_ms: None,
        };

        let result = batch_handler(State(state), Json(req)).await;

        assert!(matches!(result, Err(FetchError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let state = test_state();
        state.cache.set("/a", payload("/a"), None).await;
        state.cache.set("/b", payload("/b"), None).await;

        let deleted = delete_handler(State(state.clone()), Path("a".to_string())).await;
        assert!(deleted.is_ok());
        let missing = delete_handler(State(state.clone()), Path("a".to_string())).await;
        assert!(matches!(missing, Err(FetchError::NotFound(_))));

        let cleared = clear_handler(State(state.clone())).await;
        assert_eq!(cleared.removed, 1);
        assert_eq!(state.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        state.cache.set("/users/1", payload("/users/1"), None).await;
        state.cache.set("/orders/1", payload("/orders/1"), None).await;

        let req = InvalidateRequest {
            prefix: Some("/users".to_string()),
            ..InvalidateRequest::default()
        };
        let response = invalidate_handler(State(state.clone()), Json(req)).await.unwrap();

        assert_eq!(response.removed, 1);
        assert!(state.cache.has("/orders/1").await);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.cache.set("/a", payload("/a"), None).await;

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 100);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
