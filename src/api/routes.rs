//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_handler, cleanup_handler, clear_handler, delete_handler, fetch_handler, health_handler,
    invalidate_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /fetch/*path` - Cached upstream GET (`?refresh=true` to bypass)
/// - `POST /batch` - Concurrent upstream GETs
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check
/// - `DELETE /cache` - Drop every entry
/// - `DELETE /cache/entries/*key` - Drop one entry
/// - `POST /cache/invalidate` - Drop entries matching a pattern
/// - `POST /cache/cleanup` - Sweep expired entries now
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/fetch/*path", get(fetch_handler))
        .route("/batch", post(batch_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/entries/*key", delete(delete_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/cleanup", post(cleanup_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
