//! API Module
//!
//! HTTP handlers and routing for the caching gateway.
//!
//! # Endpoints
//! - `GET /fetch/*path` - Cached upstream read
//! - `POST /batch` - Concurrent upstream reads
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint
//! - `DELETE /cache`, `DELETE /cache/entries/*key`,
//!   `POST /cache/invalidate`, `POST /cache/cleanup` - Cache administration

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
