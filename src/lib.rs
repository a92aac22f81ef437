//! Fetch Cache - TTL response caching and parallel fetching for REST clients
//!
//! Provides a capacity-bounded TTL cache with pattern invalidation, a
//! cache-bound fetch binding with observable state, and a parallel fetch
//! orchestrator with per-call error isolation. The gateway binary puts all
//! three in front of an upstream REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod parallel;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::{KeyPattern, KeyedCache, SharedCache};
pub use config::{CacheConfig, Config, ParallelConfig};
pub use error::{FetchError, Result};
pub use fetch::{producer, BindingOptions, FetchBinding, FetchState, Producer};
pub use parallel::{BatchReport, CallOutcome, ParallelBatch, ParallelCall, ParallelFetcher};
pub use tasks::spawn_cleanup_task;
