//! Configuration Module
//!
//! Library-level settings for the cache and parallel fetcher, plus the
//! environment-driven configuration of the gateway binary.

use std::env;
use std::time::Duration;

use crate::error::{FetchError, Result};

/// Default time-to-live for cached values (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
/// Default maximum number of cached entries.
pub const DEFAULT_CAPACITY: usize = 100;
/// Default interval between expired-entry sweeps (5 minutes).
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
/// Default time limit for a whole parallel batch.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_millis(10_000);

// == Cache Config ==
/// Settings for a [`KeyedCache`](crate::cache::KeyedCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries held at once
    pub capacity: usize,
    /// TTL applied when a caller does not pass one
    pub default_ttl: Duration,
    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Rejects values the cache cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(FetchError::InvalidConfig(
                "cache capacity must be greater than zero".to_string(),
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(FetchError::InvalidConfig(
                "default TTL must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(FetchError::InvalidConfig(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// == Parallel Config ==
/// Settings for a [`ParallelFetcher`](crate::parallel::ParallelFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Batch time limit used when a caller does not pass one
    pub timeout: Duration,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }
}

// == Gateway Config ==
/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the upstream REST API
    pub upstream_url: String,
    /// Maximum number of cached responses
    pub cache_capacity: usize,
    /// Default TTL in seconds for cached responses
    pub default_ttl: u64,
    /// Expired-entry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Batch time limit in milliseconds
    pub batch_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Upstream API base URL (default: http://localhost:8080)
    /// - `CACHE_CAPACITY` - Maximum cached responses (default: 100)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `BATCH_TIMEOUT_MS` - Batch time limit in milliseconds (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            cache_capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            batch_timeout_ms: parse_var("BATCH_TIMEOUT_MS").unwrap_or(defaults.batch_timeout_ms),
        }
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.cache_capacity,
            default_ttl: Duration::from_secs(self.default_ttl),
            cleanup_interval: Duration::from_secs(self.cleanup_interval),
        }
    }

    /// Parallel fetch settings derived from this configuration.
    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            timeout: Duration::from_millis(self.batch_timeout_ms),
        }
    }

    /// Checks every derived setting.
    pub fn validate(&self) -> Result<()> {
        if self.upstream_url.trim().is_empty() {
            return Err(FetchError::InvalidConfig(
                "upstream URL must not be empty".to_string(),
            ));
        }
        if self.batch_timeout_ms == 0 {
            return Err(FetchError::InvalidConfig(
                "batch timeout must be greater than zero".to_string(),
            ));
        }
        self.cache_config().validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_url: "http://localhost:8080".to_string(),
            cache_capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL.as_secs(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL.as_secs(),
            batch_timeout_ms: DEFAULT_BATCH_TIMEOUT.as_millis() as u64,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
