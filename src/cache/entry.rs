//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A cached value together with the instant it was stored and its TTL.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub data: V,
    /// Insertion or last refresh time
    pub stored_at: Instant,
    /// Time-to-live relative to `stored_at`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stored now.
    pub fn new(data: V, ttl: Duration) -> Self {
        Self::stored_at(data, ttl, Instant::now())
    }

    /// Creates an entry with an explicit storage instant.
    pub fn stored_at(data: V, ttl: Duration, stored_at: Instant) -> Self {
        Self {
            data,
            stored_at,
            ttl,
        }
    }

    // == Liveness ==
    /// Checks whether the entry is still live at `now`.
    ///
    /// An entry is live while `now - stored_at <= ttl`, so the exact expiry
    /// instant still counts as live.
    pub fn is_live_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) <= self.ttl
    }

    /// Checks whether the entry has expired as of now.
    pub fn is_expired(&self) -> bool {
        !self.is_live_at(Instant::now())
    }

    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl
            .saturating_sub(Instant::now().saturating_duration_since(self.stored_at))
    }
}
