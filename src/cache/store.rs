//! Keyed Cache Module
//!
//! Main cache engine combining HashMap storage with insertion-order tracking
//! and lazy TTL expiration.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::stats::estimate_entry_bytes;
use crate::cache::{CacheCounters, CacheEntry, CacheStats, InsertionOrder, KeyPattern};
use crate::config::CacheConfig;
use crate::error::{FetchError, Result};

// == Keyed Cache ==
/// Capacity-bounded, TTL-expiring store keyed by string.
///
/// Expired entries are removed when they are read (`get`, `has`) or by an
/// explicit `clear_expired` sweep. When the cache is full, storing a new key
/// evicts the entry with the oldest store time; reads do not affect eviction
/// order.
#[derive(Debug)]
pub struct KeyedCache<V = serde_json::Value> {
    entries: HashMap<String, CacheEntry<V>>,
    order: InsertionOrder,
    counters: CacheCounters,
    capacity: usize,
    default_ttl: Duration,
}

impl<V: Clone> KeyedCache<V> {
    // == Constructor ==
    /// Creates an empty cache. A capacity of zero is raised to one.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            counters: CacheCounters::default(),
            capacity: capacity.max(1),
            default_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.default_ttl)
    }

    // == Get ==
    /// Returns the value for `key` if it is live.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if self.evict_if_expired(key) {
            self.counters.record_miss();
            return None;
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.counters.record_hit();
                debug!("Cache hit: {}", key);
                Some(entry.data.clone())
            }
            None => {
                self.counters.record_miss();
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    // == Has ==
    /// Reports whether `key` holds a live entry, evicting it if expired.
    pub fn has(&mut self, key: &str) -> bool {
        !self.evict_if_expired(key) && self.entries.contains_key(key)
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any existing entry and resetting
    /// its store time.
    ///
    /// If the cache is full and `key` is new, the oldest stored entry is
    /// evicted first. `ttl` defaults to the cache's default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_oldest() {
                self.entries.remove(&oldest);
                self.counters.record_eviction();
                debug!("Evicted oldest entry '{}' to make room for '{}'", oldest, key);
            }
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        self.order.record(&key);
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Clear Expired ==
    /// Removes every expired entry and returns how many were removed.
    pub fn clear_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_live_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.order.remove(key);
        }

        self.counters.record_expirations(expired.len());
        expired.len()
    }

    // == Invalidate Pattern ==
    /// Removes every key matched by `pattern` and returns the count.
    pub fn invalidate_pattern(&mut self, pattern: &KeyPattern) -> usize {
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &matched {
            self.entries.remove(key);
            self.order.remove(key);
        }

        debug!("Invalidated {} entries matching {:?}", matched.len(), pattern);
        matched.len()
    }

    // == Get Or Set ==
    /// Returns the live value for `key`, or awaits `producer`, caches its
    /// result and returns it.
    ///
    /// A failing producer is reported as [`FetchError::Producer`] and nothing
    /// is cached. This borrows the cache for the whole call; use
    /// [`SharedCache::get_or_set`](crate::cache::SharedCache::get_or_set) when
    /// several tasks share a cache.
    pub async fn get_or_set<F, Fut>(
        &mut self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = producer().await.map_err(|e| FetchError::producer(&e))?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    // == Bulk Access ==
    /// Looks up every key; absent or expired keys map to `None`.
    pub fn get_multiple<I, K>(&mut self, keys: I) -> HashMap<String, Option<V>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.get(key))
            })
            .collect()
    }

    /// Stores every pair in iteration order with the same TTL.
    pub fn set_multiple<I, K>(&mut self, entries: I, ttl: Option<Duration>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.set(key, value, ttl);
        }
    }

    // == Accessors ==
    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    /// Drops `key` if its entry has expired. Returns true when it did.
    fn evict_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_live_at(Instant::now()));

        if expired {
            self.entries.remove(key);
            self.order.remove(key);
            self.counters.record_expirations(1);
            debug!("Cache entry expired: {}", key);
        }
        expired
    }
}

impl<V: Clone + Serialize> KeyedCache<V> {
    // == Stats ==
    /// Returns size, capacity, keys (oldest first) and a memory estimate.
    pub fn get_stats(&self) -> CacheStats {
        let keys: Vec<String> = self.order.oldest_first().cloned().collect();
        let estimated_memory_bytes = self
            .entries
            .iter()
            .map(|(key, entry)| estimate_entry_bytes(key, &entry.data))
            .sum();

        CacheStats::new(self.capacity, keys, estimated_memory_bytes, self.counters)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::advance;

    const TTL: Duration = Duration::from_secs(300);

    fn store() -> KeyedCache<String> {
        KeyedCache::new(100, TTL)
    }

    #[test]
    fn test_store_new() {
        let cache = store();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 100);
        assert_eq!(cache.default_ttl(), TTL);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache: KeyedCache<String> = KeyedCache::new(0, TTL);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = store();
        cache.set("key1", "value1".to_string(), None);

        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let mut cache = store();
        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.counters().misses, 1);
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let mut cache = store();
        cache.set("key1", "v1".to_string(), None);
        cache.set("key1", "v2".to_string(), None);

        assert_eq!(cache.get("key1"), Some("v2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut cache = store();
        cache.set("key1", "value1".to_string(), None);

        assert!(cache.delete("key1"));
        assert!(!cache.delete("key1"));
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_clear() {
        let mut cache = store();
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get_stats().keys.is_empty());
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut cache: KeyedCache<String> = KeyedCache::new(3, TTL);
        for key in ["k1", "k2", "k3", "k4"] {
            cache.set(key, key.to_uppercase(), None);
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.counters().evictions, 1);
        assert!(!cache.has("k1"));
        assert!(cache.has("k2"));
        assert!(cache.has("k3"));
        assert!(cache.has("k4"));
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let mut cache: KeyedCache<String> = KeyedCache::new(2, TTL);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);

        // a is still the oldest stored entry
        cache.get("a");
        cache.set("c", "3".to_string(), None);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_overwrite_refreshes_eviction_order() {
        let mut cache: KeyedCache<String> = KeyedCache::new(2, TTL);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        cache.set("a", "1b".to_string(), None);
        cache.set("c", "3".to_string(), None);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some("1b".to_string()));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut cache: KeyedCache<String> = KeyedCache::new(2, TTL);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        cache.set("b", "2b".to_string(), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.counters().evictions, 0);
    }

    #[test]
    fn test_invalidate_pattern() {
        let mut cache = store();
        cache.set("user:1", "a".to_string(), None);
        cache.set("user:2", "b".to_string(), None);
        cache.set("order:1", "c".to_string(), None);

        let pattern = KeyPattern::regex("^user:").unwrap();
        assert_eq!(cache.invalidate_pattern(&pattern), 2);
        assert_eq!(cache.get("order:1"), Some("c".to_string()));
        assert_eq!(cache.get("user:1"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_literal_prefix() {
        let mut cache = store();
        cache.set("a.b", "1".to_string(), None);
        cache.set("axb", "2".to_string(), None);

        assert_eq!(cache.invalidate_pattern(&KeyPattern::prefix("a.")), 1);
        assert!(cache.has("axb"));
    }

    #[test]
    fn test_get_multiple_and_set_multiple() {
        let mut cache = store();
        cache.set_multiple(vec![("a", "1".to_string()), ("b", "2".to_string())], None);

        let found = cache.get_multiple(["a", "b", "c"]);
        assert_eq!(found.len(), 3);
        assert_eq!(found["a"], Some("1".to_string()));
        assert_eq!(found["b"], Some("2".to_string()));
        assert_eq!(found["c"], None);
    }

    #[test]
    fn test_stats() {
        let mut cache = store();
        cache.set("b", "2".to_string(), None);
        cache.set("a", "1".to_string(), None);
        cache.get("a");
        cache.get("missing");

        let stats = cache.get_stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.keys, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!(stats.estimated_memory_bytes > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration_on_get() {
        let mut cache = store();
        cache.set("key1", "value1".to_string(), Some(Duration::from_millis(1000)));

        advance(Duration::from_millis(1000)).await;
        assert_eq!(cache.get("key1"), Some("value1".to_string()));

        advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.len(), 0, "expired entry removed by the read");
        assert_eq!(cache.counters().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_evicts_expired() {
        let mut cache = store();
        cache.set("key1", "value1".to_string(), Some(Duration::from_secs(1)));

        advance(Duration::from_secs(2)).await;
        assert!(!cache.has("key1"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_expired() {
        let mut cache = store();
        cache.set("short", "1".to_string(), Some(Duration::from_secs(1)));
        cache.set("long", "2".to_string(), Some(Duration::from_secs(10)));

        advance(Duration::from_millis(1100)).await;

        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("long"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_and_expiry_scenario() {
        let mut cache: KeyedCache<i32> = KeyedCache::new(2, Duration::from_millis(1000));

        cache.set("a", 1, None);
        advance(Duration::from_millis(10)).await;
        cache.set("b", 2, None);
        advance(Duration::from_millis(10)).await;
        cache.set("c", 3, None);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));

        // now t=1100: b expired at 1010, c at 1020
        advance(Duration::from_millis(1080)).await;
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.clear_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_and_expiry_scenario_sweep_only() {
        let mut cache: KeyedCache<i32> = KeyedCache::new(2, Duration::from_millis(1000));

        cache.set("a", 1, None);
        advance(Duration::from_millis(10)).await;
        cache.set("b", 2, None);
        advance(Duration::from_millis(10)).await;
        cache.set("c", 3, None);

        advance(Duration::from_millis(1080)).await;
        assert_eq!(cache.clear_expired(), 2);
    }

    #[tokio::test]
    async fn test_get_or_set_invokes_producer_once() {
        let mut cache = store();
        let counter = Cell::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let value = cache
                .get_or_set(
                    "key",
                    move || async move {
                        calls.set(calls.get() + 1);
                        Ok("fresh".to_string())
                    },
                    None,
                )
                .await
                .unwrap();
            assert_eq!(value, "fresh");
        }

        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_cache_failures() {
        let mut cache = store();

        let result = cache
            .get_or_set("key", || async { Err(anyhow::anyhow!("boom")) }, None)
            .await;

        assert_eq!(result, Err(FetchError::Producer("boom".to_string())));
        assert!(!cache.has("key"));
    }
}
