//! Cache Statistics Module
//!
//! Tracks hits, misses, evictions and expirations, and builds the
//! introspection snapshot returned by `KeyedCache::get_stats`.

use serde::Serialize;

/// Fixed bookkeeping overhead assumed per entry.
pub const ENTRY_OVERHEAD_BYTES: usize = 64;

/// Value size assumed when a value cannot be serialized for measurement.
pub const UNMEASURABLE_VALUE_BYTES: usize = 1024;

// == Counters ==
/// Running operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    /// Reads served from a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped to make room for a new key
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    /// hits / (hits + misses), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of a cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Entries currently held (live or not yet swept)
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
    /// Stored keys, oldest first
    pub keys: Vec<String>,
    /// Best-effort memory estimate; diagnostic only
    pub estimated_memory_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(
        capacity: usize,
        keys: Vec<String>,
        estimated_memory_bytes: usize,
        counters: CacheCounters,
    ) -> Self {
        Self {
            size: keys.len(),
            capacity,
            keys,
            estimated_memory_bytes,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            hit_rate: counters.hit_rate(),
        }
    }
}

// == Memory Estimate ==
/// Estimates the footprint of one entry as two bytes per UTF-16 code unit of
/// the key and of the JSON-serialized value, plus a fixed overhead.
///
/// A value that fails to serialize is charged [`UNMEASURABLE_VALUE_BYTES`].
pub fn estimate_entry_bytes<V: Serialize>(key: &str, value: &V) -> usize {
    let key_bytes = key.encode_utf16().count() * 2;
    let value_bytes = match serde_json::to_string(value) {
        Ok(json) => json.encode_utf16().count() * 2,
        Err(e) => {
            tracing::debug!("Could not measure cached value for '{}': {}", key, e);
            UNMEASURABLE_VALUE_BYTES
        }
    };
    key_bytes + value_bytes + ENTRY_OVERHEAD_BYTES
}
