//! Shared Cache Module
//!
//! Thread-safe handle over a [`KeyedCache`] that also de-duplicates
//! concurrent fetches: callers asking for the same key while a producer is
//! still running join that producer instead of starting another. Producers
//! run as spawned tasks, so a fetch finishes even when nobody awaits it.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::{CacheStats, KeyPattern, KeyedCache};
use crate::config::CacheConfig;
use crate::error::{FetchError, Result};

const PRODUCER_PANICKED: &str = "Producer panicked";

type Computation<V> = Shared<BoxFuture<'static, Result<V>>>;

/// A running producer registered for one key.
struct InFlight<V> {
    /// Unique per started computation
    id: u64,
    /// Who started it; `None` for plain cache reads
    origin: Option<u64>,
    computation: Computation<V>,
}

/// A value returned by [`SharedCache::fetch`], tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<V> {
    pub value: V,
    pub served_from_cache: bool,
}

// == Shared Cache ==
/// Cloneable handle to one cache shared by many tasks.
///
/// Every operation takes the cache lock, so eviction-then-insert in `set`
/// is atomic across threads.
pub struct SharedCache<V = serde_json::Value> {
    store: Arc<RwLock<KeyedCache<V>>>,
    in_flight: Arc<Mutex<HashMap<String, InFlight<V>>>>,
    next_id: Arc<AtomicU64>,
}

impl<V> Clone for SharedCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            in_flight: Arc::clone(&self.in_flight),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<V> SharedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: KeyedCache<V>) -> Self {
        Self {
            store: Arc::new(RwLock::new(cache)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(KeyedCache::from_config(config))
    }

    // == Pass-through Operations ==
    pub async fn get(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.store.write().await.set(key, value, ttl);
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    pub async fn clear_expired(&self) -> usize {
        self.store.write().await.clear_expired()
    }

    pub async fn invalidate_pattern(&self, pattern: &KeyPattern) -> usize {
        self.store.write().await.invalidate_pattern(pattern)
    }

    pub async fn get_multiple<I, K>(&self, keys: I) -> HashMap<String, Option<V>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.store.write().await.get_multiple(keys)
    }

    pub async fn set_multiple<I, K>(&self, entries: I, ttl: Option<Duration>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        self.store.write().await.set_multiple(entries, ttl);
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Number of keys with a registered producer still running.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    // == Get Or Set ==
    /// Returns the live value for `key`, or runs `producer` at most once
    /// across all concurrent callers and caches its result.
    ///
    /// A failure is returned to every joined caller and is not cached.
    pub async fn get_or_set<F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.fetch(key, producer, ttl).await.map(|fetched| fetched.value)
    }

    /// Like [`get_or_set`](Self::get_or_set), also reporting whether the
    /// value was a cache hit.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        if let Some(value) = self.get(key).await {
            return Ok(Fetched {
                value,
                served_from_cache: true,
            });
        }
        self.join_or_start(key, None, producer, ttl, true).await
    }

    // == Refresh ==
    /// Runs `producer` without consulting the cache, joining a fetch that is
    /// already running for `key` if there is one.
    pub async fn refresh<F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.join_or_start(key, None, producer, ttl, false)
            .await
            .map(|fetched| fetched.value)
    }

    /// Like [`refresh`](Self::refresh), but only joins a running fetch that
    /// was started under the same `origin`.
    ///
    /// A fetch from any other origin is superseded: it still completes for
    /// its own callers, but no longer writes the cache.
    pub async fn refresh_from<F, Fut>(
        &self,
        key: &str,
        origin: u64,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.join_or_start(key, Some(origin), producer, ttl, false)
            .await
            .map(|fetched| fetched.value)
    }

    async fn join_or_start<F, Fut>(
        &self,
        key: &str,
        origin: Option<u64>,
        producer: F,
        ttl: Option<Duration>,
        recheck_cache: bool,
    ) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let computation = {
            let mut in_flight = self.in_flight.lock().await;

            // A producer may have finished between the first lookup and here.
            if recheck_cache {
                if let Some(value) = self.store.write().await.get(key) {
                    return Ok(Fetched {
                        value,
                        served_from_cache: true,
                    });
                }
            }

            match in_flight.get(key) {
                Some(running) if origin.is_none() || running.origin == origin => {
                    debug!("Joining in-flight fetch for '{}'", key);
                    running.computation.clone()
                }
                _ => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let computation = self.start(key.to_string(), id, producer, ttl);
                    in_flight.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            origin,
                            computation: computation.clone(),
                        },
                    );
                    computation
                }
            }
        };

        computation.await.map(|value| Fetched {
            value,
            served_from_cache: false,
        })
    }

    /// Spawns the producer for `key` and returns a handle every caller can
    /// await.
    ///
    /// The task runs to completion even if all callers go away. While its
    /// slot `id` is still the one registered for `key`, it writes the cache
    /// on success and releases the slot whatever the outcome.
    fn start<F, Fut>(
        &self,
        key: String,
        id: u64,
        producer: F,
        ttl: Option<Duration>,
    ) -> Computation<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            debug!("Starting producer for '{}'", key);
            let outcome = match AssertUnwindSafe(async move { producer().await })
                .catch_unwind()
                .await
            {
                Ok(result) => result.map_err(|e| FetchError::producer(&e)),
                Err(_) => Err(FetchError::Producer(PRODUCER_PANICKED.to_string())),
            };

            let mut in_flight = in_flight.lock().await;
            if in_flight.get(&key).is_some_and(|slot| slot.id == id) {
                in_flight.remove(&key);
                match &outcome {
                    Ok(value) => store.write().await.set(key.clone(), value.clone(), ttl),
                    Err(e) => warn!("Producer for '{}' failed: {}", key, e),
                }
            } else {
                debug!("Fetch for '{}' was superseded, not caching its outcome", key);
            }
            outcome
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(FetchError::Producer(e.to_string())))
        }
        .boxed()
        .shared()
    }
}

impl<V> SharedCache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    pub async fn get_stats(&self) -> CacheStats {
        self.store.read().await.get_stats()
    }
}
