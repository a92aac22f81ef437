//! Fetch Binding Module
//!
//! Binds one cache key to a producer and publishes render-friendly state
//! (`data`, `is_loading`, `error`, `served_from_cache`) through a watch
//! channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::fetch::Producer;

// == Fetch State ==
/// Observable state of a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<V> {
    /// Last value loaded successfully
    pub data: Option<V>,
    pub is_loading: bool,
    /// Message of the most recent failure, cleared when a load starts
    pub error: Option<String>,
    /// Whether `data` came from the cache rather than the producer
    pub served_from_cache: bool,
}

impl<V> Default for FetchState<V> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            served_from_cache: false,
        }
    }
}

// == Binding Options ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOptions {
    /// TTL for values this binding stores; `None` uses the cache default
    pub ttl: Option<Duration>,
    /// A disabled binding never invokes its producer
    pub enabled: bool,
    /// Load when activated
    pub refetch_on_bind: bool,
    /// Load when reactivated (e.g. returning to the foreground)
    pub refetch_on_reactivate: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            enabled: true,
            refetch_on_bind: true,
            refetch_on_reactivate: false,
        }
    }
}

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(0);

fn next_source_id() -> u64 {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

struct Source<V> {
    key: String,
    producer: Producer<V>,
    /// Unique across bindings, replaced whenever key or producer changes
    id: u64,
}

// == Fetch Binding ==
/// Cache-backed fetch of one key with observable state.
///
/// Failed loads keep the previous `data` and only set `error`; data is
/// removed only by [`clear_cache`](Self::clear_cache). Concurrent loads of
/// the same key and source share one producer call through the [`SharedCache`].
pub struct FetchBinding<V> {
    cache: SharedCache<V>,
    source: RwLock<Source<V>>,
    options: BindingOptions,
    state: watch::Sender<FetchState<V>>,
}

impl<V> FetchBinding<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        cache: SharedCache<V>,
        key: impl Into<String>,
        producer: Producer<V>,
        options: BindingOptions,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            cache,
            source: RwLock::new(Source {
                key: key.into(),
                producer,
                id: next_source_id(),
            }),
            options,
            state,
        }
    }

    // == Observation ==
    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState<V> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<V>> {
        self.state.subscribe()
    }

    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    pub async fn key(&self) -> String {
        self.source.read().await.key.clone()
    }

    // == Lifecycle ==
    /// Mount: loads if enabled and `refetch_on_bind` is set.
    pub async fn activate(&self) {
        if self.options.refetch_on_bind {
            self.load(false).await;
        }
    }

    /// Foreground signal: loads if enabled and `refetch_on_reactivate` is set.
    pub async fn reactivate(&self) {
        if self.options.refetch_on_reactivate {
            self.load(false).await;
        }
    }

    // == Load ==
    /// Loads the current key.
    ///
    /// Without `force_refresh`, a live cache entry is used and the producer
    /// is not called. Otherwise the producer runs and its value is cached.
    /// Key and producer are read when the load starts; if either changes
    /// before the load settles, the outcome is not written to the state.
    /// A load never joins a fetch started before the last rebind.
    pub async fn load(&self, force_refresh: bool) {
        if !self.options.enabled {
            debug!("Binding disabled, skipping load");
            return;
        }

        let (key, producer, source_id) = {
            let source = self.source.read().await;
            (source.key.clone(), Arc::clone(&source.producer), source.id)
        };

        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        if !force_refresh {
            if let Some(value) = self.cache.get(&key).await {
                self.settle(source_id, |state| {
                    state.data = Some(value);
                    state.served_from_cache = true;
                })
                .await;
                return;
            }
        }

        self.state.send_modify(|state| state.served_from_cache = false);

        let outcome = self
            .cache
            .refresh_from(&key, source_id, move || producer(), self.options.ttl)
            .await;

        self.settle(source_id, |state| match outcome {
            Ok(value) => state.data = Some(value),
            Err(e) => {
                warn!("Load of '{}' failed, keeping previous data: {}", key, e);
                state.error = Some(e.to_string());
            }
        })
        .await;
    }

    /// Forced reload, bypassing the cache.
    pub async fn refetch(&self) {
        self.load(true).await;
    }

    /// Removes this key from the cache and drops the local data. Does not
    /// fetch again.
    pub async fn clear_cache(&self) {
        let key = self.key().await;
        self.cache.delete(&key).await;
        self.state.send_modify(|state| {
            state.data = None;
            state.served_from_cache = false;
        });
    }

    // == Rebinding ==
    /// Points the binding at another key. Loads already running for the
    /// previous key will not touch the state.
    pub async fn set_key(&self, key: impl Into<String>) {
        let mut source = self.source.write().await;
        source.key = key.into();
        source.id = next_source_id();
        self.state.send_modify(|state| state.is_loading = false);
    }

    pub async fn set_producer(&self, producer: Producer<V>) {
        let mut source = self.source.write().await;
        source.producer = producer;
        source.id = next_source_id();
        self.state.send_modify(|state| state.is_loading = false);
    }

    async fn settle(&self, source_id: u64, apply: impl FnOnce(&mut FetchState<V>)) {
        if self.source.read().await.id != source_id {
            debug!("Discarding outcome of a superseded load");
            return;
        }
        self.state.send_modify(|state| {
            apply(state);
            state.is_loading = false;
        });
    }
}
