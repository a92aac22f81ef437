//! Producer Module
//!
//! The zero-argument async operation a binding calls to compute a fresh value.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

/// Re-invocable async producer. Assumed idempotent.
pub type Producer<V> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

/// Wraps an async closure as a [`Producer`].
///
/// ```ignore
/// let users = producer(move || {
///     let client = client.clone();
///     async move { client.fetch_json("/users").await }
/// });
/// ```
pub fn producer<V, F, Fut>(f: F) -> Producer<V>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}
