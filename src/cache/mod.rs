//! Cache Module
//!
//! In-memory response cache with TTL expiration, oldest-first eviction,
//! pattern invalidation and de-duplicated concurrent fetches.

mod entry;
mod order;
mod pattern;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use order::InsertionOrder;
pub use pattern::KeyPattern;
pub use shared::{Fetched, SharedCache};
pub use stats::{estimate_entry_bytes, CacheCounters, CacheStats};
pub use store::KeyedCache;
