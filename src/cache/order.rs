//! Insertion Order Module
//!
//! Tracks the order in which keys were stored so the oldest can be evicted.

use std::collections::VecDeque;

// == Insertion Order ==
/// Keys ordered by their last store time.
///
/// - Front = most recently stored
/// - Back = oldest stored
///
/// Reads never reorder keys; only a store (insert or overwrite) moves a key
/// to the front. Since `stored_at` is taken from a monotonic clock on every
/// store, the back of the queue is always the entry with the smallest
/// `stored_at`.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<String>,
}

impl InsertionOrder {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Marks `key` as the most recently stored.
    pub fn record(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Pop Oldest ==
    /// Removes and returns the oldest stored key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.back()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys from oldest to newest.
    pub fn oldest_first(&self) -> impl Iterator<Item = &String> {
        self.order.iter().rev()
    }
}
