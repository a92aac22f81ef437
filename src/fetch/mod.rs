//! Fetch Module
//!
//! Cache-bound fetching of a single key with observable loading/error state.

mod binding;
mod producer;

pub use binding::{BindingOptions, FetchBinding, FetchState};
pub use producer::{producer, Producer};
