//! Parallel Fetch Module
//!
//! Concurrent execution of independently keyed operations with per-call
//! error isolation and an optional batch-wide timeout.

mod call;
mod orchestrator;

pub use call::{BatchReport, CallOutcome, ParallelBatch, ParallelCall};
pub use orchestrator::ParallelFetcher;
