//! Upstream Module
//!
//! HTTP access to the backend REST API.

mod client;

pub use client::{normalize_path, UpstreamClient, UpstreamPayload};
