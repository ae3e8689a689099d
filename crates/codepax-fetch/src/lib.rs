//! Byte retrieval for resolved source locations.
//!
//! The fetch layer turns a [`codepax_resolve::Resolved`] location into raw
//! bytes: HTTP with a configurable timeout, local files, and caller-supplied
//! function invocation. An optional cache keyed by the exact location string
//! sits in front, with single-flight coalescing so concurrent requests for
//! one uncached location perform exactly one underlying retrieval.

pub mod cache;
pub mod fetcher;
pub mod http;
pub mod singleflight;

pub use cache::{DiskCache, FetchCache, MemoryCache, NoopCache};
pub use fetcher::{ContentFetcher, FetchOptions, FunctionInvoker, NullInvoker};
pub use http::HttpFetcher;
pub use singleflight::SingleFlight;

use thiserror::Error;

/// Fetch failures. Cloneable so a single-flight leader's result can be
/// handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network error fetching {location}: {reason}")]
    Network { location: String, reason: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timeout fetching {0}")]
    Timeout(String),
    #[error("function error for {name}: {reason}")]
    Function { name: String, reason: String },
    #[error("I/O error reading {location}: {reason}")]
    Io { location: String, reason: String },
}
