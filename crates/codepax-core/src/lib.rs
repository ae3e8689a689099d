//! Core orchestration engine for CodePax manifests.
//!
//! This crate ties together the schema, resolver, and fetch layers into the
//! `Engine` — the central API for hydrating, dehydrating, and verifying a
//! manifest's sources. Hydration fetches across sources concurrently under a
//! bounded worker pool; the strict/relaxed failure policy is applied
//! uniformly, and every per-source observation lands in that source's
//! append-only modification history.

pub mod concurrency;
pub mod engine;
pub mod hydrator;

pub use concurrency::parallel_map;
pub use engine::{Engine, EngineOptions, OperationReport, SourceOutcome, SourceReport, Tables};
pub use hydrator::join_segments;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] codepax_schema::ManifestError),
    #[error("source '{id}': {error}")]
    Resolve {
        id: String,
        #[source]
        error: codepax_resolve::ResolveError,
    },
    #[error("source '{id}': {error}")]
    Fetch {
        id: String,
        #[source]
        error: codepax_fetch::FetchError,
    },
    #[error("source '{id}': digest mismatch, declared {expected}, observed {actual}")]
    HashMismatch {
        id: String,
        expected: String,
        actual: String,
    },
    #[error("source '{id}': size mismatch, declared {expected} bytes, observed {actual}")]
    SizeMismatch {
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("source '{0}' has neither uri nor content")]
    MissingLocation(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
