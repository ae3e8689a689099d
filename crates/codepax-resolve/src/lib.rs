//! Scheme resolution for CodePax source locations.
//!
//! Maps a source's location references — plain URLs, `file://` paths,
//! relative paths, custom resolver schemes such as `pg://`, and `func://`
//! pseudo-URIs — to an ordered list of concrete, fetchable locations.
//! Resolution is pure and deterministic: tables are passed in per call and
//! failures come back as typed results, never panics.

pub mod functions;
pub mod gutenberg;
pub mod location;
pub mod table;

pub use functions::{FunctionSpec, FunctionTable};
pub use gutenberg::normalize_gutenberg_id;
pub use location::{resolve_location, resolve_source, Resolved};
pub use table::{ResolverSpec, ResolverTable};

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("unresolved scheme '{scheme}' in '{uri}': no resolver table entry")]
    UnresolvedScheme { scheme: String, uri: String },
    #[error("resolver for scheme '{scheme}' has no url template")]
    MissingTemplate { scheme: String },
    #[error("function '{0}' not found in function table")]
    FunctionNotFound(String),
    #[error("invalid function '{name}': {reason}")]
    InvalidFunction { name: String, reason: String },
    #[error("failed to load table from {path}: {reason}")]
    TableLoad { path: String, reason: String },
}
