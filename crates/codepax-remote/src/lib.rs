//! Named remotes and shareable artifact forms for CodePax manifests.
//!
//! A remote is an alias for a base URL serving published manifests. Two
//! artifact forms exist: the lean `.codex.json` (the manifest document
//! itself) and the `.codex.tar` bundle, a tar archive carrying the manifest
//! plus its hydrated source content as separate files.

pub mod bundle;
pub mod config;
pub mod fetch;

pub use bundle::{pack_bundle, unpack_bundle};
pub use config::Remotes;
pub use fetch::{fetch_artifact, RemoteClient};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("bundle has no codex.json entry")]
    MissingManifest,
}

/// The two published artifact forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The manifest document on its own.
    Lean,
    /// Tar archive: manifest plus hydrated content files.
    Bundle,
}

impl ArtifactKind {
    /// Filename suffix appended to the artifact's base name.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Lean => ".codex.json",
            ArtifactKind::Bundle => ".codex.tar",
        }
    }
}
