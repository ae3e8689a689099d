//! The manifest document: root aggregate, sources, layers, and drift records.
//!
//! Manifests are UTF-8 JSON with no byte-order mark; key order is not
//! significant. The `extensions` bag is an open-ended namespaced map the
//! engine passes through unchanged across every operation.

use crate::types::{LayerId, SourceId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Manifest format version written by this crate. Documents with any `0.1.x`
/// version are accepted.
pub const SPEC_VERSION: &str = "0.1.0";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("unsupported spec_version: {0}, expected 0.1.x")]
    UnsupportedVersion(String),
}

/// Failure policy shared by hydration, verification, and validation.
///
/// Strict aborts a multi-source operation on the first error and leaves the
/// manifest unmodified; relaxed records every problem and proceeds with
/// whatever succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Strict,
    Relaxed,
}

/// Physical state of a manifest: reference-only or fully inlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestState {
    Lite,
    Dense,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub spec_version: String,
    pub uuid: String,
    pub meta: MetaSection,
    /// Provenance of the authoring step; opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
    /// Usage/system-prompt hints; opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Value>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Manifest-level history records; opaque to the engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Value>,
    /// Open-ended namespaced extension bag, passed through unchanged. May
    /// carry `externs` (resolver table) and `functions` (function table)
    /// copies; the table supplied at call time wins over these.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetaSection {
    pub name: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub version: Option<String>,
    pub state: ManifestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_author() -> String {
    "Unknown".to_owned()
}

fn default_category() -> String {
    "general".to_owned()
}

/// One or more location references for a source. Order is significant:
/// multi-location sources are joined in declared order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceLocation {
    Single(String),
    Multi(Vec<String>),
}

impl SourceLocation {
    /// Normalize to an ordered list of one-or-more URIs so downstream join
    /// logic has a single code path.
    pub fn uris(&self) -> Vec<&str> {
        match self {
            SourceLocation::Single(uri) => vec![uri.as_str()],
            SourceLocation::Multi(uris) => uris.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SourceLocation::Single(uri) => uri.is_empty(),
            SourceLocation::Multi(uris) => uris.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationStatus {
    Clean,
    Drifted,
    Unknown,
}

/// One observation in a source's append-only drift log.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModificationRecord {
    pub checked_at: String,
    pub observed_digest: String,
    pub observed_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_digest: Option<String>,
    pub status: ModificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Curation {
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
    /// Curation data beyond exclusions is stored verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An exclusion range over a source's content. The engine stores and reports
/// these; it never interprets them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Exclusion {
    pub start: u64,
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Source {
    pub id: SourceId,
    /// Absent only for sources that carry inline content from authoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Declared digest, canonical `sha256:<64 hex>` form.
    pub hash: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curation: Option<Curation>,
    /// Externally asserted checksum, distinct from the manifest's own `hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification_status: Option<ModificationStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modification_history: Vec<ModificationRecord>,
}

fn default_encoding() -> String {
    "utf-8".to_owned()
}

impl Source {
    /// Content bytes as stored (UTF-8), if inlined.
    pub fn content_bytes(&self) -> Option<&[u8]> {
        self.content.as_deref().map(str::as_bytes)
    }
}

/// A named view over the manifest's sources — a persona or an analysis.
/// Layers consume hydrated content; they carry no integrity obligations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Non-owning references to source ids; must resolve to existing sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceId>,
}

fn version_supported(version: &str) -> bool {
    version == "0.1" || version.starts_with("0.1.")
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_str(input)?;
    if !version_supported(&manifest.spec_version) {
        return Err(ManifestError::UnsupportedVersion(
            manifest.spec_version.clone(),
        ));
    }
    Ok(manifest)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

pub fn write_manifest_file(manifest: &Manifest, path: impl AsRef<Path>) -> Result<(), ManifestError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut content = serde_json::to_string_pretty(manifest)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}
