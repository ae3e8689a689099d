//! Resolver tables: scheme name → URL template with optional headers.
//!
//! Tables are external, non-persisted configuration supplied per call. A
//! manifest may carry its own copy under `extensions.externs`; the table
//! active at call time wins on conflicting scheme names.

use crate::ResolveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Resolution template for one scheme. `template` must contain the `{id}`
/// placeholder, substituted with the URI's host+path identifier.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResolverSpec {
    pub template: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl ResolverSpec {
    pub fn expand(&self, id: &str) -> String {
        self.template.replace("{id}", id)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ResolverTable {
    entries: BTreeMap<String, ResolverSpec>,
}

impl ResolverTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scheme: impl Into<String>, spec: ResolverSpec) {
        self.entries.insert(scheme.into(), spec);
    }

    pub fn get(&self, scheme: &str) -> Option<&ResolverSpec> {
        self.entries.get(scheme)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let content = std::fs::read_to_string(path).map_err(|e| ResolveError::TableLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ResolveError::TableLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Build a table from a manifest's `extensions` bag (`externs` key).
    /// Malformed entries are skipped with a warning; the bag is opaque data
    /// and must never make resolution itself fail.
    pub fn from_extensions(extensions: &Map<String, Value>) -> Self {
        let mut table = Self::new();
        let Some(Value::Object(externs)) = extensions.get("externs") else {
            return table;
        };
        for (scheme, raw) in externs {
            match serde_json::from_value::<ResolverSpec>(raw.clone()) {
                Ok(spec) => table.insert(scheme.clone(), spec),
                Err(e) => {
                    tracing::warn!("skipping malformed extern resolver '{scheme}': {e}");
                }
            }
        }
        table
    }

    /// Overlay `active` on top of `self`; entries from `active` win.
    #[must_use]
    pub fn merged(&self, active: &ResolverTable) -> Self {
        let mut entries = self.entries.clone();
        for (scheme, spec) in &active.entries {
            entries.insert(scheme.clone(), spec.clone());
        }
        Self { entries }
    }
}
