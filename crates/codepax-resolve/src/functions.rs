//! Function tables for `func://` pseudo-URIs.
//!
//! A function table maps a name to the specification of an on-demand
//! computed value. The engine validates the table (each entry must declare a
//! `name` or `id`) before any `func://` location is resolved against it; the
//! actual invocation backend is supplied by the caller.

use crate::ResolveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FunctionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FunctionSpec {
    /// The callable name: `name` wins, `id` is the fallback.
    pub fn callable_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FunctionTable {
    entries: BTreeMap<String, FunctionSpec>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: FunctionSpec) {
        self.entries.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.entries.get(name)
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

    /// Build a table from a manifest's `extensions` bag (`functions` key).
    pub fn from_extensions(extensions: &Map<String, Value>) -> Self {
        let mut table = Self::new();
        let Some(Value::Object(functions)) = extensions.get("functions") else {
            return table;
        };
        for (name, raw) in functions {
            match serde_json::from_value::<FunctionSpec>(raw.clone()) {
                Ok(spec) => table.insert(name.clone(), spec),
                Err(e) => {
                    tracing::warn!("skipping malformed function spec '{name}': {e}");
                }
            }
        }
        table
    }

    /// Overlay `active` on top of `self`; entries from `active` win.
    #[must_use]
    pub fn merged(&self, active: &FunctionTable) -> Self {
        let mut entries = self.entries.clone();
        for (name, spec) in &active.entries {
            entries.insert(name.clone(), spec.clone());
        }
        Self { entries }
    }

    /// Check every entry declares a callable name. Must pass before any
    /// `func://` location is resolved against this table.
    pub fn validate(&self) -> Result<(), ResolveError> {
        for (name, spec) in &self.entries {
            if spec.callable_name().is_none() {
                return Err(ResolveError::InvalidFunction {
                    name: name.clone(),
                    reason: "missing required 'name' or 'id'".to_owned(),
                });
            }
        }
        Ok(())
    }
}
