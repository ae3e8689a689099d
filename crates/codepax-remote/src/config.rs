use crate::{ArtifactKind, RemoteError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Alias → base URL map of named remotes.
///
/// Stored as a flat JSON object, by default at
/// `~/.config/codepax/remotes.json`. Base URLs are normalized by trimming
/// trailing slashes on insert and load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Remotes {
    entries: BTreeMap<String, String>,
}

impl Remotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, url: &str) {
        self.entries
            .insert(alias.into(), url.trim_end_matches('/').to_owned());
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full URL of a named artifact on a remote.
    pub fn artifact_url(
        &self,
        alias: &str,
        name: &str,
        kind: ArtifactKind,
    ) -> Result<String, RemoteError> {
        let base = self
            .get(alias)
            .ok_or_else(|| RemoteError::Config(format!("unknown remote '{alias}'")))?;
        Ok(format!("{base}/{name}{}", kind.extension()))
    }

    /// Load remotes from `~/.config/codepax/remotes.json`.
    pub fn load_default() -> Result<Self, RemoteError> {
        Self::load(&default_config_path()?)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let loaded: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid remotes file: {e}")))?;
        let mut normalized = Self::new();
        for (alias, url) in &loaded.entries {
            normalized.insert(alias.clone(), url);
        }
        Ok(normalized)
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/codepax/remotes.json"))
}
