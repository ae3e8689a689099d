//! Keyed fetch caches.
//!
//! The cache is keyed by the exact resolved-location string and is purely an
//! optimization: clearing it must not change hydration outcomes, only
//! performance. Cache write failures are therefore logged and swallowed,
//! never propagated.

use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub trait FetchCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, data: &[u8]);
}

/// Cache that stores nothing. Useful for deterministic fetch-count
/// assertions in tests and for callers that want every fetch live.
#[derive(Debug, Default)]
pub struct NoopCache;

impl FetchCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _key: &str, _data: &[u8]) {}
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FetchCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, data: &[u8]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), data.to_vec());
        }
    }
}

/// Append-only on-disk cache, safe for concurrent readers and writers.
///
/// Entries are files named by the SHA-256 of the location key. Writes go
/// through a tempfile plus atomic rename, serialized by an exclusive `fs2`
/// lock on a shared lock file, so readers only ever see complete entries.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{}.bin", hex::encode(hasher.finalize())))
    }

    fn lock_writer(&self) -> std::io::Result<File> {
        let lock_path = self.dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

impl FetchCache for DiskCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(data) => Some(data),
            Err(_) => None,
        }
    }

    fn put(&self, key: &str, data: &[u8]) {
        let result = (|| -> std::io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            let lock = self.lock_writer()?;

            let dest = self.entry_path(key);
            if !dest.exists() {
                let mut tmp = NamedTempFile::new_in(&self.dir)?;
                tmp.write_all(data)?;
                tmp.as_file().sync_all()?;
                tmp.persist(&dest).map_err(|e| e.error)?;
            }

            drop(lock);
            Ok(())
        })();

        if let Err(e) = result {
            tracing::warn!("disk cache write failed for '{key}': {e}");
        }
    }
}
