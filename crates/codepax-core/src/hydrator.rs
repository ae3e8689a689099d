//! Per-source hydration mechanics: multi-location join, digest observation,
//! and drift recording.
//!
//! The join rule for multi-location sources is order-preserving and
//! delimiter-exact: one `\n` byte between consecutive pieces, no trimming.
//! Observations never rewrite a source's `hash`/`size_bytes` — those fields
//! are the contract being checked. Dehydration is the one place they are
//! refreshed.

use crate::CoreError;
use codepax_fetch::ContentFetcher;
use codepax_resolve::{resolve_source, FunctionTable, ResolverTable};
use codepax_schema::{
    check_digest, compute_digest, DigestCheck, ModificationRecord, ModificationStatus, Source,
};
use std::path::Path;

/// Join fetched segments with a single newline between consecutive pieces.
pub fn join_segments(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut joined = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            joined.push(b'\n');
        }
        joined.extend_from_slice(segment);
    }
    joined
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Resolve a source's locations and fetch them in declared order.
pub(crate) fn fetch_source_bytes(
    source: &Source,
    base_dir: &Path,
    resolvers: &ResolverTable,
    functions: &FunctionTable,
    fetcher: &ContentFetcher,
) -> Result<Vec<u8>, CoreError> {
    let location = source
        .uri
        .as_ref()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| CoreError::MissingLocation(source.id.to_string()))?;

    let resolved =
        resolve_source(location, base_dir, resolvers, functions).map_err(|error| {
            CoreError::Resolve {
                id: source.id.to_string(),
                error,
            }
        })?;

    let mut segments = Vec::with_capacity(resolved.len());
    for loc in &resolved {
        let bytes = fetcher.fetch(loc).map_err(|error| CoreError::Fetch {
            id: source.id.to_string(),
            error,
        })?;
        segments.push(bytes);
    }
    Ok(join_segments(&segments))
}

/// One integrity observation of freshly obtained bytes against a source's
/// declared contract.
#[derive(Debug, Clone)]
pub(crate) struct Observation {
    pub digest: String,
    pub size: u64,
    pub check: DigestCheck,
    /// The externally asserted `expected_digest` disagrees with the bytes.
    pub expected_mismatch: bool,
}

impl Observation {
    pub fn is_clean(&self) -> bool {
        self.check.is_match() && !self.expected_mismatch
    }

    fn notes(&self, source: &Source) -> Option<String> {
        let mut notes = Vec::new();
        match &self.check {
            DigestCheck::Match => {}
            DigestCheck::SizeMismatch { expected, actual } => {
                notes.push(format!("declared {expected} bytes but observed {actual}"));
            }
            DigestCheck::HashMismatch { expected, actual } => {
                notes.push(format!("declared {expected} but observed {actual}"));
            }
        }
        if self.expected_mismatch {
            if let Some(expected) = &source.expected_digest {
                notes.push(format!(
                    "expected_digest {expected} but observed {}",
                    self.digest
                ));
            }
        }
        if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        }
    }
}

pub(crate) fn observe(source: &Source, bytes: &[u8]) -> Observation {
    let digest = compute_digest(bytes);
    let expected_mismatch = source
        .expected_digest
        .as_deref()
        .is_some_and(|expected| expected != digest);
    Observation {
        digest,
        size: bytes.len() as u64,
        check: check_digest(bytes, &source.hash, source.size_bytes),
        expected_mismatch,
    }
}

/// Append the observation to the source's history and update its status.
/// A clean observation moves `drifted` back to `clean` — re-fetch now
/// matches the declared contract.
pub(crate) fn record_observation(source: &mut Source, observation: &Observation) {
    let status = if observation.is_clean() {
        ModificationStatus::Clean
    } else {
        ModificationStatus::Drifted
    };
    let notes = observation.notes(source);
    if let Some(notes) = &notes {
        tracing::warn!("source '{}' drifted: {notes}", source.id);
    }
    source.modification_history.push(ModificationRecord {
        checked_at: now_rfc3339(),
        observed_digest: observation.digest.clone(),
        observed_size: observation.size,
        expected_hash: Some(source.hash.clone()),
        expected_digest: source.expected_digest.clone(),
        status,
        notes,
    });
    source.modification_status = Some(status);
}

/// The fatal error a mismatch turns into under strict policy.
pub(crate) fn strict_failure(source: &Source, observation: &Observation) -> Option<CoreError> {
    match &observation.check {
        DigestCheck::SizeMismatch { expected, actual } => Some(CoreError::SizeMismatch {
            id: source.id.to_string(),
            expected: *expected,
            actual: *actual,
        }),
        DigestCheck::HashMismatch { expected, actual } => Some(CoreError::HashMismatch {
            id: source.id.to_string(),
            expected: expected.clone(),
            actual: actual.clone(),
        }),
        DigestCheck::Match if observation.expected_mismatch => {
            source.expected_digest.as_ref().map(|expected| {
                CoreError::HashMismatch {
                    id: source.id.to_string(),
                    expected: expected.clone(),
                    actual: observation.digest.clone(),
                }
            })
        }
        DigestCheck::Match => None,
    }
}

/// Strip inlined content, refreshing the declared digest/size from the
/// content itself. Returns false when there was nothing to strip.
pub(crate) fn dehydrate_source(source: &mut Source) -> bool {
    let Some(content) = source.content.take() else {
        return false;
    };
    let bytes = content.as_bytes();
    let digest = compute_digest(bytes);
    let size = bytes.len() as u64;

    source.modification_history.push(ModificationRecord {
        checked_at: now_rfc3339(),
        observed_digest: digest.clone(),
        observed_size: size,
        expected_hash: Some(source.hash.clone()),
        expected_digest: source.expected_digest.clone(),
        status: ModificationStatus::Clean,
        notes: Some("digest refreshed from inlined content on dehydration".to_owned()),
    });

    source.hash = digest;
    source.size_bytes = size;
    source.modification_status = Some(ModificationStatus::Clean);
    true
}
