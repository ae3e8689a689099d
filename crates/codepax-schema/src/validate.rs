//! Read-only structural and integrity validation of a manifest.
//!
//! The validator is the non-mutating counterpart of the engine: it walks the
//! document, collects ordered violations tagged with their field path, and
//! classifies each by severity. Dangling layer→source references are errors
//! in both modes; overlapping exclusion ranges are always warnings.

use crate::digest::{check_digest, is_canonical_digest, DigestCheck};
use crate::manifest::{Manifest, ManifestState, Mode, Source};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Structural,
    Reference,
    HashMismatch,
    SizeMismatch,
}

/// One problem found in a manifest, tagged with the offending field path.
#[derive(Debug, Clone)]
pub struct Violation {
    pub path: String,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    ValidWithWarnings,
    Invalid,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn outcome(&self) -> Validity {
        if self
            .violations
            .iter()
            .any(|v| v.severity == Severity::Error)
        {
            Validity::Invalid
        } else if self.violations.is_empty() {
            Validity::Valid
        } else {
            Validity::ValidWithWarnings
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
    }

    fn push(&mut self, path: String, kind: ViolationKind, severity: Severity, message: String) {
        self.violations.push(Violation {
            path,
            kind,
            severity,
            message,
        });
    }
}

/// Severity of an ordinary (non-reference) violation under the given mode.
fn graded(mode: Mode) -> Severity {
    match mode {
        Mode::Strict => Severity::Error,
        Mode::Relaxed => Severity::Warning,
    }
}

/// Validate a manifest without mutating it.
pub fn validate_manifest(manifest: &Manifest, mode: Mode) -> ValidationReport {
    let mut report = ValidationReport::default();

    if manifest.uuid.is_empty() {
        report.push(
            "uuid".to_owned(),
            ViolationKind::Structural,
            graded(mode),
            "uuid must not be empty".to_owned(),
        );
    }

    let mut seen_ids = BTreeSet::new();
    for (idx, source) in manifest.sources.iter().enumerate() {
        validate_source(source, idx, mode, &mut report);
        if !seen_ids.insert(source.id.as_str()) {
            report.push(
                format!("sources[{idx}].id"),
                ViolationKind::Structural,
                graded(mode),
                format!("duplicate source id '{}'", source.id),
            );
        }
    }

    // A dense manifest must have every located source inlined; a lite one
    // must have no content at all.
    for (idx, source) in manifest.sources.iter().enumerate() {
        match manifest.meta.state {
            ManifestState::Dense if source.content.is_none() && source.uri.is_some() => {
                report.push(
                    format!("sources[{idx}].content"),
                    ViolationKind::Structural,
                    graded(mode),
                    format!("state is dense but source '{}' has no content", source.id),
                );
            }
            ManifestState::Lite if source.content.is_some() => {
                report.push(
                    format!("sources[{idx}].content"),
                    ViolationKind::Structural,
                    graded(mode),
                    format!("state is lite but source '{}' carries content", source.id),
                );
            }
            _ => {}
        }
    }

    for (lidx, layer) in manifest.layers.iter().enumerate() {
        for (ridx, reference) in layer.sources.iter().enumerate() {
            let resolves = manifest.sources.iter().any(|s| s.id == *reference);
            if !resolves {
                // A reference to a source that truly does not exist is never
                // merely warned about.
                report.push(
                    format!("layers[{lidx}].sources[{ridx}]"),
                    ViolationKind::Reference,
                    Severity::Error,
                    format!(
                        "layer '{}' references unknown source '{reference}'",
                        layer.id
                    ),
                );
            }
        }
    }

    report
}

fn validate_source(source: &Source, idx: usize, mode: Mode, report: &mut ValidationReport) {
    let prefix = format!("sources[{idx}]");

    if source.id.is_empty() {
        report.push(
            format!("{prefix}.id"),
            ViolationKind::Structural,
            graded(mode),
            "source id must not be empty".to_owned(),
        );
    }

    if !is_canonical_digest(&source.hash) {
        report.push(
            format!("{prefix}.hash"),
            ViolationKind::Structural,
            graded(mode),
            format!(
                "hash '{}' does not match sha256:<64 lowercase hex>",
                source.hash
            ),
        );
    }

    let has_uri = source.uri.as_ref().is_some_and(|u| !u.is_empty());
    if source.content.is_none() && !has_uri {
        report.push(
            format!("{prefix}.uri"),
            ViolationKind::Structural,
            graded(mode),
            format!("source '{}' has neither uri nor content", source.id),
        );
    }

    if let Some(content) = source.content_bytes() {
        // Integrity pass: identical to the digest verifier's check.
        match check_digest(content, &source.hash, source.size_bytes) {
            DigestCheck::Match => {}
            DigestCheck::SizeMismatch { expected, actual } => {
                report.push(
                    format!("{prefix}.size_bytes"),
                    ViolationKind::SizeMismatch,
                    graded(mode),
                    format!(
                        "source '{}' declares {expected} bytes but content is {actual}",
                        source.id
                    ),
                );
            }
            DigestCheck::HashMismatch { expected, actual } => {
                report.push(
                    format!("{prefix}.hash"),
                    ViolationKind::HashMismatch,
                    graded(mode),
                    format!(
                        "source '{}' content digest {actual} does not match declared {expected}",
                        source.id
                    ),
                );
            }
        }
    }

    if let Some(curation) = &source.curation {
        let mut last_end: Option<u64> = None;
        for (eidx, excl) in curation.exclusions.iter().enumerate() {
            let path = format!("{prefix}.curation.exclusions[{eidx}]");
            if excl.start > excl.end {
                report.push(
                    path,
                    ViolationKind::Structural,
                    graded(mode),
                    format!(
                        "exclusion start {} is after end {} in source '{}'",
                        excl.start, excl.end, source.id
                    ),
                );
                continue;
            }
            if let Some(prev_end) = last_end {
                if excl.start <= prev_end {
                    // Overlap is warning-level in both modes: the engine
                    // stores exclusions, it does not interpret or merge them.
                    report.push(
                        path,
                        ViolationKind::Structural,
                        Severity::Warning,
                        format!(
                            "exclusions overlap or are unordered at {}-{} in source '{}'",
                            excl.start, excl.end, source.id
                        ),
                    );
                }
            }
            last_end = Some(last_end.map_or(excl.end, |p| p.max(excl.end)));
        }
    }
}
