//! Manifest data model, digest verification, and structural validation for CodePax.
//!
//! This crate defines the schema layer: the JSON manifest document
//! (`Manifest`, `Source`, `Layer`), the canonical `sha256:` digest form and
//! its tri-state check (`DigestCheck`), and the read-only validator
//! (`validate_manifest`) that reports structural and integrity violations
//! without mutating the document.

pub mod digest;
pub mod manifest;
pub mod types;
pub mod validate;

pub use digest::{check_digest, compute_digest, is_canonical_digest, DigestCheck, DIGEST_PREFIX};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, write_manifest_file, Curation, Exclusion, Layer,
    Manifest, ManifestError, ManifestState, MetaSection, Mode, ModificationRecord,
    ModificationStatus, Source, SourceLocation, SPEC_VERSION,
};
pub use types::{LayerId, SourceId};
pub use validate::{validate_manifest, Severity, ValidationReport, Validity, Violation, ViolationKind};
