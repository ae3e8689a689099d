//! Canonical content digests and the tri-state integrity check.
//!
//! Digests use the textual form `sha256:<64 lowercase hex>`. The check is a
//! pure function over bytes plus declared hash/size; it never performs I/O
//! and never fails for well-formed byte input.

use sha2::{Digest, Sha256};

/// Prefix of the canonical textual digest form.
pub const DIGEST_PREFIX: &str = "sha256:";

const HEX_LEN: usize = 64;

/// Compute the canonical digest of `data`.
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{DIGEST_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Whether `s` matches the canonical `sha256:<64 lowercase hex>` pattern.
pub fn is_canonical_digest(s: &str) -> bool {
    match s.strip_prefix(DIGEST_PREFIX) {
        Some(hex_part) => {
            hex_part.len() == HEX_LEN
                && hex_part
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        }
        None => false,
    }
}

/// Outcome of checking content against its declared digest and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestCheck {
    Match,
    SizeMismatch { expected: u64, actual: u64 },
    HashMismatch { expected: String, actual: String },
}

impl DigestCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, DigestCheck::Match)
    }
}

/// Check `data` against a declared hash and byte size.
///
/// Size is compared first: a length difference distinguishes truncation from
/// corruption without hashing the payload.
pub fn check_digest(data: &[u8], declared_hash: &str, declared_size: u64) -> DigestCheck {
    let actual_size = data.len() as u64;
    if actual_size != declared_size {
        return DigestCheck::SizeMismatch {
            expected: declared_size,
            actual: actual_size,
        };
    }
    let actual = compute_digest(data);
    if actual != declared_hash {
        return DigestCheck::HashMismatch {
            expected: declared_hash.to_owned(),
            actual,
        };
    }
    DigestCheck::Match
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256 of the empty string, well-known constant.
    const EMPTY: &str = "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digest_of_empty_input() {
        assert_eq!(compute_digest(b""), EMPTY);
    }

    #[test]
    fn digest_is_deterministic_and_content_sensitive() {
        let a = compute_digest(b"hello");
        let b = compute_digest(b"hello");
        let c = compute_digest(b"hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(DIGEST_PREFIX));
        assert_eq!(a.len(), DIGEST_PREFIX.len() + 64);
    }

    #[test]
    fn canonical_pattern_accepts_lowercase_hex_only() {
        assert!(is_canonical_digest(EMPTY));
        assert!(!is_canonical_digest("sha256:"));
        assert!(!is_canonical_digest("sha256:abc"));
        assert!(!is_canonical_digest(&EMPTY.to_uppercase()));
        assert!(!is_canonical_digest(&EMPTY.replace("sha256:", "blake3:")));
        assert!(!is_canonical_digest(&format!("{EMPTY}0")));
    }

    #[test]
    fn matching_content_passes() {
        let data = b"some content";
        let hash = compute_digest(data);
        assert_eq!(
            check_digest(data, &hash, data.len() as u64),
            DigestCheck::Match
        );
    }

    #[test]
    fn size_mismatch_reported_before_hash() {
        let data = b"some content";
        let hash = compute_digest(data);
        // Declared size wrong, declared hash also wrong: size wins.
        let check = check_digest(data, &hash, 3);
        assert_eq!(
            check,
            DigestCheck::SizeMismatch {
                expected: 3,
                actual: data.len() as u64
            }
        );
    }

    #[test]
    fn hash_mismatch_reports_both_digests() {
        let data = b"some content";
        let check = check_digest(data, EMPTY, data.len() as u64);
        match check {
            DigestCheck::HashMismatch { expected, actual } => {
                assert_eq!(expected, EMPTY);
                assert_eq!(actual, compute_digest(data));
            }
            other => panic!("expected hash mismatch, got {other:?}"),
        }
    }
}
