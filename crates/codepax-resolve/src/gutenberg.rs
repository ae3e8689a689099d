//! Normalization of `pg://` identifiers to their bare numeric form.
//!
//! The same Gutenberg text can be recorded as `pg://84`,
//! `pg://www.gutenberg.org/ebooks/84`, or `pg://files/84/84-0.txt`. Digest
//! stability across runs requires all spellings to resolve to one concrete
//! location, so known archive-path and file-extension decorations are
//! stripped before the resolver template is applied.

/// Reduce a raw `pg://` identifier to its canonical numeric id.
///
/// The id is the last path segment with filename decorations removed.
/// Falls back to the cleaned string when no digits remain, so unexpected
/// inputs still resolve deterministically rather than erroring here.
pub fn normalize_gutenberg_id(raw: &str) -> String {
    let cleaned = raw.trim().trim_matches('/');
    let mut id = cleaned.rsplit('/').next().unwrap_or(cleaned).to_owned();

    if let Some(rest) = id.strip_suffix(".txt") {
        id = rest.to_owned();
    }
    if let Some(rest) = id.strip_suffix("-0") {
        id = rest.to_owned();
    }

    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        id
    } else {
        digits
    }
}
