//! The `.codex.tar` bundle form.
//!
//! A bundle carries the manifest as `codex.json` with content stripped, plus
//! one file per hydrated source under `content/<source-id><ext>`. The
//! extension comes from the source's first location reference, falling back
//! to `.txt`. Archives are deterministic: zeroed timestamps and ownership,
//! entries in manifest order behind the leading `codex.json`.

use crate::RemoteError;
use codepax_schema::{parse_manifest_str, Manifest, ManifestState, Source};
use std::io::Read;

const MANIFEST_ENTRY: &str = "codex.json";
const CONTENT_DIR: &str = "content";

/// Archive path of a source's content file.
pub fn content_entry_path(source: &Source) -> String {
    let ext = source
        .uri
        .as_ref()
        .and_then(|location| location.uris().first().copied())
        .and_then(extension_of)
        .unwrap_or_else(|| ".txt".to_owned());
    format!("{CONTENT_DIR}/{}{ext}", source.id)
}

fn extension_of(uri: &str) -> Option<String> {
    let last = uri.rsplit('/').next().unwrap_or(uri);
    let last = last.split(['?', '#']).next().unwrap_or(last);
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{ext}"))
}

fn file_header(size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(0o644);
    header.set_size(size);
    header.set_cksum();
    header
}

/// Pack a manifest and its hydrated content into a bundle archive. Sources
/// without content contribute no content file; the embedded manifest is
/// always the stripped, reference-only form.
pub fn pack_bundle(manifest: &Manifest) -> Result<Vec<u8>, RemoteError> {
    let mut lean = manifest.clone();
    for source in &mut lean.sources {
        source.content = None;
    }
    lean.meta.state = ManifestState::Lite;
    let manifest_json = serde_json::to_vec_pretty(&lean)
        .map_err(|e| RemoteError::Serialization(e.to_string()))?;

    let mut ar = tar::Builder::new(Vec::new());
    let mut header = file_header(manifest_json.len() as u64);
    ar.append_data(&mut header, MANIFEST_ENTRY, manifest_json.as_slice())?;

    for source in &manifest.sources {
        let Some(content) = &source.content else {
            continue;
        };
        let bytes = content.as_bytes();
        let mut header = file_header(bytes.len() as u64);
        ar.append_data(&mut header, content_entry_path(source), bytes)?;
    }

    Ok(ar.into_inner()?)
}

/// Read a bundle back into a manifest, reattaching content to its sources.
/// The manifest becomes dense only when every source regained content.
pub fn unpack_bundle(data: &[u8]) -> Result<Manifest, RemoteError> {
    let mut manifest_json: Option<Vec<u8>> = None;
    let mut content_files: Vec<(String, Vec<u8>)> = Vec::new();

    let mut ar = tar::Archive::new(data);
    for entry in ar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        if path == MANIFEST_ENTRY {
            manifest_json = Some(bytes);
        } else if path.starts_with(CONTENT_DIR) {
            content_files.push((path, bytes));
        } else {
            tracing::debug!("ignoring unexpected bundle entry '{path}'");
        }
    }

    let manifest_json = manifest_json.ok_or(RemoteError::MissingManifest)?;
    let json = String::from_utf8_lossy(&manifest_json);
    let mut manifest =
        parse_manifest_str(&json).map_err(|e| RemoteError::Serialization(e.to_string()))?;

    for source in &mut manifest.sources {
        let expected = content_entry_path(source);
        if let Some((_, bytes)) = content_files.iter().find(|(path, _)| *path == expected) {
            source.content = Some(String::from_utf8_lossy(bytes).into_owned());
        }
    }
    if !manifest.sources.is_empty() && manifest.sources.iter().all(|s| s.content.is_some()) {
        manifest.meta.state = ManifestState::Dense;
    }
    Ok(manifest)
}
