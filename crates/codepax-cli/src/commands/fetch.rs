use super::{json_pretty, EXIT_SUCCESS};
use codepax_remote::{fetch_artifact, unpack_bundle, ArtifactKind, Remotes};
use codepax_schema::parse_manifest_str;
use std::path::{Path, PathBuf};

pub fn run(
    name: &str,
    remote: &str,
    remotes_path: Option<&Path>,
    bundle: bool,
    out: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let remotes = match remotes_path {
        Some(path) => Remotes::load(path),
        None => Remotes::load_default(),
    }
    .map_err(|e| format!("remote error: {e}"))?;

    let kind = if bundle {
        ArtifactKind::Bundle
    } else {
        ArtifactKind::Lean
    };
    let data = fetch_artifact(&remotes, remote, name, kind)
        .map_err(|e| format!("remote error: {e}"))?;

    let manifest = if bundle {
        unpack_bundle(&data).map_err(|e| format!("remote error: {e}"))?
    } else {
        parse_manifest_str(&String::from_utf8_lossy(&data))
            .map_err(|e| format!("manifest error: {e}"))?
    };

    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{name}.codex.json")));
    super::write_manifest(&manifest, &out_path)?;

    if json {
        let payload = serde_json::json!({
            "path": out_path.display().to_string(),
            "uuid": manifest.uuid,
            "sources": manifest.sources.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "fetched '{name}' from '{remote}' -> {} ({} sources)",
            out_path.display(),
            manifest.sources.len()
        );
    }
    Ok(EXIT_SUCCESS)
}
