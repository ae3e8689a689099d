use super::{json_pretty, write_manifest, EXIT_SUCCESS};
use codepax_schema::{Manifest, ManifestState, MetaSection, SPEC_VERSION};
use std::path::{Path, PathBuf};

pub fn run(
    name: &str,
    out: Option<&Path>,
    author: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let manifest = Manifest {
        spec_version: SPEC_VERSION.to_owned(),
        uuid: uuid::Uuid::new_v4().to_string(),
        meta: MetaSection {
            name: name.to_owned(),
            author: author.unwrap_or("Unknown").to_owned(),
            category: category.unwrap_or("general").to_owned(),
            version: None,
            state: ManifestState::Lite,
            created_by: Some(format!("codepax {}", env!("CARGO_PKG_VERSION"))),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        },
        provenance: None,
        instructions: None,
        sources: Vec::new(),
        layers: Vec::new(),
        history: Vec::new(),
        extensions: serde_json::Map::new(),
    };

    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{name}.codex.json")));
    write_manifest(&manifest, &path)?;

    if json {
        let payload = serde_json::json!({
            "path": path.display().to_string(),
            "uuid": manifest.uuid,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("created {} ({})", path.display(), manifest.uuid);
    }
    Ok(EXIT_SUCCESS)
}
