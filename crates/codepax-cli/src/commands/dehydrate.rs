use super::{json_pretty, load_manifest, write_manifest, EXIT_SUCCESS};
use codepax_core::{Engine, EngineOptions};
use std::path::Path;

pub fn run(manifest_path: &Path, out: Option<&Path>, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let stripped = manifest.sources.iter().filter(|s| s.content.is_some()).count();

    let engine = Engine::new(EngineOptions::default());
    let lite = engine.dehydrate(&manifest);

    let out_path = out.unwrap_or(manifest_path);
    write_manifest(&lite, out_path)?;

    if json {
        let payload = serde_json::json!({
            "path": out_path.display().to_string(),
            "sources_stripped": stripped,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "dehydrated {} sources -> {}",
            stripped,
            out_path.display()
        );
    }
    Ok(EXIT_SUCCESS)
}
