use super::{
    base_dir_of, core_error_message, load_manifest, print_report, report_has_failures, spin_fail,
    spin_ok, spinner, write_manifest, FetchFlags, EXIT_FAILURE, EXIT_SUCCESS,
};
use codepax_remote::pack_bundle;
use std::path::Path;

pub fn run(
    manifest_path: &Path,
    out: Option<&Path>,
    bundle: Option<&Path>,
    flags: &FetchFlags,
    json: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let tables = flags.tables()?;
    let engine = flags.engine();
    let base_dir = base_dir_of(manifest_path);

    let pb = (!json).then(|| spinner(&format!("hydrating {} sources", manifest.sources.len())));
    let result = engine.hydrate(&manifest, &base_dir, &tables, flags.mode());
    let (dense, report) = match result {
        Ok(ok) => ok,
        Err(err) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "hydration failed");
            }
            return Err(core_error_message(&err));
        }
    };
    if let Some(pb) = &pb {
        spin_ok(pb, "hydrated");
    }

    let out_path = out.unwrap_or(manifest_path);
    write_manifest(&dense, out_path)?;

    if let Some(bundle_path) = bundle {
        let data = pack_bundle(&dense).map_err(|e| format!("remote error: {e}"))?;
        std::fs::write(bundle_path, data)
            .map_err(|e| format!("failed to write {}: {e}", bundle_path.display()))?;
        if !json {
            println!("bundle written to {}", bundle_path.display());
        }
    }

    print_report(&report, json)?;
    if report_has_failures(&report) {
        Ok(EXIT_FAILURE)
    } else {
        Ok(EXIT_SUCCESS)
    }
}
