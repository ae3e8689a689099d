use super::{
    base_dir_of, core_error_message, load_manifest, print_report, write_manifest, FetchFlags,
    EXIT_FAILURE, EXIT_SUCCESS,
};
use codepax_core::SourceOutcome;
use std::path::Path;

pub fn run(
    manifest_path: &Path,
    out: Option<&Path>,
    flags: &FetchFlags,
    json: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let tables = flags.tables()?;
    let engine = flags.engine();
    let base_dir = base_dir_of(manifest_path);

    let (checked, report) = engine
        .verify(&manifest, &base_dir, &tables, flags.mode())
        .map_err(|e| core_error_message(&e))?;

    // History updates are only persisted on request.
    if let Some(out_path) = out {
        write_manifest(&checked, out_path)?;
    }

    print_report(&report, json)?;
    let all_clean = report
        .sources
        .iter()
        .all(|s| s.outcome == SourceOutcome::Clean);
    if all_clean {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
