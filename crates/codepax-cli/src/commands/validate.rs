use super::{json_pretty, load_manifest, EXIT_MANIFEST_ERROR, EXIT_SUCCESS};
use codepax_schema::{validate_manifest, Severity, Validity};
use std::path::Path;

pub fn run(manifest_path: &Path, relaxed: bool, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let mode = if relaxed {
        codepax_schema::Mode::Relaxed
    } else {
        codepax_schema::Mode::Strict
    };
    let report = validate_manifest(&manifest, mode);
    let outcome = report.outcome();

    if json {
        let violations: Vec<_> = report
            .violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "path": v.path,
                    "severity": format!("{:?}", v.severity).to_lowercase(),
                    "message": v.message,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "outcome": match outcome {
                Validity::Valid => "valid",
                Validity::ValidWithWarnings => "valid-with-warnings",
                Validity::Invalid => "invalid",
            },
            "violations": violations,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for v in &report.violations {
            let tag = match v.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            println!("{tag}: {}: {}", v.path, v.message);
        }
        match outcome {
            Validity::Valid => println!("{}: valid", manifest_path.display()),
            Validity::ValidWithWarnings => {
                println!("{}: valid with warnings", manifest_path.display());
            }
            Validity::Invalid => println!("{}: invalid", manifest_path.display()),
        }
    }

    match outcome {
        Validity::Invalid => Ok(EXIT_MANIFEST_ERROR),
        _ => Ok(EXIT_SUCCESS),
    }
}
