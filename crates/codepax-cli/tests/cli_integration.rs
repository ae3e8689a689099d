//! CLI subprocess integration tests.
//!
//! These tests invoke the `codepax` binary as a subprocess and verify exit
//! codes, stdout content, and JSON output stability.

use codepax_schema::compute_digest;
use std::path::{Path, PathBuf};
use std::process::Command;

fn codepax_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_codepax"))
}

fn write_manifest_with_source(dir: &Path, uri: &str, declared: &str) -> PathBuf {
    let path = dir.join("codex.json");
    let manifest = serde_json::json!({
        "spec_version": "0.1.0",
        "uuid": "3e9a6d2f-0000-4000-8000-0000000000aa",
        "meta": { "name": "fixture", "state": "lite" },
        "sources": [{
            "id": "a",
            "uri": uri,
            "hash": compute_digest(declared.as_bytes()),
            "size_bytes": declared.len(),
            "content": null
        }]
    });
    std::fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
    path
}

#[test]
fn cli_version_exits_zero() {
    let output = codepax_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "codepax --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("codepax"),
        "version output must contain 'codepax': {stdout}"
    );
}

#[test]
fn cli_help_lists_engine_commands() {
    let output = codepax_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "codepax --help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["hydrate", "dehydrate", "verify", "validate", "fetch"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_init_creates_valid_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("new.codex.json");

    let output = codepax_bin()
        .args(["init", "my-codex", "--out", &out.to_string_lossy()])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "init must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["meta"]["name"], "my-codex");
    assert_eq!(json["meta"]["state"], "lite");
    assert!(!json["uuid"].as_str().unwrap().is_empty());

    // The created manifest passes its own validator.
    let output = codepax_bin()
        .args(["validate", &out.to_string_lossy()])
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn cli_validate_rejects_dangling_layer_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codex.json");
    let manifest = serde_json::json!({
        "spec_version": "0.1.0",
        "uuid": "3e9a6d2f-0000-4000-8000-0000000000ab",
        "meta": { "name": "broken", "state": "lite" },
        "sources": [],
        "layers": [{
            "id": "narrator",
            "name": "Narrator",
            "kind": "persona",
            "sources": ["ghost"]
        }]
    });
    std::fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let output = codepax_bin()
        .args(["validate", &path.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "invalid manifest exits 2");
}

#[test]
fn cli_unparseable_manifest_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codex.json");
    std::fs::write(&path, "not json at all").unwrap();

    let output = codepax_bin()
        .args(["hydrate", &path.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_hydrate_inlines_local_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let manifest = write_manifest_with_source(dir.path(), "a.txt", "alpha");
    let out = dir.path().join("dense.codex.json");

    let output = codepax_bin()
        .args([
            "hydrate",
            &manifest.to_string_lossy(),
            "--out",
            &out.to_string_lossy(),
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "hydrate must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["meta"]["state"], "dense");
    assert_eq!(json["sources"][0]["content"], "alpha");
    assert_eq!(json["sources"][0]["modification_status"], "clean");

    // The input stays lite when --out is used.
    let input: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(input["meta"]["state"], "lite");
}

#[test]
fn cli_strict_hydrate_fails_on_drift() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "tampered bytes").unwrap();
    let manifest = write_manifest_with_source(dir.path(), "a.txt", "alpha");

    let output = codepax_bin()
        .args(["hydrate", &manifest.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'a'"), "error must name the source: {stderr}");
}

#[test]
fn cli_relaxed_hydrate_records_drift_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "tampered bytes").unwrap();
    let manifest = write_manifest_with_source(dir.path(), "a.txt", "alpha");

    let output = codepax_bin()
        .args(["--json", "hydrate", &manifest.to_string_lossy(), "--relaxed"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "relaxed drift is recorded, not fatal. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("--json output must be JSON");
    assert_eq!(report["sources"][0]["outcome"], "drifted");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(json["sources"][0]["modification_status"], "drifted");
    assert_eq!(json["sources"][0]["content"], "tampered bytes");
}

#[test]
fn cli_relaxed_hydrate_with_missing_file_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest_with_source(dir.path(), "missing.txt", "alpha");

    let output = codepax_bin()
        .args(["hydrate", &manifest.to_string_lossy(), "--relaxed"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_hydrate_dehydrate_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let manifest = write_manifest_with_source(dir.path(), "a.txt", "alpha");

    let status = codepax_bin()
        .args(["hydrate", &manifest.to_string_lossy()])
        .status()
        .unwrap();
    assert!(status.success());

    let status = codepax_bin()
        .args(["dehydrate", &manifest.to_string_lossy()])
        .status()
        .unwrap();
    assert!(status.success());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(json["meta"]["state"], "lite");
    assert_eq!(json["sources"][0]["content"], serde_json::Value::Null);
    assert_eq!(
        json["sources"][0]["hash"],
        serde_json::Value::String(compute_digest(b"alpha"))
    );
}

#[test]
fn cli_verify_reports_drift_without_touching_content() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "tampered bytes").unwrap();
    let manifest = write_manifest_with_source(dir.path(), "a.txt", "alpha");

    let output = codepax_bin()
        .args(["verify", &manifest.to_string_lossy(), "--relaxed"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "drift exits 1");

    // Without --out the manifest on disk is unchanged.
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(json["sources"][0]["content"], serde_json::Value::Null);
    assert!(json["sources"][0].get("modification_status").is_none());
}

#[test]
fn cli_fetch_unknown_remote_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let remotes = dir.path().join("remotes.json");
    std::fs::write(&remotes, "{}").unwrap();

    let output = codepax_bin()
        .args([
            "fetch",
            "shelley",
            "--remote",
            "nowhere",
            "--remotes",
            &remotes.to_string_lossy(),
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn cli_completions_generate() {
    let output = codepax_bin().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}
