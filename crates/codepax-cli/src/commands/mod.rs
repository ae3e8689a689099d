pub mod completions;
pub mod dehydrate;
pub mod fetch;
pub mod hydrate;
pub mod init;
pub mod validate;
pub mod verify;

use codepax_core::{CoreError, Engine, EngineOptions, OperationReport, SourceOutcome, Tables};
use codepax_fetch::DiskCache;
use codepax_resolve::{FunctionTable, ResolverTable};
use codepax_schema::{parse_manifest_file, Manifest, Mode};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_FETCH_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Fetch-related flags shared by `hydrate` and `verify`.
#[derive(Debug, Clone, Default)]
pub struct FetchFlags {
    pub relaxed: bool,
    pub resolvers: Option<PathBuf>,
    pub functions: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl FetchFlags {
    pub fn mode(&self) -> Mode {
        if self.relaxed {
            Mode::Relaxed
        } else {
            Mode::Strict
        }
    }

    pub fn tables(&self) -> Result<Tables, String> {
        let mut tables = Tables::new();
        if let Some(path) = &self.resolvers {
            tables.resolvers = ResolverTable::load(path).map_err(|e| e.to_string())?;
        }
        if let Some(path) = &self.functions {
            tables.functions = FunctionTable::load(path).map_err(|e| e.to_string())?;
        }
        Ok(tables)
    }

    pub fn engine(&self) -> Engine {
        let mut options = EngineOptions {
            timeout: self.timeout_secs.map(Duration::from_secs),
            concurrency: self.jobs.unwrap_or(0),
            ..EngineOptions::default()
        };
        if let Some(dir) = &self.cache {
            options.cache = Some(Arc::new(DiskCache::new(dir)));
        }
        Engine::new(options)
    }
}

pub fn load_manifest(path: &Path) -> Result<Manifest, String> {
    parse_manifest_file(path).map_err(|e| format!("manifest error: {e}"))
}

pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<(), String> {
    codepax_schema::write_manifest_file(manifest, path)
        .map_err(|e| format!("failed to write {}: {e}", path.display()))
}

/// Directory against which a manifest's relative locations resolve.
pub fn base_dir_of(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Route an engine error to the exit-code prefix `main` matches on.
pub fn core_error_message(err: &CoreError) -> String {
    match err {
        CoreError::Manifest(_) => format!("manifest error: {err}"),
        CoreError::Fetch { .. } | CoreError::Resolve { .. } => format!("fetch error: {err}"),
        _ => err.to_string(),
    }
}

pub fn print_report(report: &OperationReport, json: bool) -> Result<(), String> {
    if json {
        println!("{}", json_pretty(report)?);
    } else {
        for source in &report.sources {
            match &source.outcome {
                SourceOutcome::Clean => println!("  ok    {}", source.id),
                SourceOutcome::Drifted => println!("  DRIFT {}", source.id),
                SourceOutcome::Failed(reason) => println!("  FAIL  {}: {reason}", source.id),
            }
        }
    }
    Ok(())
}

pub fn report_has_failures(report: &OperationReport) -> bool {
    report
        .sources
        .iter()
        .any(|s| matches!(s.outcome, SourceOutcome::Failed(_)))
}
