//! The manifest engine: hydrate, verify, and dehydrate.
//!
//! Operations take a manifest by reference and return a new one; on a strict
//! failure the caller's manifest is untouched. Fetching runs under a bounded
//! worker pool, then observations are applied sequentially in source order so
//! the resulting document is deterministic.

use crate::concurrency::parallel_map;
use crate::hydrator;
use crate::CoreError;
use codepax_fetch::{ContentFetcher, FetchCache, FetchOptions, FunctionInvoker};
use codepax_resolve::{FunctionTable, ResolverTable};
use codepax_schema::{Manifest, ManifestState, Mode, Source};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Worker threads used for the fetch phase when the caller does not choose.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Resolver and function tables active for one operation. Manifests may carry
/// their own copies in `extensions`; these caller-supplied tables win on
/// conflicting names.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub resolvers: ResolverTable,
    pub functions: FunctionTable,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Clone, Default)]
pub struct EngineOptions {
    /// Per-fetch HTTP timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Fetch-phase worker count. Zero means [`DEFAULT_CONCURRENCY`].
    pub concurrency: usize,
    pub cache: Option<Arc<dyn FetchCache>>,
    pub invoker: Option<Arc<dyn FunctionInvoker>>,
}

/// Per-source result of one hydrate or verify run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOutcome {
    Clean,
    Drifted,
    /// The source could not be checked at all; relaxed mode only.
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub id: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationReport {
    pub sources: Vec<SourceReport>,
}

impl OperationReport {
    pub fn is_clean(&self) -> bool {
        self.sources
            .iter()
            .all(|s| s.outcome == SourceOutcome::Clean)
    }

    fn push(&mut self, source: &Source, outcome: SourceOutcome) {
        self.sources.push(SourceReport {
            id: source.id.to_string(),
            outcome,
        });
    }
}

pub struct Engine {
    fetcher: ContentFetcher,
    concurrency: usize,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let mut fetcher = ContentFetcher::new(FetchOptions {
            timeout: options.timeout,
        });
        if let Some(cache) = options.cache {
            fetcher = fetcher.with_cache(cache);
        }
        if let Some(invoker) = options.invoker {
            fetcher = fetcher.with_invoker(invoker);
        }
        let concurrency = if options.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            options.concurrency
        };
        Self {
            fetcher,
            concurrency,
        }
    }

    fn merged_tables(manifest: &Manifest, tables: &Tables) -> Tables {
        Tables {
            resolvers: ResolverTable::from_extensions(&manifest.extensions)
                .merged(&tables.resolvers),
            functions: FunctionTable::from_extensions(&manifest.extensions)
                .merged(&tables.functions),
        }
    }

    /// Fetch bytes for every source that carries no inline content. Sources
    /// with content are skipped here and checked in place later.
    fn fetch_phase(
        &self,
        manifest: &Manifest,
        base_dir: &Path,
        tables: &Tables,
    ) -> Vec<Option<Result<Vec<u8>, CoreError>>> {
        parallel_map(&manifest.sources, self.concurrency, |_, source| {
            if source.content.is_some() {
                return None;
            }
            Some(hydrator::fetch_source_bytes(
                source,
                base_dir,
                &tables.resolvers,
                &tables.functions,
                &self.fetcher,
            ))
        })
    }

    /// Fetch, verify, and inline content for every source, producing a dense
    /// manifest. Sources that already carry content are checked in place and
    /// never re-fetched. Declared `hash`/`size_bytes` are never rewritten.
    pub fn hydrate(
        &self,
        manifest: &Manifest,
        base_dir: &Path,
        tables: &Tables,
        mode: Mode,
    ) -> Result<(Manifest, OperationReport), CoreError> {
        let tables = Self::merged_tables(manifest, tables);
        let fetched = self.fetch_phase(manifest, base_dir, &tables);

        let mut out = manifest.clone();
        let mut report = OperationReport::default();

        for (source, fetched) in out.sources.iter_mut().zip(fetched) {
            let bytes = match fetched {
                None => match source.content_bytes() {
                    Some(bytes) => bytes.to_vec(),
                    None => continue,
                },
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => {
                    if mode == Mode::Strict {
                        return Err(err);
                    }
                    tracing::warn!("source '{}' failed: {err}", source.id);
                    report.push(source, SourceOutcome::Failed(err.to_string()));
                    continue;
                }
            };

            let observation = hydrator::observe(source, &bytes);
            if mode == Mode::Strict {
                if let Some(err) = hydrator::strict_failure(source, &observation) {
                    return Err(err);
                }
            }
            hydrator::record_observation(source, &observation);
            if source.content.is_none() {
                source.content = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            let outcome = if observation.is_clean() {
                SourceOutcome::Clean
            } else {
                SourceOutcome::Drifted
            };
            report.push(source, outcome);
        }

        if out.sources.iter().all(|s| s.content.is_some()) {
            out.meta.state = ManifestState::Dense;
        }
        Ok((out, report))
    }

    /// Check every source against its declared digest without touching
    /// content or state. Inline content is checked as stored; reference-only
    /// sources are fetched for the check and the bytes discarded.
    pub fn verify(
        &self,
        manifest: &Manifest,
        base_dir: &Path,
        tables: &Tables,
        mode: Mode,
    ) -> Result<(Manifest, OperationReport), CoreError> {
        let tables = Self::merged_tables(manifest, tables);
        let fetched = self.fetch_phase(manifest, base_dir, &tables);

        let mut out = manifest.clone();
        let mut report = OperationReport::default();

        for (source, fetched) in out.sources.iter_mut().zip(fetched) {
            let bytes = match fetched {
                None => match source.content_bytes() {
                    Some(bytes) => bytes.to_vec(),
                    None => continue,
                },
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => {
                    if mode == Mode::Strict {
                        return Err(err);
                    }
                    tracing::warn!("source '{}' failed: {err}", source.id);
                    report.push(source, SourceOutcome::Failed(err.to_string()));
                    continue;
                }
            };

            let observation = hydrator::observe(source, &bytes);
            if mode == Mode::Strict {
                if let Some(err) = hydrator::strict_failure(source, &observation) {
                    return Err(err);
                }
            }
            hydrator::record_observation(source, &observation);
            let outcome = if observation.is_clean() {
                SourceOutcome::Clean
            } else {
                SourceOutcome::Drifted
            };
            report.push(source, outcome);
        }

        Ok((out, report))
    }

    /// Strip inline content from every source, refreshing each declared
    /// digest from the content being stripped, and mark the manifest lite.
    pub fn dehydrate(&self, manifest: &Manifest) -> Manifest {
        let mut out = manifest.clone();
        for source in &mut out.sources {
            hydrator::dehydrate_source(source);
        }
        out.meta.state = ManifestState::Lite;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepax_fetch::FetchError;
    use codepax_schema::{
        compute_digest, MetaSection, ModificationStatus, SourceId, SourceLocation,
    };
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;

    fn engine() -> Engine {
        Engine::new(EngineOptions::default())
    }

    fn manifest_with(sources: Vec<Source>) -> Manifest {
        Manifest {
            spec_version: "0.1.0".to_owned(),
            uuid: "3e9a6d2f-0000-4000-8000-000000000001".to_owned(),
            meta: MetaSection {
                name: "fixture".to_owned(),
                author: "Unknown".to_owned(),
                category: "general".to_owned(),
                version: None,
                state: ManifestState::Lite,
                created_by: None,
                created_at: None,
            },
            provenance: None,
            instructions: None,
            sources,
            layers: Vec::new(),
            history: Vec::new(),
            extensions: serde_json::Map::new(),
        }
    }

    fn source(id: &str, uri: SourceLocation, declared: &str) -> Source {
        Source {
            id: SourceId::new(id),
            uri: Some(uri),
            media_type: None,
            encoding: "utf-8".to_owned(),
            hash: compute_digest(declared.as_bytes()),
            size_bytes: declared.len() as u64,
            content: None,
            curation: None,
            expected_digest: None,
            modification_status: None,
            modification_history: Vec::new(),
        }
    }

    fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn hydrate_inlines_content_and_marks_dense() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.txt", "alpha");
        let manifest = manifest_with(vec![source(
            "a",
            SourceLocation::Single("a.txt".to_owned()),
            "alpha",
        )]);

        let (dense, report) = engine()
            .hydrate(&manifest, dir.path(), &Tables::new(), Mode::Strict)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(dense.meta.state, ManifestState::Dense);
        let src = &dense.sources[0];
        assert_eq!(src.content.as_deref(), Some("alpha"));
        assert_eq!(src.modification_status, Some(ModificationStatus::Clean));
        assert_eq!(src.modification_history.len(), 1);
        // Declared digest fields are not rewritten by hydration.
        assert_eq!(src.hash, manifest.sources[0].hash);
        assert_eq!(src.size_bytes, 5);
        // Caller's manifest is untouched.
        assert_eq!(manifest.meta.state, ManifestState::Lite);
    }

    #[test]
    fn hydrate_then_dehydrate_round_trips_digests() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.txt", "alpha");
        let manifest = manifest_with(vec![source(
            "a",
            SourceLocation::Single("a.txt".to_owned()),
            "alpha",
        )]);

        let eng = engine();
        let (dense, _) = eng
            .hydrate(&manifest, dir.path(), &Tables::new(), Mode::Strict)
            .unwrap();
        let lite = eng.dehydrate(&dense);

        assert_eq!(lite.meta.state, ManifestState::Lite);
        assert!(lite.sources[0].content.is_none());
        // Content matched the declared digest, so dehydration refreshes it
        // to the same value.
        assert_eq!(lite.sources[0].hash, manifest.sources[0].hash);
        assert_eq!(lite.sources[0].size_bytes, 5);
    }

    #[test]
    fn multi_location_source_joins_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.txt", "alpha");
        write_fixture(dir.path(), "b.txt", "beta");
        let manifest = manifest_with(vec![source(
            "ab",
            SourceLocation::Multi(vec!["a.txt".to_owned(), "b.txt".to_owned()]),
            "alpha\nbeta",
        )]);

        let (dense, report) = engine()
            .hydrate(&manifest, dir.path(), &Tables::new(), Mode::Strict)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(dense.sources[0].content.as_deref(), Some("alpha\nbeta"));
    }

    #[test]
    fn strict_hydrate_aborts_on_drift() {
        let dir = tempfile::tempdir().unwrap();
        // Same length as the declared content, different bytes.
        write_fixture(dir.path(), "a.txt", "aleph");
        let manifest = manifest_with(vec![source(
            "a",
            SourceLocation::Single("a.txt".to_owned()),
            "alpha",
        )]);

        let err = engine()
            .hydrate(&manifest, dir.path(), &Tables::new(), Mode::Strict)
            .unwrap_err();
        assert!(matches!(err, CoreError::HashMismatch { id, .. } if id == "a"));
    }

    #[test]
    fn relaxed_hydrate_records_drift_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.txt", "aleph");
        write_fixture(dir.path(), "b.txt", "beta");
        let manifest = manifest_with(vec![
            source("a", SourceLocation::Single("a.txt".to_owned()), "alpha"),
            source("b", SourceLocation::Single("b.txt".to_owned()), "beta"),
        ]);

        let (dense, report) = engine()
            .hydrate(&manifest, dir.path(), &Tables::new(), Mode::Relaxed)
            .unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.sources[0].outcome, SourceOutcome::Drifted);
        assert_eq!(report.sources[1].outcome, SourceOutcome::Clean);
        // The drifted source still hydrates; the drift is on record.
        assert_eq!(dense.sources[0].content.as_deref(), Some("aleph"));
        assert_eq!(
            dense.sources[0].modification_status,
            Some(ModificationStatus::Drifted)
        );
        assert_eq!(dense.meta.state, ManifestState::Dense);
    }

    #[test]
    fn relaxed_fetch_failure_leaves_source_lite() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "b.txt", "beta");
        let manifest = manifest_with(vec![
            source("a", SourceLocation::Single("missing.txt".to_owned()), "alpha"),
            source("b", SourceLocation::Single("b.txt".to_owned()), "beta"),
        ]);

        let (out, report) = engine()
            .hydrate(&manifest, dir.path(), &Tables::new(), Mode::Relaxed)
            .unwrap();

        assert!(matches!(
            report.sources[0].outcome,
            SourceOutcome::Failed(_)
        ));
        assert!(out.sources[0].content.is_none());
        assert_eq!(out.sources[1].content.as_deref(), Some("beta"));
        // One source stayed reference-only, so the manifest is not dense.
        assert_eq!(out.meta.state, ManifestState::Lite);
    }

    #[test]
    fn inline_content_is_checked_in_place_not_refetched() {
        let mut src = source("a", SourceLocation::Single("missing.txt".to_owned()), "alpha");
        src.content = Some("alpha".to_owned());
        let manifest = manifest_with(vec![src]);

        // The uri points nowhere, so passing requires skipping the fetch.
        let (out, report) = engine()
            .hydrate(&manifest, Path::new("/nonexistent"), &Tables::new(), Mode::Strict)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(
            out.sources[0].modification_status,
            Some(ModificationStatus::Clean)
        );
    }

    #[test]
    fn verify_leaves_content_and_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.txt", "aleph");
        let manifest = manifest_with(vec![source(
            "a",
            SourceLocation::Single("a.txt".to_owned()),
            "alpha",
        )]);

        let (out, report) = engine()
            .verify(&manifest, dir.path(), &Tables::new(), Mode::Relaxed)
            .unwrap();

        assert_eq!(report.sources[0].outcome, SourceOutcome::Drifted);
        assert!(out.sources[0].content.is_none());
        assert_eq!(out.meta.state, ManifestState::Lite);
        assert_eq!(out.sources[0].modification_history.len(), 1);
    }

    #[test]
    fn strict_verify_aborts_on_drift() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.txt", "aleph");
        let manifest = manifest_with(vec![source(
            "a",
            SourceLocation::Single("a.txt".to_owned()),
            "alpha",
        )]);

        let err = engine()
            .verify(&manifest, dir.path(), &Tables::new(), Mode::Strict)
            .unwrap_err();
        assert!(matches!(err, CoreError::HashMismatch { .. }));
    }

    #[test]
    fn dehydrate_refreshes_digest_from_edited_content() {
        let mut src = source("a", SourceLocation::Single("a.txt".to_owned()), "alpha");
        src.content = Some("edited after hydration".to_owned());
        let manifest = manifest_with(vec![src]);

        let lite = engine().dehydrate(&manifest);
        let out = &lite.sources[0];
        assert!(out.content.is_none());
        assert_eq!(out.hash, compute_digest(b"edited after hydration"));
        assert_eq!(out.size_bytes, 22);
        assert_eq!(
            out.modification_history[0].expected_hash.as_deref(),
            Some(manifest.sources[0].hash.as_str())
        );
    }

    struct EchoInvoker;

    impl FunctionInvoker for EchoInvoker {
        fn invoke(
            &self,
            name: &str,
            _params: &BTreeMap<String, String>,
        ) -> Result<Vec<u8>, FetchError> {
            Ok(format!("computed by {name}").into_bytes())
        }
    }

    #[test]
    fn function_table_from_manifest_extensions_is_honored() {
        let mut src = source(
            "summary",
            SourceLocation::Single("func://summarize".to_owned()),
            "computed by summarize",
        );
        src.expected_digest = Some(compute_digest(b"computed by summarize"));
        let mut manifest = manifest_with(vec![src]);
        manifest.extensions = serde_json::from_str(
            r#"{"functions": {"summarize": {"name": "summarize"}}}"#,
        )
        .unwrap();

        let eng = Engine::new(EngineOptions {
            invoker: Some(Arc::new(EchoInvoker)),
            ..EngineOptions::default()
        });
        let (dense, report) = eng
            .hydrate(&manifest, Path::new("."), &Tables::new(), Mode::Strict)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(
            dense.sources[0].content.as_deref(),
            Some("computed by summarize")
        );
    }

    #[test]
    fn unknown_function_fails_resolution() {
        let manifest = manifest_with(vec![source(
            "summary",
            SourceLocation::Single("func://missing".to_owned()),
            "anything",
        )]);

        let err = engine()
            .hydrate(&manifest, Path::new("."), &Tables::new(), Mode::Strict)
            .unwrap_err();
        assert!(matches!(err, CoreError::Resolve { id, .. } if id == "summary"));
    }
}
