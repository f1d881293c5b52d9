//! Pipeline orchestrator: staged execution of the full indexing run.
//!
//! ```text
//! PROJECT INIT -> STRUCTURE -> PARSE -> RESOLVE -> CALLS -> FLUSH
//! ```
//!
//! Stages run strictly in order; a stage completes before the next
//! begins. The parse stage may fan out to workers, whose results are
//! merged in file-path order by a single joiner. Cancellation is
//! checked at stage boundaries and between files; in-flight work
//! drains, and whatever reached a stage boundary is flushed.

pub mod memory;
pub mod workers;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::calls::{CallOptions, CallProcessor};
use crate::config::Settings;
use crate::definitions::{self, DefinitionContext, ParsedSource};
use crate::error::{IndexError, IndexResult};
use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind, WriteQuery};
use crate::imports;
use crate::incremental::cache::{self, IncrementalCache, ParseDecision};
use crate::incremental::git;
use crate::manifest;
use crate::parsing::{Language, fqn};
use crate::paths::{content_hash, is_dependency_manifest, should_skip_path, to_posix};
use crate::props;
use crate::state::IndexState;
use crate::structure::StructureProcessor;
use memory::MemoryWatchdog;
use workers::{ParseJob, ParseOutcome, parse_batch};

/// Structured progress callback: `(stage name, payload)`.
pub type ProgressFn = dyn Fn(&str, serde_json::Value) + Send + Sync;

/// Statistics for one indexing run.
#[derive(Debug, Default)]
pub struct IndexStats {
    pub files_seen: usize,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub edge_only_updates: usize,
    pub files_failed: usize,
    pub files_deleted: usize,
    pub definitions_registered: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

pub struct GraphPipeline<'a> {
    settings: &'a Settings,
    repo_path: PathBuf,
    project_name: String,
    cancel: Arc<AtomicBool>,
    progress: Option<Box<ProgressFn>>,
}

impl<'a> GraphPipeline<'a> {
    pub fn new(settings: &'a Settings, repo_path: impl Into<PathBuf>) -> IndexResult<Self> {
        let repo_path: PathBuf = repo_path.into();
        if !repo_path.is_dir() {
            return Err(IndexError::InvalidRepoRoot { path: repo_path });
        }
        let repo_path = repo_path.canonicalize().unwrap_or(repo_path);
        let project_name = repo_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_string();
        Ok(Self {
            settings,
            repo_path,
            project_name,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Box<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag that callers (signal handlers, UIs) may set to stop the run
    /// at the next checkpoint.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn report(&self, stage: &str, payload: serde_json::Value) {
        tracing::info!(target: "pipeline", "Stage: {stage}");
        if let Some(progress) = &self.progress {
            progress(stage, payload);
        }
    }

    /// Run the whole pipeline against the given ingestor.
    ///
    /// `flush_all` is called exactly once, also when the run is
    /// cancelled at a stage boundary.
    pub fn run(&self, ingestor: &mut dyn Ingestor) -> IndexResult<IndexStats> {
        let start = Instant::now();
        let mut stats = IndexStats::default();
        let mut state = IndexState::new();
        let strict = self.settings.indexing.parse_strict_enabled;

        // Stage 1: project init.
        self.report("project_init", serde_json::json!({"project": self.project_name}));
        let mut project_props = props! {"name" => self.project_name.clone()};
        if self.settings.indexing.framework_metadata_enabled {
            if let Some(framework) = manifest::detect_framework(&self.repo_path) {
                project_props.insert("framework", framework.into());
            }
        }
        ingestor.ensure_node_batch(NodeLabel::Project, project_props);

        // Stage 2: structure.
        let mut structure = StructureProcessor::new(
            &self.repo_path,
            &self.project_name,
            Some(&self.settings.indexing.exclude_paths),
            Some(&self.settings.indexing.unignore_paths),
        );
        if !self.is_cancelled() {
            self.report("structure", serde_json::json!({}));
            structure.identify_structure(ingestor);
        }

        // Stage 3: parse (git delta + incremental cache pick the file set).
        let state_dir = cache::state_dir(&self.repo_path);
        let mut incremental = self
            .settings
            .incremental
            .incremental_cache_enabled
            .then(|| {
                IncrementalCache::load(
                    state_dir.join(cache::CACHE_FILE_NAME),
                    self.settings.incremental.parse_cache_ttl,
                )
            });

        let mut target_paths: Option<BTreeSet<PathBuf>> = None;
        let mut current_head = None;
        if self.settings.incremental.git_delta_enabled {
            current_head = git::current_head(&self.repo_path);
            let last_head = git::last_indexed_head(&state_dir);
            match (&current_head, last_head) {
                (Some(head), Some(last)) if *head == last => {
                    tracing::info!("Git delta: no changes since {last}");
                    target_paths = Some(BTreeSet::new());
                }
                (Some(head), Some(last)) => match git::compute_delta(&self.repo_path, &last, head)
                {
                    Ok(delta) => {
                        tracing::info!(
                            "Git delta: {} changed, {} deleted",
                            delta.changed.len(),
                            delta.deleted.len()
                        );
                        for relative in &delta.deleted {
                            self.purge_deleted_file(
                                relative,
                                &mut state,
                                incremental.as_mut(),
                                ingestor,
                            );
                            stats.files_deleted += 1;
                        }
                        target_paths = Some(delta.changed);
                    }
                    Err(e) => {
                        tracing::warn!("Git delta failed ({e}); falling back to full walk");
                    }
                },
                (Some(_), None) => {
                    tracing::info!("Git delta: no previous revision, full parse");
                }
                (None, _) => {
                    tracing::debug!("Not a git repository; delta disabled for this run");
                }
            }
        }

        if !self.is_cancelled() {
            self.report("parse", serde_json::json!({}));
            self.parse_stage(
                &mut state,
                &mut structure,
                &mut stats,
                incremental.as_mut(),
                target_paths.as_ref(),
                strict,
                ingestor,
            )?;
        }

        // Stage 4: linking passes over accumulated state.
        if !self.is_cancelled() {
            self.report("resolve", serde_json::json!({}));
            imports::link_imports(&state, ingestor);
            crate::definitions::classes::resolve_type_relations(&mut state, ingestor);
            crate::definitions::classes::process_method_overrides(&state, ingestor);
        }

        // Stage 5: call pass, read-only over the AST cache.
        if !self.is_cancelled() {
            self.report("calls", serde_json::json!({}));
            let processor = CallProcessor::new(
                &self.project_name,
                CallOptions {
                    heuristic_calls_enabled: self.settings.indexing.heuristic_calls_enabled,
                    placeholder_nodes_enabled: self.settings.indexing.placeholder_nodes_enabled,
                },
            );
            for path in state.ast_cache.paths() {
                if self.is_cancelled() {
                    break;
                }
                let relative = path.strip_prefix(&self.repo_path).unwrap_or(&path).to_path_buf();
                processor.process_calls_in_file(&path, &relative, &state, ingestor);
            }
        }

        // Stage 6: single flush, then persist the incremental state.
        self.report("flush", serde_json::json!({}));
        ingestor.flush_all()?;
        if let Some(incremental) = &incremental {
            if let Err(e) = incremental.save() {
                tracing::warn!("Failed to persist incremental cache: {e}");
            }
        }
        if self.settings.incremental.git_delta_enabled {
            if let Some(head) = current_head {
                if let Err(e) = git::store_head(&state_dir, &head) {
                    tracing::warn!("Failed to persist git HEAD: {e}");
                }
            }
        }

        stats.cancelled = self.is_cancelled();
        stats.definitions_registered = state.registry.len();
        stats.elapsed = start.elapsed();
        self.report(
            "completed",
            serde_json::json!({
                "files_parsed": stats.files_parsed,
                "files_skipped": stats.files_skipped,
                "cancelled": stats.cancelled,
            }),
        );
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_stage(
        &self,
        state: &mut IndexState,
        structure: &mut StructureProcessor,
        stats: &mut IndexStats,
        mut incremental: Option<&mut IncrementalCache>,
        target_paths: Option<&BTreeSet<PathBuf>>,
        strict: bool,
        ingestor: &mut dyn Ingestor,
    ) -> IndexResult<()> {
        let files = self.discover_files();
        let mut jobs: Vec<ParseJob> = Vec::new();

        for path in files {
            if self.is_cancelled() {
                break;
            }
            stats.files_seen += 1;
            structure.process_file(&path, ingestor);

            let relative = path.strip_prefix(&self.repo_path).unwrap_or(&path).to_path_buf();
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if is_dependency_manifest(file_name) {
                self.ingest_dependencies(&path, ingestor);
            }

            let Some(language) = Language::from_path(&path) else {
                continue;
            };
            if let Some(targets) = target_paths {
                if !targets.contains(&relative) {
                    continue;
                }
            }

            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("Failed to read {}: {e}", path.display());
                    stats.files_failed += 1;
                    if strict {
                        return Err(IndexError::file_read(path, e));
                    }
                    continue;
                }
            };
            let hash = content_hash(&bytes);
            let relative_str = to_posix(&relative);
            if let Some(cache) = incremental.as_deref() {
                if !cache.needs_parsing(&relative_str, &hash) {
                    tracing::debug!("Skipping unchanged file: {relative_str}");
                    stats.files_skipped += 1;
                    continue;
                }
            }

            jobs.push(ParseJob {
                path,
                relative,
                language,
                source: String::from_utf8_lossy(&bytes).into_owned(),
                content_hash: hash,
            });
        }

        let worker_count = if self.settings.indexing.batch_parse_enabled {
            self.settings.workers()
        } else {
            1
        };
        let outcomes = parse_batch(jobs, worker_count);

        // Single joiner: merge worker output in path order, mutating the
        // registry from one thread only.
        let ctx = DefinitionContext {
            repo_path: &self.repo_path,
            project_name: &self.project_name,
        };
        let mut watchdog = MemoryWatchdog::new(
            self.settings.performance.perf_memory,
            self.settings.performance.perf_interval,
            self.settings.incremental.ast_cache_ttl,
        );
        for outcome in outcomes {
            if self.is_cancelled() {
                break;
            }
            let parsed = match outcome {
                ParseOutcome::Parsed(parsed) => parsed,
                ParseOutcome::Failed { path, reason } => {
                    tracing::error!("Failed to parse {}: {reason}", path.display());
                    stats.files_failed += 1;
                    if strict {
                        return Err(IndexError::ParseFailure {
                            language: Language::from_path(&path)
                                .map(|l| l.name().to_string())
                                .unwrap_or_default(),
                            path,
                            reason,
                        });
                    }
                    continue;
                }
            };

            let relative_str = to_posix(&parsed.relative);
            let module_qn =
                fqn::module_qualified_name(&self.project_name, &parsed.relative, parsed.language);

            let decision = match incremental.as_deref() {
                Some(cache) if self.settings.incremental.selective_update_enabled => cache.decide(
                    &relative_str,
                    &parsed.content_hash,
                    Some(&parsed.structure_signature),
                    self.settings.incremental.edge_only_update_enabled,
                ),
                _ => ParseDecision::Full,
            };
            match decision {
                ParseDecision::Skip => {
                    stats.files_skipped += 1;
                    continue;
                }
                ParseDecision::EdgeOnly => {
                    state.imports.remove(&module_qn);
                    if ingestor
                        .execute_write(WriteQuery::DeleteDynamicEdgesByPath(relative_str.clone()))
                    {
                        stats.edge_only_updates += 1;
                    } else {
                        // Sink cannot delete selectively: degrade to full.
                        state.purge_file(&parsed.path, &module_qn);
                        ingestor
                            .execute_write(WriteQuery::DeleteModuleByPath(relative_str.clone()));
                        structure.process_file(&parsed.path, ingestor);
                    }
                }
                ParseDecision::Full => {
                    state.purge_file(&parsed.path, &module_qn);
                    ingestor.execute_write(WriteQuery::DeleteModuleByPath(relative_str.clone()));
                    // The module delete takes the File node with it;
                    // the file still exists, so put it back.
                    structure.process_file(&parsed.path, ingestor);
                }
            }

            let workers::ParsedFile {
                path,
                language,
                source,
                content_hash,
                tree,
                structure_signature,
                ..
            } = *parsed;
            let pre_parsed = ParsedSource {
                tree,
                source,
                structure_signature: Some(structure_signature),
            };
            match definitions::process_file(
                &path,
                language,
                &ctx,
                structure,
                state,
                ingestor,
                Some(pre_parsed),
            ) {
                Ok(signature) => {
                    stats.files_parsed += 1;
                    if let Some(cache) = incremental.as_deref_mut() {
                        cache.record(&relative_str, content_hash, Some(signature), language.key());
                    }
                }
                Err(e) => {
                    tracing::error!("File processing failed: {e}");
                    stats.files_failed += 1;
                    if strict {
                        return Err(e);
                    }
                }
            }
            watchdog.checkpoint(&mut state.ast_cache);
        }
        Ok(())
    }

    /// Sorted, filtered list of every file in the repository.
    fn discover_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(&self.repo_path)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .follow_links(false)
            .build()
            .flatten()
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| {
                !should_skip_path(
                    path,
                    &self.repo_path,
                    Some(&self.settings.indexing.exclude_paths),
                    Some(&self.settings.indexing.unignore_paths),
                )
            })
            .collect();
        files.sort();
        files
    }

    fn ingest_dependencies(&self, manifest_path: &Path, ingestor: &mut dyn Ingestor) {
        tracing::info!("Parsing dependency manifest: {}", manifest_path.display());
        for dep in manifest::parse_dependencies(manifest_path) {
            if dep.name.is_empty() {
                continue;
            }
            tracing::info!("Found dependency: {} ({})", dep.name, dep.spec);
            ingestor.ensure_node_batch(
                NodeLabel::ExternalPackage,
                props! {"name" => dep.name.clone(), "version_spec" => dep.spec.clone()},
            );
            let mut rel_props = crate::graph::Properties::new();
            if !dep.spec.is_empty() {
                rel_props.insert("version_spec", dep.spec.into());
            }
            if let Some(group) = dep.group {
                rel_props.insert("group", group.into());
            }
            ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Project, self.project_name.clone()),
                RelKind::DependsOnExternal,
                NodeRef::primary(NodeLabel::ExternalPackage, dep.name),
                Some(rel_props),
            );
        }
    }

    /// A deleted file loses its graph rows, registry subtree, import
    /// map, AST cache entry, and incremental record.
    fn purge_deleted_file(
        &self,
        relative: &Path,
        state: &mut IndexState,
        incremental: Option<&mut IncrementalCache>,
        ingestor: &mut dyn Ingestor,
    ) {
        let language = Language::from_path(relative).unwrap_or(Language::Python);
        let module_qn = fqn::module_qualified_name(&self.project_name, relative, language);
        let absolute = self.repo_path.join(relative);
        state.purge_file(&absolute, &module_qn);
        ingestor.execute_write(WriteQuery::DeleteModuleByPath(to_posix(relative)));
        if let Some(cache) = incremental {
            cache.invalidate(&to_posix(relative));
        }
        tracing::info!("Purged deleted file: {}", relative.display());
    }
}
