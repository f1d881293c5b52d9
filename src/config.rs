//! Layered configuration for the indexing engine.
//!
//! Sources are merged in order:
//! - built-in defaults
//! - `codegraph.toml` in the current directory or an ancestor
//! - environment variables prefixed with `CODEGRAPH_`
//!
//! Environment variables use double underscores to separate nested levels:
//! `CODEGRAPH_INDEXING__BATCH_WORKERS=8` sets `indexing.batch_workers`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "codegraph.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Indexing behavior
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Incremental update behavior
    #[serde(default)]
    pub incremental: IncrementalConfig,

    /// Memory watchdog settings
    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Logging defaults (overridden by RUST_LOG)
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Dotted prefixes of repo-relative paths to skip entirely
    #[serde(default)]
    pub exclude_paths: BTreeSet<String>,

    /// Paths that override `exclude_paths`
    #[serde(default)]
    pub unignore_paths: BTreeSet<String>,

    /// Enable the parse worker pool
    #[serde(default = "default_true")]
    pub batch_parse_enabled: bool,

    /// Worker count for the parse pool (0 = number of cores)
    #[serde(default)]
    pub batch_workers: usize,

    /// Abort the run on the first file parse failure
    #[serde(default = "default_false")]
    pub parse_strict_enabled: bool,

    /// Allow the snippet heuristic for dynamic calls
    #[serde(default = "default_true")]
    pub heuristic_calls_enabled: bool,

    /// Emit placeholder Function nodes for unresolved calls
    #[serde(default = "default_false")]
    pub placeholder_nodes_enabled: bool,

    /// Attach light framework metadata to Project/Module nodes
    #[serde(default = "default_false")]
    pub framework_metadata_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IncrementalConfig {
    /// When false, every run is a full re-parse
    #[serde(default = "default_true")]
    pub incremental_cache_enabled: bool,

    /// When false, ignore Git HEAD deltas
    #[serde(default = "default_true")]
    pub git_delta_enabled: bool,

    /// Enable structural-signature decisions
    #[serde(default = "default_true")]
    pub selective_update_enabled: bool,

    /// Allow the edge-only fast path when the signature is unchanged
    #[serde(default = "default_true")]
    pub edge_only_update_enabled: bool,

    /// Max age in seconds for incremental cache records; stale records
    /// are purged eagerly at load time
    #[serde(default = "default_parse_cache_ttl")]
    pub parse_cache_ttl: u64,

    /// Max age in seconds for AST cache entries
    #[serde(default = "default_ast_cache_ttl")]
    pub ast_cache_ttl: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    /// Process RSS threshold in MB before the AST cache is trimmed
    #[serde(default = "default_perf_memory")]
    pub perf_memory: u64,

    /// Check the threshold every N processed files
    #[serde(default = "default_perf_interval")]
    pub perf_interval: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level filter, e.g. "warn" or "codegraph=debug"
    #[serde(default = "default_log_level")]
    pub default: String,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_parse_cache_ttl() -> u64 {
    7 * 24 * 3600
}
fn default_ast_cache_ttl() -> u64 {
    3600
}
fn default_perf_memory() -> u64 {
    4096
}
fn default_perf_interval() -> usize {
    200
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude_paths: BTreeSet::new(),
            unignore_paths: BTreeSet::new(),
            batch_parse_enabled: true,
            batch_workers: 0,
            parse_strict_enabled: false,
            heuristic_calls_enabled: true,
            placeholder_nodes_enabled: false,
            framework_metadata_enabled: false,
        }
    }
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            incremental_cache_enabled: true,
            git_delta_enabled: true,
            selective_update_enabled: true,
            edge_only_update_enabled: true,
            parse_cache_ttl: default_parse_cache_ttl(),
            ast_cache_ttl: default_ast_cache_ttl(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            perf_memory: default_perf_memory(),
            perf_interval: default_perf_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path =
            Self::find_config_file().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("CODEGRAPH_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    /// Load configuration from a specific file plus the environment.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CODEGRAPH_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    /// Effective parse worker count.
    pub fn workers(&self) -> usize {
        if self.indexing.batch_workers == 0 {
            num_cpus::get()
        } else {
            self.indexing.batch_workers
        }
    }

    fn find_config_file() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let candidate = ancestor.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert!(settings.incremental.incremental_cache_enabled);
        assert!(settings.incremental.edge_only_update_enabled);
        assert!(!settings.indexing.parse_strict_enabled);
        assert!(settings.workers() >= 1);
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[indexing]\nbatch_workers = 3\nparse_strict_enabled = true\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.indexing.batch_workers, 3);
        assert!(settings.indexing.parse_strict_enabled);
        assert!(settings.incremental.git_delta_enabled);
    }
}
