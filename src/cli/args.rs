//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Parser)]
#[command(
    name = "codegraph",
    version,
    about = "Index a repository into a code knowledge graph"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index a repository and emit the resulting graph
    Index(IndexArgs),
}

#[derive(Args)]
pub struct IndexArgs {
    /// Repository root to index
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Configuration file (defaults to codegraph.toml discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the graph as JSON to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Repo-relative path prefixes to exclude
    #[arg(long = "exclude")]
    pub exclude_paths: Vec<String>,

    /// Paths that override --exclude
    #[arg(long = "unignore")]
    pub unignore_paths: Vec<String>,

    /// Re-parse everything, ignoring caches and Git deltas
    #[arg(long)]
    pub force: bool,

    /// Parse worker count (0 = number of cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Abort on the first file parse error
    #[arg(long)]
    pub strict: bool,

    /// Emit placeholder Function nodes for unresolved calls
    #[arg(long)]
    pub placeholders: bool,

    /// Show a progress spinner on stderr
    #[arg(long)]
    pub progress: bool,
}

impl IndexArgs {
    /// Layer CLI overrides onto the loaded settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        settings
            .indexing
            .exclude_paths
            .extend(self.exclude_paths.iter().cloned());
        settings
            .indexing
            .unignore_paths
            .extend(self.unignore_paths.iter().cloned());
        if self.force {
            settings.incremental.incremental_cache_enabled = false;
            settings.incremental.git_delta_enabled = false;
        }
        if let Some(workers) = self.workers {
            settings.indexing.batch_workers = workers;
        }
        if self.strict {
            settings.indexing.parse_strict_enabled = true;
        }
        if self.placeholders {
            settings.indexing.placeholder_nodes_enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_disables_caches() {
        let args = IndexArgs {
            path: PathBuf::from("."),
            config: None,
            output: None,
            exclude_paths: vec!["gen".into()],
            unignore_paths: vec![],
            force: true,
            workers: Some(2),
            strict: true,
            placeholders: false,
            progress: false,
        };
        let mut settings = Settings::default();
        args.apply_to(&mut settings);
        assert!(!settings.incremental.incremental_cache_enabled);
        assert!(!settings.incremental.git_delta_enabled);
        assert!(settings.indexing.exclude_paths.contains("gen"));
        assert_eq!(settings.indexing.batch_workers, 2);
        assert!(settings.indexing.parse_strict_enabled);
    }
}
