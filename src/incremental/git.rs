//! Git HEAD deltas: compare the repository HEAD against the last
//! indexed HEAD and produce changed / deleted file sets.

use git2::{Delta, Repository};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::IndexResult;

const HEAD_FILE_NAME: &str = "git_head";

/// Outcome of a HEAD comparison.
#[derive(Debug, Default)]
pub struct GitDelta {
    /// Repo-relative paths that were added or modified.
    pub changed: BTreeSet<PathBuf>,
    /// Repo-relative paths that no longer exist.
    pub deleted: BTreeSet<PathBuf>,
}

/// Current HEAD commit id, if the directory is a Git repository.
pub fn current_head(repo_path: &Path) -> Option<String> {
    let repo = Repository::open(repo_path).ok()?;
    let head = repo.head().ok()?.peel_to_commit().ok()?;
    Some(head.id().to_string())
}

/// The HEAD recorded by the previous indexing run.
pub fn last_indexed_head(state_dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(state_dir.join(HEAD_FILE_NAME)).ok()?;
    let trimmed = content.trim().to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Persist the current HEAD after a successful flush.
pub fn store_head(state_dir: &Path, head: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(state_dir)?;
    std::fs::write(state_dir.join(HEAD_FILE_NAME), head)
}

/// Diff two commits and classify the touched paths.
pub fn compute_delta(repo_path: &Path, old_head: &str, new_head: &str) -> IndexResult<GitDelta> {
    let repo = Repository::open(repo_path)?;
    let old_tree = repo
        .find_commit(git2::Oid::from_str(old_head)?)?
        .tree()?;
    let new_tree = repo
        .find_commit(git2::Oid::from_str(new_head)?)?
        .tree()?;

    let diff = repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
    let mut delta = GitDelta::default();
    for entry in diff.deltas() {
        match entry.status() {
            Delta::Added | Delta::Modified | Delta::Copied => {
                if let Some(path) = entry.new_file().path() {
                    delta.changed.insert(path.to_path_buf());
                }
            }
            Delta::Deleted => {
                if let Some(path) = entry.old_file().path() {
                    delta.deleted.insert(path.to_path_buf());
                }
            }
            Delta::Renamed => {
                if let Some(path) = entry.old_file().path() {
                    delta.deleted.insert(path.to_path_buf());
                }
                if let Some(path) = entry.new_file().path() {
                    delta.changed.insert(path.to_path_buf());
                }
            }
            _ => {}
        }
    }

    // Uncommitted work counts as changed too; the hash cache sorts out
    // files that are byte-identical.
    if let Ok(workdir_diff) = repo.diff_tree_to_workdir_with_index(Some(&new_tree), None) {
        for entry in workdir_diff.deltas() {
            match entry.status() {
                Delta::Added | Delta::Modified => {
                    if let Some(path) = entry.new_file().path() {
                        delta.changed.insert(path.to_path_buf());
                    }
                }
                Delta::Deleted => {
                    if let Some(path) = entry.old_file().path() {
                        delta.deleted.insert(path.to_path_buf());
                    }
                }
                _ => {}
            }
        }
    }

    Ok(delta)
}
