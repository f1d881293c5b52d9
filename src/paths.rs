//! Path filtering and hashing helpers.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;

/// Directory names that are never descended into.
pub const IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".tox",
    ".venv",
    "venv",
    "node_modules",
    "target",
    "build",
    "dist",
    ".gradle",
    ".cache",
    ".codegraph",
];

/// File-name suffixes that are never indexed.
pub const IGNORE_SUFFIXES: &[&str] = &[
    ".pyc", ".pyo", ".so", ".dll", ".dylib", ".o", ".a", ".class", ".jar", ".exe", ".bin",
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".pdf", ".zip", ".tar", ".gz", ".whl",
    ".min.js", ".map", ".lock",
];

const TEST_DIR_NAMES: &[&str] = &["test", "tests", "spec", "specs", "__tests__"];
const TEST_FILE_PREFIXES: &[&str] = &["test_", "spec_"];
const TEST_FILE_SUFFIXES: &[&str] = &["_test", "_spec"];
const TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec."];

/// Forward-slash rendering of a path, used for every graph property.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// SHA-256 of a byte slice, hex-encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Test-path heuristic over a repo-relative path.
pub fn is_test_path(relative_path: &Path) -> bool {
    let parts: Vec<String> = relative_path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .map(|s| s.to_lowercase())
        .collect();
    if parts.is_empty() {
        return false;
    }
    if parts[..parts.len() - 1]
        .iter()
        .any(|part| TEST_DIR_NAMES.contains(&part.as_str()))
    {
        return true;
    }

    let name = &parts[parts.len() - 1];
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    if TEST_FILE_PREFIXES.iter().any(|p| stem.starts_with(p)) {
        return true;
    }
    if TEST_FILE_SUFFIXES.iter().any(|s| stem.ends_with(s)) {
        return true;
    }
    TEST_FILE_MARKERS.iter().any(|m| name.contains(m))
}

/// Whether a path is filtered out of the walk.
///
/// `unignore_paths` overrides `exclude_paths`; both are sets of
/// repo-relative posix paths or path prefixes.
pub fn should_skip_path(
    path: &Path,
    repo_path: &Path,
    exclude_paths: Option<&BTreeSet<String>>,
    unignore_paths: Option<&BTreeSet<String>>,
) -> bool {
    if path.is_file() {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if IGNORE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
                return true;
            }
        }
    }

    let Ok(rel_path) = path.strip_prefix(repo_path) else {
        return true;
    };
    let rel_str = to_posix(rel_path);
    let dir_parts: Vec<&str> = if path.is_file() {
        rel_path
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .collect()
            })
            .unwrap_or_default()
    } else {
        rel_path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect()
    };

    if let Some(unignore) = unignore_paths {
        if unignore
            .iter()
            .any(|p| rel_str == *p || rel_str.starts_with(&format!("{p}/")))
        {
            return false;
        }
    }

    if let Some(exclude) = exclude_paths {
        if exclude.iter().any(|p| {
            rel_str == *p || rel_str.starts_with(&format!("{p}/")) || dir_parts.contains(&p.as_str())
        }) {
            return true;
        }
    }

    dir_parts
        .iter()
        .any(|part| IGNORE_PATTERNS.contains(part))
}

/// Dependency-manifest filenames recognized for external packages.
pub fn is_dependency_manifest(file_name: &str) -> bool {
    matches!(
        file_name,
        "pyproject.toml"
            | "requirements.txt"
            | "package.json"
            | "Cargo.toml"
            | "go.mod"
            | "Gemfile"
            | "composer.json"
    ) || file_name.ends_with(".csproj")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn posix_rendering() {
        assert_eq!(to_posix(Path::new("a/b/c.py")), "a/b/c.py");
    }

    #[test]
    fn test_path_heuristic() {
        assert!(is_test_path(Path::new("tests/util.py")));
        assert!(is_test_path(Path::new("pkg/test_util.py")));
        assert!(is_test_path(Path::new("pkg/util_test.go")));
        assert!(is_test_path(Path::new("src/App.test.tsx")));
        assert!(is_test_path(Path::new("spec/model_spec.rb")));
        assert!(!is_test_path(Path::new("src/contest.py")));
        assert!(!is_test_path(Path::new("src/attester.rs")));
    }

    #[test]
    fn unignore_overrides_exclude() {
        let repo = PathBuf::from("/repo");
        let exclude: BTreeSet<String> = ["gen".to_string()].into();
        let unignore: BTreeSet<String> = ["gen/keep".to_string()].into();

        assert!(should_skip_path(
            Path::new("/repo/gen/out.py"),
            &repo,
            Some(&exclude),
            Some(&unignore),
        ));
        assert!(!should_skip_path(
            Path::new("/repo/gen/keep/ok.py"),
            &repo,
            Some(&exclude),
            Some(&unignore),
        ));
    }

    #[test]
    fn fixed_patterns_apply() {
        let repo = PathBuf::from("/repo");
        assert!(should_skip_path(
            Path::new("/repo/node_modules/lib/index.js"),
            &repo,
            None,
            None,
        ));
        assert!(should_skip_path(
            Path::new("/repo/a/b/cache.pyc"),
            &repo,
            None,
            None,
        ));
    }

    #[test]
    fn manifest_names() {
        assert!(is_dependency_manifest("package.json"));
        assert!(is_dependency_manifest("App.csproj"));
        assert!(!is_dependency_manifest("index.js"));
    }

    #[test]
    fn hash_is_stable_hex() {
        let h = content_hash(b"abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, content_hash(b"abc"));
        assert_ne!(h, content_hash(b"abd"));
    }
}
