//! Fully-qualified-name construction rules.
//!
//! An FQN is `<project>.<module-path>[.<container>]*.<name>`, always
//! dot-separated regardless of the language's own separator. The module
//! path comes from the repo-relative file path; scope segments come from
//! AST ancestors.

use std::path::Path;

use super::Language;

/// Convert a repo-relative file path into module FQN parts.
///
/// The extension is dropped. Python `__init__.py` and Rust `mod.rs`
/// stand for their parent directory, so their stems are dropped too.
pub fn file_to_module_parts(relative_path: &Path, language: Language) -> Vec<String> {
    let file_name = relative_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let drops_stem = matches!(
        (language, file_name),
        (Language::Python, "__init__.py") | (Language::Rust, "mod.rs")
    );

    let base = if drops_stem {
        relative_path.parent().unwrap_or_else(|| Path::new(""))
    } else {
        relative_path
    };

    let mut parts: Vec<String> = base
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .map(String::from)
        .collect();

    if !drops_stem {
        if let Some(last) = parts.last_mut() {
            if let Some(stem) = Path::new(last.as_str())
                .file_stem()
                .and_then(|s| s.to_str())
            {
                *last = stem.to_string();
            }
        }
    }

    parts
}

/// Module qualified name for a file: `<project>.<dotted parts>`.
pub fn module_qualified_name(project: &str, relative_path: &Path, language: Language) -> String {
    let mut segments = vec![project.to_string()];
    segments.extend(file_to_module_parts(relative_path, language));
    segments.join(".")
}

/// Normalize a source-level qualified name to the registry's dotted form.
pub fn normalize_separators(name: &str) -> String {
    name.replace("::", ".").replace('\\', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_file_keeps_its_stem() {
        let parts = file_to_module_parts(Path::new("pkg/util.py"), Language::Python);
        assert_eq!(parts, vec!["pkg", "util"]);
    }

    #[test]
    fn python_init_maps_to_package_directory() {
        let parts = file_to_module_parts(Path::new("pkg/sub/__init__.py"), Language::Python);
        assert_eq!(parts, vec!["pkg", "sub"]);
    }

    #[test]
    fn rust_mod_rs_maps_to_module_directory() {
        let parts = file_to_module_parts(Path::new("src/net/mod.rs"), Language::Rust);
        assert_eq!(parts, vec!["src", "net"]);
    }

    #[test]
    fn module_qn_prefixes_project() {
        let qn = module_qualified_name("proj", Path::new("a/b.py"), Language::Python);
        assert_eq!(qn, "proj.a.b");
    }

    #[test]
    fn separators_normalize_to_dots() {
        assert_eq!(normalize_separators("std::collections::HashMap"), "std.collections.HashMap");
        assert_eq!(normalize_separators("App\\Service\\Mailer"), "App.Service.Mailer");
    }
}
