//! Java import parsing.
//!
//! Wildcard imports become `*<package-qn> -> <package-qn>`. An import
//! whose top-level segment names a directory in the repository is local
//! and gets the project prefix prepended.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink, module_path_of};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        let text = node_text(*node, source);
        let mut body = text.trim().trim_end_matches(';').trim();
        body = body.strip_prefix("import").unwrap_or(body).trim();
        body = body.strip_prefix("static").unwrap_or(body).trim();
        if body.is_empty() {
            continue;
        }

        if let Some(package) = body.strip_suffix(".*") {
            let resolved = resolve_import_path(package, env);
            if !resolved.starts_with(&env.project_prefix()) {
                sink.ensure_external_module(&resolved, package);
            }
            sink.record_wildcard(&resolved);
            continue;
        }

        let resolved = resolve_import_path(body, env);
        if !resolved.starts_with(&env.project_prefix()) {
            sink.ensure_external_module(module_path_of(&resolved), body);
        }
        let local = body.rsplit('.').next().unwrap_or(body);
        sink.record(local, resolved);
    }
}

fn resolve_import_path(import_path: &str, env: &ImportEnv) -> String {
    let top_level = import_path.split('.').next().unwrap_or(import_path);
    if env.repo_path.join(top_level).is_dir() {
        format!("{}.{import_path}", env.project_name)
    } else {
        import_path.to_string()
    }
}
