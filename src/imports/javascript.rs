//! JavaScript / TypeScript import parsing.
//!
//! Handles ES module `import` statements and CommonJS `require` calls.
//! Relative specifiers resolve against the current module's dotted
//! path; bare specifiers map to themselves with slashes dotted. When a
//! resolved internal path points at a real `<name>.{js,ts,jsx,tsx}` or
//! `<name>/index.*` file, the module form is preferred.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink, resolve_relative_specifier};
use crate::parsing::ast::{collect_nodes, node_text};

const SOURCE_EXTENSIONS: [&str; 4] = ["js", "ts", "jsx", "tsx"];
const DEFAULT_SUFFIX: &str = ".default";

pub fn parse(
    root: Node,
    import_nodes: &[Node],
    source: &str,
    env: &ImportEnv,
    sink: &mut ImportSink,
) {
    for node in import_nodes {
        handle_import_statement(*node, source, env, sink);
    }
    handle_require_calls(root, source, env, sink);
}

fn handle_import_statement(node: Node, source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    let Some(source_node) = node.child_by_field_name("source") else {
        return;
    };
    let specifier = node_text(source_node, source).trim_matches(['\'', '"']).to_string();
    let resolved = resolve_module_path(&specifier, env);
    if !resolved.starts_with(&env.project_prefix()) {
        sink.ensure_external_module(&resolved, &specifier);
    }

    let mut named_any = false;
    for i in 0..node.child_count() {
        let Some(clause) = node.child(i as u32) else { continue };
        if clause.kind() != "import_clause" {
            continue;
        }
        for j in 0..clause.child_count() {
            let Some(item) = clause.child(j as u32) else { continue };
            match item.kind() {
                // `import Default from '...'`: the binding stands for
                // the module's default export, which resolves to the
                // module itself once the `.default` sentinel is
                // stripped.
                "identifier" => {
                    named_any = true;
                    sink.record(node_text(item, source), resolved.clone());
                }
                // `import * as ns from '...'`
                "namespace_import" => {
                    named_any = true;
                    for k in 0..item.child_count() {
                        if let Some(name) = item.child(k as u32) {
                            if name.kind() == "identifier" {
                                sink.record(node_text(name, source), resolved.clone());
                            }
                        }
                    }
                }
                // `import { a, b as c } from '...'`
                "named_imports" => {
                    named_any = true;
                    for spec in collect_nodes(item, &["import_specifier"]) {
                        let Some(name_node) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = node_text(name_node, source);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| node_text(a, source))
                            .unwrap_or(imported);
                        sink.record(local, format!("{resolved}.{imported}"));
                    }
                }
                _ => {}
            }
        }
    }

    // Side-effect import: record the module under its last segment.
    if !named_any {
        if let Some(last) = resolved.rsplit('.').next() {
            sink.record(last, resolved.clone());
        }
    }
}

/// `const a = require('./a')` and `const { x } = require('./a')`.
fn handle_require_calls(root: Node, source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for call in collect_nodes(root, &["call_expression"]) {
        let Some(function) = call.child_by_field_name("function") else {
            continue;
        };
        if node_text(function, source) != "require" {
            continue;
        }
        let Some(args) = call.child_by_field_name("arguments") else {
            continue;
        };
        let Some(specifier) = collect_nodes(args, &["string"])
            .first()
            .map(|s| node_text(*s, source).trim_matches(['\'', '"']).to_string())
        else {
            continue;
        };
        let resolved = resolve_module_path(&specifier, env);
        if !resolved.starts_with(&env.project_prefix()) {
            sink.ensure_external_module(&resolved, &specifier);
        }

        // Find the binding: walk up to the variable declarator.
        let mut current = call.parent();
        while let Some(node) = current {
            if node.kind() == "variable_declarator" {
                if let Some(name_node) = node.child_by_field_name("name") {
                    match name_node.kind() {
                        "identifier" => {
                            sink.record(node_text(name_node, source), resolved.clone());
                        }
                        "object_pattern" => {
                            for prop in collect_nodes(
                                name_node,
                                &["shorthand_property_identifier_pattern", "pair_pattern"],
                            ) {
                                let local = node_text(prop, source);
                                if !local.is_empty() && !local.contains(':') {
                                    sink.record(local, format!("{resolved}.{local}"));
                                }
                            }
                        }
                        _ => {}
                    }
                }
                break;
            }
            if matches!(node.kind(), "program" | "statement_block") {
                break;
            }
            current = node.parent();
        }
    }
}

fn resolve_module_path(specifier: &str, env: &ImportEnv) -> String {
    if !specifier.starts_with("./") && !specifier.starts_with("../") && specifier != "." {
        return specifier.replace('/', ".");
    }
    let resolved = resolve_relative_specifier(specifier, env.module_qn);
    resolve_internal_module(&resolved, env)
}

/// Strip the `.default` sentinel and, when the path does not name a
/// real source file, prefer the existing `<name>.<ext>` or
/// `<name>/index.<ext>` module.
fn resolve_internal_module(full_name: &str, env: &ImportEnv) -> String {
    let full_name = strip_default(full_name);
    let parts: Vec<&str> = full_name.split('.').collect();
    if parts.len() <= 2 {
        return full_name;
    }

    let relative = parts[1..].join("/");
    for ext in SOURCE_EXTENSIONS {
        if env.repo_path.join(format!("{relative}.{ext}")).is_file()
            || env.repo_path.join(&relative).join(format!("index.{ext}")).is_file()
        {
            return full_name;
        }
    }

    // The last segment may be a symbol inside a module file.
    let module_relative = parts[1..parts.len() - 1].join("/");
    for ext in SOURCE_EXTENSIONS {
        if env
            .repo_path
            .join(format!("{module_relative}.{ext}"))
            .is_file()
            || env
                .repo_path
                .join(&module_relative)
                .join(format!("index.{ext}"))
                .is_file()
        {
            return parts[..parts.len() - 1].join(".");
        }
    }

    full_name
}

fn strip_default(name: &str) -> String {
    name.strip_suffix(DEFAULT_SUFFIX).unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryIngestor;
    use crate::parsing::{Language, new_parser};
    use crate::state::ModuleImports;
    use std::collections::HashSet;
    use std::path::Path;

    fn parse_in_repo(source: &str, module_qn: &str, repo: &Path) -> ModuleImports {
        let mut parser = new_parser(Language::JavaScript, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let env = ImportEnv {
            repo_path: repo,
            project_name: "proj",
            module_qn,
            language: Language::JavaScript,
        };
        let mut sink = ImportSink {
            map: &mut map,
            externals: &mut externals,
            ingestor: &mut ingestor,
        };
        super::super::parse_imports(tree.root_node(), source, &env, &mut sink);
        map
    }

    #[test]
    fn named_imports_resolve_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("util.js"), "").unwrap();
        let map = parse_in_repo(
            "import { helper, other as alias } from './util';\n",
            "proj.app",
            dir.path(),
        );
        assert_eq!(map.get("helper").unwrap(), "proj.util.helper");
        assert_eq!(map.get("alias").unwrap(), "proj.util.other");
    }

    #[test]
    fn bare_specifiers_stay_external() {
        let dir = tempfile::tempdir().unwrap();
        let map = parse_in_repo("import fs from 'fs';\n", "proj.app", dir.path());
        assert_eq!(map.get("fs").unwrap(), "fs");
    }

    #[test]
    fn require_binds_the_declared_variable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "").unwrap();
        let map = parse_in_repo("const a = require('./a');\na.hi();\n", "proj.b", dir.path());
        assert_eq!(map.get("a").unwrap(), "proj.a");
    }

    #[test]
    fn namespace_import() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.js"), "").unwrap();
        let map = parse_in_repo("import * as m from './m';\n", "proj.app", dir.path());
        assert_eq!(map.get("m").unwrap(), "proj.m");
    }
}
