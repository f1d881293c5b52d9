//! Python import parsing.
//!
//! - `import X.Y as Z`      -> `Z -> X.Y`
//! - `import X.Y`           -> `X.Y -> X.Y`
//! - `from X import Y as Z` -> `Z -> resolved(X).Y`
//! - `from . import Y`      -> relative level pops trailing parts of the
//!   current module FQN before concatenation
//! - `from X import *`      -> `*resolved(X) -> resolved(X)`

use tree_sitter::Node;

use super::{ImportEnv, ImportSink, module_path_of};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        match node.kind() {
            "import_statement" => handle_import_statement(*node, source, env, sink),
            "import_from_statement" => handle_from_import(*node, source, env, sink),
            _ => {}
        }
    }
}

fn handle_import_statement(node: Node, source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for i in 0..node.child_count() {
        let Some(child) = node.child(i as u32) else { continue };
        match child.kind() {
            "dotted_name" => {
                let name = node_text(child, source).to_string();
                if !name.starts_with(&env.project_prefix()) {
                    sink.ensure_external_module(module_path_of(&name), &name);
                }
                sink.record(name.clone(), name);
            }
            "aliased_import" => {
                let Some(value) = child.child_by_field_name("name") else {
                    continue;
                };
                let Some(alias) = child.child_by_field_name("alias") else {
                    continue;
                };
                let full = node_text(value, source).to_string();
                if !full.starts_with(&env.project_prefix()) {
                    sink.ensure_external_module(module_path_of(&full), &full);
                }
                sink.record(node_text(alias, source), full);
            }
            _ => {}
        }
    }
}

fn handle_from_import(node: Node, source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    let module_name_node = node.child_by_field_name("module_name");

    let (relative_level, base_path) = match module_name_node {
        Some(m) if m.kind() == "relative_import" => parse_relative(m, source),
        Some(m) => (0, node_text(m, source).to_string()),
        None => (0, String::new()),
    };

    let resolved_base = resolve_module_path(&base_path, relative_level, env.module_qn);
    if relative_level == 0
        && !resolved_base.is_empty()
        && !resolved_base.starts_with(&env.project_prefix())
    {
        sink.ensure_external_module(&resolved_base, &base_path);
    }

    // Names come after the `import` keyword: dotted_name, aliased_import,
    // or a wildcard.
    let mut past_import_keyword = false;
    for i in 0..node.child_count() {
        let Some(child) = node.child(i as u32) else { continue };
        if child.kind() == "import" {
            past_import_keyword = true;
            continue;
        }
        if !past_import_keyword {
            continue;
        }
        match child.kind() {
            "wildcard_import" => sink.record_wildcard(&resolved_base),
            "dotted_name" => {
                let name = node_text(child, source);
                sink.record(name, join(&resolved_base, name));
            }
            "aliased_import" => {
                let Some(value) = child.child_by_field_name("name") else {
                    continue;
                };
                let Some(alias) = child.child_by_field_name("alias") else {
                    continue;
                };
                let name = node_text(value, source);
                sink.record(node_text(alias, source), join(&resolved_base, name));
            }
            _ => {}
        }
    }
}

fn parse_relative(relative_node: Node, source: &str) -> (usize, String) {
    let mut dots = 0;
    let mut module_name = String::new();
    for i in 0..relative_node.child_count() {
        let Some(child) = relative_node.child(i as u32) else {
            continue;
        };
        match child.kind() {
            "import_prefix" => dots = node_text(child, source).chars().filter(|c| *c == '.').count(),
            "dotted_name" => module_name = node_text(child, source).to_string(),
            _ => {}
        }
    }
    (dots, module_name)
}

/// Level `n` pops the file stem plus `n - 1` further parts before the
/// partial path is appended.
fn resolve_module_path(partial: &str, relative_level: usize, current_module: &str) -> String {
    if relative_level == 0 {
        return partial.to_string();
    }

    let mut parts: Vec<&str> = current_module.split('.').collect();
    parts.pop();
    for _ in 0..relative_level.saturating_sub(1) {
        parts.pop();
    }

    let base = parts.join(".");
    if partial.is_empty() {
        base
    } else if base.is_empty() {
        partial.to_string()
    } else {
        format!("{base}.{partial}")
    }
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryIngestor;
    use crate::parsing::{Language, new_parser};
    use crate::state::ModuleImports;
    use std::collections::HashSet;
    use std::path::Path;

    fn parse_source(source: &str, module_qn: &str) -> ModuleImports {
        let mut parser = new_parser(Language::Python, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let env = ImportEnv {
            repo_path: Path::new("."),
            project_name: "proj",
            module_qn,
            language: Language::Python,
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
    fn plain_and_aliased_imports() {
        let map = parse_source("import os.path\nimport numpy as np\n", "proj.m");
        assert_eq!(map.get("os.path").unwrap(), "os.path");
        assert_eq!(map.get("np").unwrap(), "numpy");
    }

    #[test]
    fn from_imports_with_alias() {
        let map = parse_source("from collections import OrderedDict as OD\n", "proj.m");
        assert_eq!(map.get("OD").unwrap(), "collections.OrderedDict");
    }

    #[test]
    fn relative_import_pops_module_parts() {
        let map = parse_source("from ..sub import x\n", "proj.a.b.c");
        assert_eq!(map.get("x").unwrap(), "proj.a.sub.x");
    }

    #[test]
    fn single_dot_relative_import() {
        let map = parse_source("from . import sibling\n", "proj.pkg.mod");
        assert_eq!(map.get("sibling").unwrap(), "proj.pkg.sibling");
    }

    #[test]
    fn wildcard_import_uses_star_key() {
        let map = parse_source("from proj.util import *\n", "proj.m");
        assert_eq!(map.get("*proj.util").unwrap(), "proj.util");
    }
}
