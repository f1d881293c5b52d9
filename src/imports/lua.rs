//! Lua import parsing: `require 'a.b'`, `pcall(require, 'a.b')`, and
//! references to standard-library modules.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink};
use crate::parsing::ast::{collect_nodes, node_text};

const LUA_STDLIB: &[&str] = &[
    "string", "table", "math", "io", "os", "coroutine", "debug", "utf8", "package",
];

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        if let Some(module_path) = require_argument(*node, source) {
            let resolved = resolve_module_path(&module_path, env);
            let local = assignment_lhs(*node, source)
                .unwrap_or_else(|| resolved.rsplit('.').next().unwrap_or(&resolved).to_string());
            if !resolved.starts_with(&env.project_prefix()) {
                sink.ensure_external_module(&resolved, &module_path);
            }
            sink.record(local, resolved);
        } else if let Some(stdlib) = stdlib_module(*node, source) {
            sink.record(stdlib.clone(), stdlib);
        }
    }
}

/// The string argument of `require '...'` or `pcall(require, '...')`.
fn require_argument(call_node: Node, source: &str) -> Option<String> {
    let head = call_node.child(0)?;
    let head_text = node_text(head, source);

    let is_require = head.kind() == "identifier" && head_text == "require";
    let is_pcall_require = head.kind() == "identifier" && head_text == "pcall" && {
        call_node
            .child_by_field_name("arguments")
            .map(|args| {
                (0..args.child_count()).any(|i| {
                    args.child(i as u32)
                        .is_some_and(|c| c.kind() == "identifier" && node_text(c, source) == "require")
                })
            })
            .unwrap_or(false)
    };
    if !is_require && !is_pcall_require {
        return None;
    }

    let string_nodes = collect_nodes(call_node, &["string", "string_content"]);
    string_nodes
        .iter()
        .map(|s| node_text(*s, source).trim_matches(['\'', '"']).to_string())
        .find(|s| !s.is_empty() && s != "require")
}

/// `local mod = require 'x'` or `ok, mod = pcall(require, 'x')`.
fn assignment_lhs(call_node: Node, source: &str) -> Option<String> {
    let mut current = call_node.parent();
    while let Some(node) = current {
        match node.kind() {
            "variable_declaration" | "assignment_statement" | "local_variable_declaration" => {
                let names: Vec<String> = collect_nodes(node, &["identifier"])
                    .iter()
                    .take_while(|n| n.start_byte() < call_node.start_byte())
                    .map(|n| node_text(*n, source).to_string())
                    .filter(|n| n != "require" && n != "pcall")
                    .collect();
                // The useful binding of pcall is the second value.
                return names.last().cloned();
            }
            "chunk" => return None,
            _ => current = node.parent(),
        }
    }
    None
}

fn stdlib_module(call_node: Node, source: &str) -> Option<String> {
    let head = call_node.child(0)?;
    if head.kind() != "dot_index_expression" {
        return None;
    }
    let base = head.child(0)?;
    if base.kind() != "identifier" {
        return None;
    }
    let name = node_text(base, source);
    LUA_STDLIB.contains(&name).then(|| name.to_string())
}

fn resolve_module_path(import_path: &str, env: &ImportEnv) -> String {
    if import_path.starts_with("./") || import_path.starts_with("../") {
        let mut parts: Vec<&str> = env.module_qn.split('.').collect();
        parts.pop();
        let normalized = import_path.replace('\\', "/");
        for part in normalized.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                segment => parts.push(segment),
            }
        }
        return parts.join(".");
    }

    let dotted = import_path.replace('/', ".");
    let relative_file = format!("{}.lua", dotted.replace('.', "/"));
    if env.repo_path.join(&relative_file).is_file()
        || env.repo_path.join(format!("{dotted}.lua")).is_file()
    {
        return format!("{}.{dotted}", env.project_name);
    }
    dotted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryIngestor;
    use crate::parsing::{Language, new_parser};
    use crate::state::ModuleImports;
    use std::collections::HashSet;
    use std::path::Path;

    fn parse_in_repo(source: &str, repo: &Path) -> ModuleImports {
        let mut parser = new_parser(Language::Lua, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let env = ImportEnv {
            repo_path: repo,
            project_name: "proj",
            module_qn: "proj.init",
            language: Language::Lua,
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
    fn local_require_binds_variable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("utils")).unwrap();
        std::fs::write(dir.path().join("utils/json.lua"), "").unwrap();
        let map = parse_in_repo("local json = require 'utils.json'\n", dir.path());
        assert_eq!(map.get("json").unwrap(), "proj.utils.json");
    }

    #[test]
    fn pcall_require_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let map = parse_in_repo("local ok, cjson = pcall(require, 'cjson')\n", dir.path());
        assert_eq!(map.get("cjson").unwrap(), "cjson");
    }

    #[test]
    fn stdlib_reference_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let map = parse_in_repo("local s = string.format('%d', 1)\n", dir.path());
        assert_eq!(map.get("string").unwrap(), "string");
    }
}
