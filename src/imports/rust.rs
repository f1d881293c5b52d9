//! Rust `use`-tree parsing.
//!
//! Recursive descent over the declaration text, handling `as` aliases,
//! nested groups, wildcards, and the `crate::` / `super::` / `self::`
//! anchors. `crate::` resolves to the crate root found by walking up the
//! module FQN to its `src` ancestor.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink, module_path_of};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        let text = node_text(*node, source).trim();
        // Visibility modifiers (`pub`, `pub(crate)`) precede the keyword.
        let Some(idx) = text.find("use ") else {
            continue;
        };
        let body = text[idx + 4..].trim().trim_end_matches(';').trim();
        if !body.is_empty() {
            parse_use_tree("", body, env, sink);
        }
    }
}

fn parse_use_tree(prefix: &str, tree: &str, env: &ImportEnv, sink: &mut ImportSink) {
    let tree = tree.trim();
    if tree.is_empty() {
        return;
    }

    if let Some(open) = tree.find('{') {
        let head = tree[..open].trim().trim_end_matches("::").trim();
        let Some(close) = tree.rfind('}') else { return };
        let group = &tree[open + 1..close];
        let combined = join_path(prefix, head);
        for item in split_group(group) {
            parse_use_tree(&combined, &item, env, sink);
        }
        return;
    }

    if let Some((path, alias)) = tree.split_once(" as ") {
        let full = join_path(prefix, path.trim());
        register(alias.trim(), &full, env, sink);
        return;
    }

    if let Some(path) = tree.strip_suffix('*') {
        let full = join_path(prefix, path.trim_end_matches("::").trim());
        if let Some(resolved) = resolve_path(&full, env, sink) {
            sink.record_wildcard(&resolved);
        }
        return;
    }

    let full = join_path(prefix, tree);
    let local = if tree == "self" {
        prefix.rsplit("::").next().unwrap_or(prefix).to_string()
    } else {
        tree.rsplit("::").next().unwrap_or(tree).to_string()
    };
    register(&local, &full, env, sink);
}

fn register(local: &str, full_path: &str, env: &ImportEnv, sink: &mut ImportSink) {
    if let Some(resolved) = resolve_path(full_path, env, sink) {
        sink.record(local, resolved);
    }
}

/// Resolve a `::`-separated path to a dotted FQN.
fn resolve_path(path: &str, env: &ImportEnv, sink: &mut ImportSink) -> Option<String> {
    let mut segments: Vec<&str> = path
        .split("::")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }
    // A trailing `self` names the module itself: `use a::b::{self}`.
    if segments.len() > 1 && *segments.last().unwrap() == "self" {
        segments.pop();
    }

    let module_parts: Vec<&str> = env.module_qn.split('.').collect();
    match segments[0] {
        "crate" => {
            let crate_root: Vec<&str> = match module_parts.iter().position(|p| *p == "src") {
                Some(idx) => module_parts[..=idx].to_vec(),
                None => vec![env.project_name],
            };
            let mut parts: Vec<String> = crate_root.iter().map(|s| s.to_string()).collect();
            parts.extend(segments[1..].iter().map(|s| s.to_string()));
            Some(parts.join("."))
        }
        "super" => {
            let mut parts: Vec<String> = module_parts.iter().map(|s| s.to_string()).collect();
            let mut rest = &segments[..];
            while let Some(("super", tail)) = rest.split_first().map(|(h, t)| (*h, t)) {
                parts.pop();
                rest = tail;
            }
            parts.extend(rest.iter().map(|s| s.to_string()));
            Some(parts.join("."))
        }
        "self" => {
            let mut parts: Vec<String> = module_parts.iter().map(|s| s.to_string()).collect();
            parts.extend(segments[1..].iter().map(|s| s.to_string()));
            Some(parts.join("."))
        }
        _ => {
            let dotted = segments.join(".");
            sink.ensure_external_module(module_path_of(&dotted), path);
            Some(dotted)
        }
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else if path.is_empty() || path == "self" && !prefix.is_empty() {
        if path == "self" {
            format!("{prefix}::self")
        } else {
            prefix.to_string()
        }
    } else {
        format!("{prefix}::{path}")
    }
}

/// Split a `{...}` group on top-level commas.
fn split_group(group: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut buffer = String::new();
    for ch in group.chars() {
        match ch {
            '{' => {
                depth += 1;
                buffer.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                buffer.push(ch);
            }
            ',' if depth == 0 => {
                if !buffer.trim().is_empty() {
                    items.push(buffer.trim().to_string());
                }
                buffer.clear();
            }
            _ => buffer.push(ch),
        }
    }
    if !buffer.trim().is_empty() {
        items.push(buffer.trim().to_string());
    }
    items
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
        let mut parser = new_parser(Language::Rust, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let env = ImportEnv {
            repo_path: Path::new("."),
            project_name: "proj",
            module_qn,
            language: Language::Rust,
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
    fn grouped_use_with_alias() {
        let map = parse_source(
            "use std::collections::{HashMap as HM, HashSet};\n",
            "proj.src.main",
        );
        assert_eq!(map.get("HM").unwrap(), "std.collections.HashMap");
        assert_eq!(map.get("HashSet").unwrap(), "std.collections.HashSet");
    }

    #[test]
    fn crate_paths_anchor_at_the_src_ancestor() {
        let map = parse_source("use crate::net::server::Server;\n", "proj.src.app");
        assert_eq!(map.get("Server").unwrap(), "proj.src.net.server.Server");
    }

    #[test]
    fn super_paths_pop_module_parts() {
        let map = parse_source("use super::util::Helper;\n", "proj.src.net.server");
        assert_eq!(map.get("Helper").unwrap(), "proj.src.net.util.Helper");
    }

    #[test]
    fn wildcard_records_star_key() {
        let map = parse_source("use crate::prelude::*;\n", "proj.src.app");
        assert_eq!(map.get("*proj.src.prelude").unwrap(), "proj.src.prelude");
    }

    #[test]
    fn nested_groups() {
        let map = parse_source("use tokio::{sync::{mpsc, oneshot}, time};\n", "proj.src.app");
        assert_eq!(map.get("mpsc").unwrap(), "tokio.sync.mpsc");
        assert_eq!(map.get("oneshot").unwrap(), "tokio.sync.oneshot");
        assert_eq!(map.get("time").unwrap(), "tokio.time");
    }
}
