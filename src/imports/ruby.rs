//! Ruby `require` / `require_relative` / `load` parsing.

use regex::Regex;
use std::sync::OnceLock;
use tree_sitter::Node;

use super::{ImportEnv, ImportSink};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    static REQUIRE_RE: OnceLock<Regex> = OnceLock::new();
    let re = REQUIRE_RE.get_or_init(|| {
        Regex::new(r#"\b(require|require_relative|load)\s*\(?\s*['"]([^'"]+)['"]"#).unwrap()
    });

    // Avoid duplicate records when the same call node text matches twice.
    let mut seen = std::collections::HashSet::new();
    for node in nodes {
        let text = node_text(*node, source);
        for capture in re.captures_iter(text) {
            let keyword = &capture[1];
            let path = capture[2].to_string();
            if path.is_empty() || !seen.insert((keyword.to_string(), path.clone())) {
                continue;
            }
            let resolved = if keyword == "require_relative" || path.starts_with("./") || path.starts_with("../")
            {
                resolve_relative(&path, env)
            } else {
                normalize(&path)
            };
            if resolved.is_empty() {
                continue;
            }
            if !resolved.starts_with(&env.project_prefix()) {
                sink.ensure_external_module(&resolved, &path);
            }
            let local = resolved.rsplit('.').next().unwrap_or(&resolved).to_string();
            sink.record(local, resolved);
        }
    }
}

fn resolve_relative(path: &str, env: &ImportEnv) -> String {
    // Resolve against the current module directory, under the project.
    let mut parts: Vec<&str> = env.module_qn.split('.').skip(1).collect();
    parts.pop();
    let normalized = path.replace('\\', "/");
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }
    if parts.is_empty() {
        env.project_name.to_string()
    } else {
        format!("{}.{}", env.project_name, parts.join("."))
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_matches('/')
        .replace('/', ".")
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
        let mut parser = new_parser(Language::Ruby, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let env = ImportEnv {
            repo_path: Path::new("."),
            project_name: "proj",
            module_qn,
            language: Language::Ruby,
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
    fn plain_require_normalizes_slashes() {
        let map = parse_source("require 'active_support/core_ext'\n", "proj.app");
        assert_eq!(map.get("core_ext").unwrap(), "active_support.core_ext");
    }

    #[test]
    fn require_relative_resolves_against_current_module() {
        let map = parse_source("require_relative '../lib/helper'\n", "proj.app.main");
        assert_eq!(map.get("helper").unwrap(), "proj.lib.helper");
    }
}
