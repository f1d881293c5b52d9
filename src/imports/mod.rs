//! Import processor: per-language parsing of import statements into
//! module-qualified alias maps, plus module-path resolution.
//!
//! For every module the engine keeps `{local name -> full qn}`; wildcard
//! imports use the key `*<module-qn>`. Import targets outside the
//! project prefix get an external Module node on first mention.

mod c_cpp;
mod csharp;
mod go;
mod java;
mod javascript;
mod lua;
mod php;
mod python;
mod ruby;
mod rust;
mod scala;

use std::collections::HashSet;
use std::path::Path;

use tree_sitter::Node;

use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind};
use crate::parsing::{Language, ast, language_spec};
use crate::props;
use crate::state::{IndexState, ModuleImports};

/// Read-only facts about the module whose imports are being parsed.
pub struct ImportEnv<'a> {
    pub repo_path: &'a Path,
    pub project_name: &'a str,
    pub module_qn: &'a str,
    pub language: Language,
}

impl ImportEnv<'_> {
    pub fn project_prefix(&self) -> String {
        format!("{}.", self.project_name)
    }
}

/// Mutable targets the parsers write into.
pub struct ImportSink<'a> {
    pub map: &'a mut ModuleImports,
    pub externals: &'a mut HashSet<String>,
    pub ingestor: &'a mut dyn Ingestor,
}

impl ImportSink<'_> {
    /// Record one alias, logging at debug like every resolver does.
    pub fn record(&mut self, local: impl Into<String>, full: impl Into<String>) {
        let local = local.into();
        let full = full.into();
        tracing::debug!("Import: {local} -> {full}");
        self.map.insert(local, full);
    }

    /// Record a wildcard import of `module_path`.
    pub fn record_wildcard(&mut self, module_path: &str) {
        tracing::debug!("Wildcard import of {module_path}");
        self.map
            .insert(format!("*{module_path}"), module_path.to_string());
    }

    /// Emit an external Module node for an import target outside the
    /// project, once per distinct path.
    pub fn ensure_external_module(&mut self, module_path: &str, source_name: &str) {
        if module_path.is_empty() || !self.externals.insert(module_path.to_string()) {
            return;
        }
        let name = module_path.rsplit('.').next().unwrap_or(module_path);
        let mut props = props! {
            "qualified_name" => module_path,
            "name" => name,
            "path" => source_name,
            "is_external" => true,
        };
        if let Some((namespace, _)) = module_path.rsplit_once('.') {
            props.insert("parent_qn", namespace.into());
        }
        self.ingestor.ensure_node_batch(NodeLabel::Module, props);
    }
}

/// Parse all import statements in a file and populate the module's map.
pub fn parse_imports(root: Node, source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    let spec = language_spec(env.language);
    if spec.import_node_types.is_empty() {
        tracing::debug!(
            "No import node types configured for {}; skipping imports",
            env.language
        );
        return;
    }
    let nodes = ast::collect_nodes(root, spec.import_node_types);

    match env.language {
        Language::Python => python::parse(&nodes, source, env, sink),
        Language::JavaScript | Language::TypeScript => {
            javascript::parse(root, &nodes, source, env, sink)
        }
        Language::Go => go::parse(&nodes, source, env, sink),
        Language::Java => java::parse(&nodes, source, env, sink),
        Language::Rust => rust::parse(&nodes, source, env, sink),
        Language::C | Language::Cpp => c_cpp::parse(&nodes, source, env, sink),
        Language::CSharp => csharp::parse(&nodes, source, env, sink),
        Language::Php => php::parse(&nodes, source, env, sink),
        Language::Ruby => ruby::parse(&nodes, source, env, sink),
        Language::Lua => lua::parse(&nodes, source, env, sink),
        Language::Scala => scala::parse(&nodes, source, env, sink),
    }
}

/// Linking pass: emit Module→Module IMPORTS edges once all modules are
/// registered, so imports whose targets were parsed later still link.
pub fn link_imports(state: &IndexState, ingestor: &mut dyn Ingestor) {
    let mut module_qns: Vec<&String> = state.imports.keys().collect();
    module_qns.sort();

    for module_qn in module_qns {
        let Some(map) = state.imports.get(module_qn) else {
            continue;
        };
        let mut targets: HashSet<String> = HashSet::new();
        for (local, full) in map {
            let target = if local.starts_with('*') {
                full.clone()
            } else {
                match containing_module(state, full) {
                    Some(m) => m,
                    None => continue,
                }
            };
            if target != *module_qn {
                targets.insert(target);
            }
        }

        let mut targets: Vec<String> = targets.into_iter().collect();
        targets.sort();
        for target in targets {
            ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Module, module_qn.clone()),
                RelKind::Imports,
                NodeRef::primary(NodeLabel::Module, target),
                None,
            );
        }
    }
}

/// The registered module that contains `fqn`, or the external module
/// node it was recorded under.
fn containing_module(state: &IndexState, fqn: &str) -> Option<String> {
    use crate::symbol::SymbolKind;
    if state.registry.get(fqn) == Some(SymbolKind::Module) {
        return Some(fqn.to_string());
    }
    // Longest registered module prefix wins.
    let mut prefix = fqn;
    while let Some((head, _)) = prefix.rsplit_once('.') {
        if state.registry.get(head) == Some(SymbolKind::Module) {
            return Some(head.to_string());
        }
        prefix = head;
    }
    if state.external_modules.contains(fqn) {
        return Some(fqn.to_string());
    }
    if let Some((head, _)) = fqn.rsplit_once('.') {
        if state.external_modules.contains(head) {
            return Some(head.to_string());
        }
    }
    None
}

/// The module path of an import target: everything before the last
/// segment, or the whole name when it has a single segment.
pub(crate) fn module_path_of(full_name: &str) -> &str {
    match full_name.rsplit_once('.') {
        Some((head, _)) => head,
        None => full_name,
    }
}

/// Resolve a relative specifier (`./x`, `../y`) against the directory
/// of the current module's dotted path.
pub(crate) fn resolve_relative_specifier(specifier: &str, module_qn: &str) -> String {
    let mut parts: Vec<&str> = module_qn.split('.').collect();
    parts.pop();
    let normalized = specifier.replace('\\', "/");
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_specifiers_walk_the_module_path() {
        assert_eq!(
            resolve_relative_specifier("./util", "proj.src.app"),
            "proj.src.util"
        );
        assert_eq!(
            resolve_relative_specifier("../lib/db", "proj.src.app"),
            "proj.lib.db"
        );
    }

    #[test]
    fn module_path_strips_last_segment() {
        assert_eq!(module_path_of("os.path.join"), "os.path");
        assert_eq!(module_path_of("os"), "os");
    }
}
