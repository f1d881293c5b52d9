//! C and C++ import parsing.
//!
//! `#include "x"` is project-qualified; `#include <x>` maps under
//! `std.`. C++20 module statements are scanned textually: `import M;`
//! resolves to the project or `std.*`; `module M;` and
//! `export module M;` emit ModuleImplementation / ModuleInterface nodes
//! and their IMPLEMENTS_MODULE / EXPORTS_MODULE edges.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink};
use crate::graph::{NodeLabel, NodeRef, RelKind};
use crate::parsing::Language;
use crate::parsing::ast::node_text;
use crate::props;

const STD_PREFIX: &str = "std.";

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        if node.kind() == "preproc_include" {
            parse_include(*node, source, env, sink);
        }
    }
    if env.language == Language::Cpp {
        scan_module_statements(source, env, sink);
    }
}

fn parse_include(node: Node, source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    let mut include_path = None;
    let mut is_system = false;
    for i in 0..node.child_count() {
        let Some(child) = node.child(i as u32) else { continue };
        match child.kind() {
            "string_literal" => {
                include_path = Some(node_text(child, source).trim_matches('"').to_string());
                is_system = false;
            }
            "system_lib_string" => {
                include_path = Some(
                    node_text(child, source)
                        .trim_matches(['<', '>'])
                        .to_string(),
                );
                is_system = true;
            }
            _ => {}
        }
    }
    let Some(include_path) = include_path else {
        return;
    };

    let header_name = include_path.rsplit('/').next().unwrap_or(&include_path);
    let local_name = header_name
        .strip_suffix(".hpp")
        .or_else(|| header_name.strip_suffix(".h"))
        .unwrap_or(header_name)
        .to_string();

    let full_name = if is_system {
        let dotted = include_path.replace('/', ".");
        if dotted.starts_with(STD_PREFIX) {
            dotted
        } else {
            format!("{STD_PREFIX}{dotted}")
        }
    } else {
        let stripped = include_path
            .strip_suffix(".hpp")
            .or_else(|| include_path.strip_suffix(".h"))
            .unwrap_or(&include_path);
        format!("{}.{}", env.project_name, stripped.replace('/', "."))
    };

    if is_system {
        sink.ensure_external_module(&full_name, &include_path);
    }
    sink.record(local_name, full_name);
}

/// Textual scan for C++20 module statements, which tree-sitter-cpp does
/// not expose uniformly across versions.
fn scan_module_statements(source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for raw_line in source.lines() {
        let line = raw_line.trim();

        if let Some(rest) = line.strip_prefix("export module ") {
            let Some(name) = module_name(rest) else { continue };
            let interface_qn = format!("{}.{name}", env.project_name);
            sink.record(name.clone(), interface_qn.clone());
            sink.ingestor.ensure_node_batch(
                NodeLabel::ModuleInterface,
                props! {"qualified_name" => interface_qn.clone(), "name" => name},
            );
            sink.ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Module, env.module_qn),
                RelKind::ExportsModule,
                NodeRef::primary(NodeLabel::ModuleInterface, interface_qn),
                None,
            );
        } else if let Some(rest) = line.strip_prefix("module ") {
            if rest.starts_with(':') {
                continue;
            }
            let Some(name) = module_name(rest) else { continue };
            let impl_qn = format!("{}.{name}.impl", env.project_name);
            let interface_qn = format!("{}.{name}", env.project_name);
            sink.record(name.clone(), interface_qn.clone());
            sink.ingestor.ensure_node_batch(
                NodeLabel::ModuleImplementation,
                props! {
                    "qualified_name" => impl_qn.clone(),
                    "name" => name,
                    "implements_module" => interface_qn.clone(),
                },
            );
            sink.ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Module, env.module_qn),
                RelKind::ImplementsModule,
                NodeRef::primary(NodeLabel::ModuleImplementation, impl_qn.clone()),
                None,
            );
            sink.ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::ModuleImplementation, impl_qn),
                RelKind::Implements,
                NodeRef::primary(NodeLabel::ModuleInterface, interface_qn),
                None,
            );
        } else if let Some(rest) = line.strip_prefix("import ") {
            let Some(spec) = module_name(rest) else { continue };
            let is_header = spec.starts_with('<') || spec.starts_with('"');
            let cleaned = spec.trim_matches(['<', '>', '"']).to_string();
            if cleaned.is_empty() {
                continue;
            }
            let (local, full) = if let Some(tail) = cleaned.strip_prefix("std.") {
                (tail.to_string(), format!("{STD_PREFIX}{tail}"))
            } else if is_header || cleaned == "std" {
                (cleaned.clone(), format!("{STD_PREFIX}{cleaned}"))
            } else {
                (cleaned.clone(), format!("{}.{cleaned}", env.project_name))
            };
            if full.starts_with(STD_PREFIX) {
                sink.ensure_external_module(&full, &cleaned);
            }
            sink.record(local, full);
        }
    }
}

fn module_name(rest: &str) -> Option<String> {
    let name = rest.split(';').next()?.trim();
    if name.is_empty() || name.contains(' ') {
        None
    } else {
        Some(name.to_string())
    }
}
