//! JavaScript / TypeScript definition patterns that fall outside plain
//! declarations: CommonJS and ES6 exports, object-literal methods,
//! assignment-bound functions, and prototype inheritance.

use tree_sitter::Node;

use super::DefinitionContext;
use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind};
use crate::parsing::Language;
use crate::parsing::ast::{collect_nodes, field_text, node_text};
use crate::props;
use crate::state::IndexState;
use crate::symbol::SymbolKind;

#[allow(clippy::too_many_arguments)]
pub fn ingest_js_patterns(
    root: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    _ctx: &DefinitionContext,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    ingest_commonjs_exports(root, source, module_qn, language, state, ingestor, relative_path);
    ingest_es6_exports(root, source, module_qn, state, ingestor);
    ingest_object_literal_methods(root, source, module_qn, language, state, ingestor, relative_path);
    ingest_prototype_patterns(root, source, module_qn, language, state, ingestor, relative_path);
}

/// `module.exports.hi = function () {}`, `exports.hi = ...`, and
/// `module.exports = { hi() {} }`.
fn ingest_commonjs_exports(
    root: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    for assignment in collect_nodes(root, &["assignment_expression"]) {
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        let left_text = node_text(left, source);

        if left_text == "module.exports" || left_text == "exports" {
            // Export object: each function-valued property is a function.
            if right.kind() == "object" {
                for pair in collect_nodes(right, &["pair", "method_definition"]) {
                    let name = match pair.kind() {
                        "pair" => pair
                            .child_by_field_name("key")
                            .map(|k| node_text(k, source).trim_matches(['\'', '"']).to_string()),
                        _ => field_text(pair, "name", source).map(String::from),
                    };
                    let has_function_value = pair.kind() == "method_definition"
                        || pair
                            .child_by_field_name("value")
                            .is_some_and(|v| {
                                matches!(v.kind(), "function_expression" | "arrow_function")
                            });
                    if let Some(name) = name {
                        if has_function_value {
                            ingest_exported_function(
                                pair, source, module_qn, &name, language, state, ingestor,
                                relative_path,
                            );
                        }
                    }
                }
            }
            continue;
        }

        let exported_name = left_text
            .strip_prefix("module.exports.")
            .or_else(|| left_text.strip_prefix("exports."));
        if let Some(name) = exported_name {
            if !name.contains('.')
                && matches!(right.kind(), "function_expression" | "arrow_function" | "identifier")
            {
                ingest_exported_function(
                    assignment, source, module_qn, name, language, state, ingestor, relative_path,
                );
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn ingest_exported_function(
    node: Node,
    _source: &str,
    module_qn: &str,
    name: &str,
    language: Language,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    let function_qn = format!("{module_qn}.{name}");
    tracing::info!("Found exported function: {name} ({function_qn})");
    ingestor.ensure_node_batch(
        NodeLabel::Function,
        props! {
            "qualified_name" => function_qn.clone(),
            "name" => name,
            "decorators" => Vec::<String>::new(),
            "start_line" => node.start_position().row + 1,
            "end_line" => node.end_position().row + 1,
            "language" => language.key(),
            "module_qn" => module_qn,
            "path" => relative_path,
            "is_exported" => true,
        },
    );
    state.registry.insert(&function_qn, SymbolKind::Function);
    ingestor.ensure_relationship_batch(
        NodeRef::primary(NodeLabel::Module, module_qn),
        RelKind::Defines,
        NodeRef::primary(NodeLabel::Function, function_qn.clone()),
        None,
    );
    ingestor.ensure_relationship_batch(
        NodeRef::primary(NodeLabel::Module, module_qn),
        RelKind::Exports,
        NodeRef::primary(NodeLabel::Function, function_qn),
        None,
    );
}

/// ES6 `export function f() {}` / `export class C {}`: the declaration
/// itself is ingested by the normal passes; here the EXPORTS edge is
/// added.
fn ingest_es6_exports(
    root: Node,
    source: &str,
    module_qn: &str,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
) {
    for export in collect_nodes(root, &["export_statement"]) {
        let Some(declaration) = export.child_by_field_name("declaration") else {
            continue;
        };
        let Some(name) = field_text(declaration, "name", source) else {
            continue;
        };
        let exported_qn = format!("{module_qn}.{name}");
        let label = match state.registry.get(&exported_qn) {
            Some(kind) if kind.node_label().is_class_like() => kind.node_label(),
            Some(SymbolKind::Function) => NodeLabel::Function,
            // The declaration pass may run after this root; assume the
            // declaration's own kind.
            _ => {
                if declaration.kind().starts_with("class") {
                    NodeLabel::Class
                } else {
                    NodeLabel::Function
                }
            }
        };
        ingestor.ensure_relationship_batch(
            NodeRef::primary(NodeLabel::Module, module_qn),
            RelKind::Exports,
            NodeRef::primary(label, exported_qn),
            None,
        );
    }
}

/// `const api = { fetch() {}, post: function () {} }` registers
/// `module.api.fetch` and `module.api.post`.
fn ingest_object_literal_methods(
    root: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    for declarator in collect_nodes(root, &["variable_declarator"]) {
        let Some(object_name) = field_text(declarator, "name", source) else {
            continue;
        };
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        if value.kind() != "object" {
            continue;
        }

        for member in collect_nodes(value, &["pair", "method_definition"]) {
            let name = match member.kind() {
                "pair" => {
                    let is_function = member
                        .child_by_field_name("value")
                        .is_some_and(|v| matches!(v.kind(), "function_expression" | "arrow_function"));
                    if !is_function {
                        continue;
                    }
                    member
                        .child_by_field_name("key")
                        .map(|k| node_text(k, source).trim_matches(['\'', '"']).to_string())
                }
                _ => field_text(member, "name", source).map(String::from),
            };
            let Some(name) = name else { continue };

            let function_qn = format!("{module_qn}.{object_name}.{name}");
            ingestor.ensure_node_batch(
                NodeLabel::Function,
                props! {
                    "qualified_name" => function_qn.clone(),
                    "name" => name,
                    "decorators" => Vec::<String>::new(),
                    "start_line" => member.start_position().row + 1,
                    "end_line" => member.end_position().row + 1,
                    "language" => language.key(),
                    "module_qn" => module_qn,
                    "path" => relative_path,
                },
            );
            state.registry.insert(&function_qn, SymbolKind::Function);
            ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Module, module_qn),
                RelKind::Defines,
                NodeRef::primary(NodeLabel::Function, function_qn),
                None,
            );
        }
    }
}

/// Prototype idioms: `Child.prototype = Object.create(Parent.prototype)`
/// records inheritance; `Type.prototype.method = function () {}`
/// registers a method on the type.
fn ingest_prototype_patterns(
    root: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    for assignment in collect_nodes(root, &["assignment_expression"]) {
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        let left_text = node_text(left, source);

        if let Some((type_name, method_name)) = split_prototype_member(left_text) {
            if matches!(right.kind(), "function_expression" | "arrow_function") {
                let class_qn = format!("{module_qn}.{type_name}");
                let method_qn = format!("{class_qn}.{method_name}");
                ingestor.ensure_node_batch(
                    NodeLabel::Method,
                    props! {
                        "qualified_name" => method_qn.clone(),
                        "name" => method_name,
                        "decorators" => Vec::<String>::new(),
                        "start_line" => assignment.start_position().row + 1,
                        "end_line" => assignment.end_position().row + 1,
                        "language" => language.key(),
                        "path" => relative_path,
                    },
                );
                state.registry.insert(&method_qn, SymbolKind::Method);
                ingestor.ensure_relationship_batch(
                    NodeRef::primary(NodeLabel::Class, class_qn),
                    RelKind::DefinesMethod,
                    NodeRef::primary(NodeLabel::Method, method_qn),
                    None,
                );
            }
            continue;
        }

        // Child.prototype = Object.create(Parent.prototype)
        if let Some(child) = left_text.strip_suffix(".prototype") {
            let right_text = node_text(right, source);
            if let Some(parent) = parent_from_object_create(right_text) {
                let child_qn = format!("{module_qn}.{child}");
                let parent_qn = format!("{module_qn}.{parent}");
                state
                    .class_inheritance
                    .entry(child_qn.clone())
                    .or_default()
                    .push(parent_qn.clone());
                ingestor.ensure_relationship_batch(
                    NodeRef::primary(NodeLabel::Class, child_qn),
                    RelKind::Inherits,
                    NodeRef::primary(NodeLabel::Class, parent_qn),
                    None,
                );
            }
        }
    }
}

/// `Type.prototype.method` -> `(Type, method)`.
fn split_prototype_member(left_text: &str) -> Option<(&str, &str)> {
    let idx = left_text.find(".prototype.")?;
    let type_name = &left_text[..idx];
    let method_name = &left_text[idx + ".prototype.".len()..];
    (!type_name.contains('.') && !method_name.contains('.'))
        .then_some((type_name, method_name))
}

fn parent_from_object_create(right_text: &str) -> Option<&str> {
    let inner = right_text
        .trim()
        .strip_prefix("Object.create(")?
        .strip_suffix(')')?;
    inner.trim().strip_suffix(".prototype")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prototype_member_splitting() {
        assert_eq!(
            split_prototype_member("Dog.prototype.bark"),
            Some(("Dog", "bark"))
        );
        assert_eq!(split_prototype_member("a.b.prototype.c"), None);
        assert_eq!(split_prototype_member("noProto.member"), None);
    }

    #[test]
    fn object_create_parent() {
        assert_eq!(
            parent_from_object_create("Object.create(Animal.prototype)"),
            Some("Animal")
        );
        assert_eq!(parent_from_object_create("somethingElse()"), None);
    }
}
