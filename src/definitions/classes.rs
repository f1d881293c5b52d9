//! Class-like ingestion: classes, interfaces, enums, type aliases,
//! unions, their methods, inheritance edges, and method overrides.

use std::collections::VecDeque;
use tree_sitter::Node;

use super::{DefinitionContext, extract_decorators, extract_docstring};
use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind};
use crate::parsing::ast::{collect_nodes, field_text, lite_signature, node_text, parameter_names};
use crate::parsing::{Language, LanguageSpec};
use crate::props;
use crate::state::{IndexState, PendingTypeRelation};
use crate::symbol::SymbolKind;

#[allow(clippy::too_many_arguments)]
pub fn ingest_classes_and_methods(
    root: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    spec: &LanguageSpec,
    ctx: &DefinitionContext,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    if spec.class_node_types.is_empty() {
        tracing::debug!("No class node types for {language}; skipping classes");
        return;
    }

    for class_node in collect_nodes(root, spec.class_node_types) {
        if language == Language::Rust && class_node.kind() == "impl_item" {
            ingest_rust_impl(
                class_node, source, module_qn, state, ingestor, relative_path,
            );
            continue;
        }

        let Some(class_name) = class_name_of(class_node, source, spec) else {
            continue;
        };
        let class_qn = nested_class_qn(class_node, source, module_qn, &class_name, spec);
        let kind = determine_kind(class_node, language);
        let label = kind.node_label();

        tracing::info!("Found {}: {class_name} ({class_qn})", label.as_str().to_lowercase());
        ingestor.ensure_node_batch(
            label,
            props! {
                "qualified_name" => class_qn.clone(),
                "name" => class_name.clone(),
                "decorators" => extract_decorators(class_node, source, language),
                "start_line" => class_node.start_position().row + 1,
                "end_line" => class_node.end_position().row + 1,
                "docstring" => extract_docstring(class_node, source, language),
                "language" => language.key(),
                "module_qn" => module_qn,
                "path" => relative_path,
            },
        );
        state.registry.insert(&class_qn, kind);

        ingestor.ensure_relationship_batch(
            NodeRef::primary(NodeLabel::Module, module_qn),
            RelKind::Defines,
            NodeRef::primary(label, class_qn.clone()),
            None,
        );

        if language == Language::Cpp && super::functions::is_cpp_exported(class_node) {
            ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Module, module_qn),
                RelKind::Exports,
                NodeRef::primary(label, class_qn.clone()),
                None,
            );
        }

        // Parent names resolve in the linking pass, once every file's
        // definitions are registered.
        let (parents, interfaces) = extract_parent_names(class_node, source, language);
        if !parents.is_empty() || !interfaces.is_empty() {
            state.pending_type_relations.push(PendingTypeRelation {
                class_qn: class_qn.clone(),
                module_qn: module_qn.to_string(),
                parent_names: parents,
                interface_names: interfaces,
                interfaces_into_inheritance: false,
            });
        }

        ingest_class_methods(
            class_node, source, &class_qn, label, language, spec, ctx, state, ingestor,
            relative_path,
        );
    }
}

/// Rust `impl` blocks attach their functions to the named type; a trait
/// impl also records the trait both as an IMPLEMENTS edge and in the
/// inheritance map so default methods resolve.
fn ingest_rust_impl(
    impl_node: Node,
    source: &str,
    module_qn: &str,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    let Some(target) = field_text(impl_node, "type", source).map(strip_generics) else {
        return;
    };
    let class_qn = format!("{module_qn}.{target}");

    if let Some(trait_name) = field_text(impl_node, "trait", source).map(strip_generics) {
        state.pending_type_relations.push(PendingTypeRelation {
            class_qn: class_qn.clone(),
            module_qn: module_qn.to_string(),
            parent_names: Vec::new(),
            interface_names: vec![trait_name],
            interfaces_into_inheritance: true,
        });
    }

    let Some(body) = impl_node.child_by_field_name("body") else {
        return;
    };
    for method_node in collect_nodes(body, &["function_item"]) {
        ingest_method(
            method_node,
            source,
            &class_qn,
            NodeLabel::Class,
            Language::Rust,
            state,
            ingestor,
            relative_path,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn ingest_class_methods(
    class_node: Node,
    source: &str,
    class_qn: &str,
    class_label: NodeLabel,
    language: Language,
    spec: &LanguageSpec,
    _ctx: &DefinitionContext,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    // Some grammars (Ruby) carry the body as a plain child rather than
    // a named field; searching from the class node is equivalent since
    // only direct methods pass the ancestry check.
    let body = class_node
        .child_by_field_name(spec.body_field)
        .unwrap_or(class_node);
    for method_node in collect_nodes(body, spec.function_node_types) {
        if !is_direct_method(method_node, class_node, spec) {
            continue;
        }
        ingest_method(
            method_node,
            source,
            class_qn,
            class_label,
            language,
            state,
            ingestor,
            relative_path,
        );
    }
}

/// A method belongs to this class only when no other class or function
/// sits between them; closures inside methods are not methods.
pub(crate) fn is_direct_method(method_node: Node, class_node: Node, spec: &LanguageSpec) -> bool {
    let mut current = method_node.parent();
    while let Some(node) = current {
        if node.id() == class_node.id() {
            return true;
        }
        if spec.is_function_node(node.kind()) || spec.is_class_node(node.kind()) {
            return false;
        }
        current = node.parent();
    }
    false
}

#[allow(clippy::too_many_arguments)]
fn ingest_method(
    method_node: Node,
    source: &str,
    class_qn: &str,
    class_label: NodeLabel,
    language: Language,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    let method_name = match language {
        Language::Cpp => super::functions::extract_cpp_function_name(method_node, source),
        _ => field_text(method_node, "name", source).map(String::from),
    };
    let Some(method_name) = method_name else {
        return;
    };

    let method_qn = format!("{class_qn}.{method_name}");
    let params = parameter_names(method_node, source);

    tracing::info!("Found method: {method_name} ({method_qn})");
    ingestor.ensure_node_batch(
        NodeLabel::Method,
        props! {
            "qualified_name" => method_qn.clone(),
            "name" => method_name,
            "decorators" => extract_decorators(method_node, source, language),
            "start_line" => method_node.start_position().row + 1,
            "end_line" => method_node.end_position().row + 1,
            "docstring" => extract_docstring(method_node, source, language),
            "signature" => lite_signature(
                method_qn.rsplit('.').next().unwrap_or_default(),
                &params,
            ),
            "path" => relative_path,
        },
    );
    state.registry.insert(&method_qn, SymbolKind::Method);

    ingestor.ensure_relationship_batch(
        NodeRef::primary(class_label, class_qn),
        RelKind::DefinesMethod,
        NodeRef::primary(NodeLabel::Method, method_qn),
        None,
    );
}

fn class_name_of(class_node: Node, source: &str, spec: &LanguageSpec) -> Option<String> {
    field_text(class_node, spec.name_field, source).map(String::from)
}

/// FQN through enclosing class-like ancestors (nested classes).
fn nested_class_qn(
    class_node: Node,
    source: &str,
    module_qn: &str,
    class_name: &str,
    spec: &LanguageSpec,
) -> String {
    let mut path_parts: Vec<String> = Vec::new();
    let mut current = class_node.parent();
    while let Some(node) = current {
        if spec.is_module_node(node.kind()) {
            break;
        }
        if spec.is_class_node(node.kind()) {
            if let Some(name) = field_text(node, spec.name_field, source) {
                path_parts.push(name.to_string());
            }
        }
        current = node.parent();
    }
    path_parts.reverse();

    if path_parts.is_empty() {
        format!("{module_qn}.{class_name}")
    } else {
        format!("{module_qn}.{}.{class_name}", path_parts.join("."))
    }
}

/// Refine the generic "class" capture into the specific symbol kind.
fn determine_kind(class_node: Node, language: Language) -> SymbolKind {
    match class_node.kind() {
        "interface_declaration" | "trait_definition" | "trait_item" | "trait_declaration" => {
            SymbolKind::Interface
        }
        "enum_declaration" | "enum_specifier" | "enum_item" | "enum_definition" => SymbolKind::Enum,
        "type_alias_declaration" | "type_item" => SymbolKind::Type,
        "union_specifier" | "union_item" => SymbolKind::Union,
        "type_spec" if language == Language::Go => {
            match class_node.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Class,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::Type,
            }
        }
        _ => SymbolKind::Class,
    }
}

/// Parent class names and implemented interface names, unresolved.
fn extract_parent_names(
    class_node: Node,
    source: &str,
    language: Language,
) -> (Vec<String>, Vec<String>) {
    let mut parents = Vec::new();
    let mut interfaces = Vec::new();

    match language {
        Language::Python => {
            if let Some(superclasses) = class_node.child_by_field_name("superclasses") {
                for i in 0..superclasses.child_count() {
                    let Some(child) = superclasses.child(i as u32) else {
                        continue;
                    };
                    if matches!(child.kind(), "identifier" | "attribute") {
                        parents.push(node_text(child, source).to_string());
                    }
                }
            }
        }
        Language::Java => {
            if let Some(superclass) = class_node.child_by_field_name("superclass") {
                for ty in collect_nodes(
                    superclass,
                    &["type_identifier", "scoped_type_identifier", "generic_type"],
                )
                .iter()
                .take(1)
                {
                    parents.push(strip_generics(node_text(*ty, source)));
                }
            }
            if let Some(clause) = class_node.child_by_field_name("interfaces") {
                for ty in collect_nodes(clause, &["type_identifier", "scoped_type_identifier"]) {
                    interfaces.push(strip_generics(node_text(ty, source)));
                }
            }
        }
        Language::JavaScript | Language::TypeScript => {
            for i in 0..class_node.child_count() {
                let Some(child) = class_node.child(i as u32) else {
                    continue;
                };
                if child.kind() != "class_heritage" {
                    continue;
                }
                let mut saw_clause = false;
                for clause in collect_nodes(child, &["extends_clause", "implements_clause"]) {
                    saw_clause = true;
                    let names: Vec<String> =
                        collect_nodes(clause, &["identifier", "member_expression", "type_identifier"])
                            .iter()
                            .filter(|n| {
                                n.parent()
                                    .map(|p| p.kind() != "member_expression")
                                    .unwrap_or(true)
                            })
                            .map(|n| strip_generics(node_text(*n, source)))
                            .collect();
                    if clause.kind() == "extends_clause" {
                        parents.extend(names);
                    } else {
                        interfaces.extend(names);
                    }
                }
                // Plain JS heritage: `class A extends B` with no clause node.
                if !saw_clause {
                    for n in collect_nodes(child, &["identifier", "member_expression"]) {
                        if n.parent().map(|p| p.kind() != "member_expression").unwrap_or(true) {
                            parents.push(node_text(n, source).to_string());
                        }
                    }
                }
            }
        }
        Language::Cpp | Language::C => {
            for clause in collect_nodes(class_node, &["base_class_clause"]) {
                for ty in collect_nodes(clause, &["type_identifier", "qualified_identifier"]) {
                    parents.push(strip_generics(node_text(ty, source)).replace("::", "."));
                }
            }
        }
        Language::CSharp => {
            for clause in collect_nodes(class_node, &["base_list"]) {
                for ty in collect_nodes(clause, &["identifier", "qualified_name", "generic_name"]) {
                    if ty.parent().map(|p| p.kind() == "base_list").unwrap_or(false) {
                        parents.push(strip_generics(node_text(ty, source)));
                    }
                }
            }
        }
        Language::Scala => {
            for clause in collect_nodes(class_node, &["extends_clause"]) {
                for ty in collect_nodes(clause, &["type_identifier"]) {
                    parents.push(strip_generics(node_text(ty, source)));
                }
            }
        }
        Language::Ruby => {
            if let Some(superclass) = class_node.child_by_field_name("superclass") {
                for n in collect_nodes(superclass, &["constant", "scope_resolution"]) {
                    if n.parent().map(|p| p.kind() != "scope_resolution").unwrap_or(true) {
                        parents.push(node_text(n, source).replace("::", "."));
                    }
                }
            }
        }
        Language::Php => {
            for clause in collect_nodes(class_node, &["base_clause"]) {
                for n in collect_nodes(clause, &["name", "qualified_name"]) {
                    parents.push(node_text(n, source).replace('\\', "."));
                }
            }
            for clause in collect_nodes(class_node, &["class_interface_clause"]) {
                for n in collect_nodes(clause, &["name", "qualified_name"]) {
                    interfaces.push(node_text(n, source).replace('\\', "."));
                }
            }
        }
        _ => {}
    }

    parents.dedup();
    interfaces.dedup();
    (parents, interfaces)
}

/// Linking pass: resolve every pending inheritance clause against the
/// fully-populated registry, emit INHERITS / IMPLEMENTS edges, and
/// finalize the class-inheritance map the call resolver walks.
pub fn resolve_type_relations(state: &mut IndexState, ingestor: &mut dyn Ingestor) {
    let pending = std::mem::take(&mut state.pending_type_relations);
    for relation in &pending {
        let child_label = state
            .registry
            .get(&relation.class_qn)
            .map(|k| k.node_label())
            .filter(|l| l.is_class_like())
            .unwrap_or(NodeLabel::Class);

        let parent_qns: Vec<String> = relation
            .parent_names
            .iter()
            .map(|name| resolve_to_qn(state, name, &relation.module_qn))
            .collect();
        state
            .class_inheritance
            .entry(relation.class_qn.clone())
            .or_default()
            .extend(parent_qns.iter().cloned());
        for parent_qn in &parent_qns {
            create_inherits_edge(state, ingestor, child_label, &relation.class_qn, parent_qn);
        }

        for interface in &relation.interface_names {
            let interface_qn = resolve_to_qn(state, interface, &relation.module_qn);
            ingestor.ensure_relationship_batch(
                NodeRef::primary(child_label, relation.class_qn.clone()),
                RelKind::Implements,
                NodeRef::primary(NodeLabel::Interface, interface_qn.clone()),
                None,
            );
            if relation.interfaces_into_inheritance {
                state
                    .class_inheritance
                    .entry(relation.class_qn.clone())
                    .or_default()
                    .push(interface_qn);
            }
        }
    }
}

/// Resolve a simple class name: import map first, then the registry,
/// then a unique simple-name hit, falling back to the current module.
pub fn resolve_class_name(state: &IndexState, name: &str, module_qn: &str) -> Option<String> {
    if name.contains('.') {
        return Some(name.to_string());
    }
    if let Some(map) = state.module_imports(module_qn) {
        if let Some(full) = map.get(name) {
            return Some(full.clone());
        }
    }
    let local = format!("{module_qn}.{name}");
    if state.registry.contains(&local) {
        return Some(local);
    }
    if let Some(candidates) = state.registry.lookup_simple_name(name) {
        let class_like: Vec<&String> = candidates
            .iter()
            .filter(|fqn| {
                state
                    .registry
                    .get(fqn)
                    .map(|k| k.node_label().is_class_like())
                    .unwrap_or(false)
            })
            .collect();
        if class_like.len() == 1 {
            return Some(class_like[0].clone());
        }
    }
    None
}

fn resolve_to_qn(state: &IndexState, name: &str, module_qn: &str) -> String {
    resolve_class_name(state, name, module_qn).unwrap_or_else(|| format!("{module_qn}.{name}"))
}

/// INHERITS edge, auto-creating an external parent node when the parent
/// is not registered.
fn create_inherits_edge(
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    child_label: NodeLabel,
    child_qn: &str,
    parent_qn: &str,
) {
    let parent_kind = state.registry.get(parent_qn);
    let parent_label = parent_kind
        .map(|k| k.node_label())
        .filter(|l| l.is_class_like())
        .unwrap_or(NodeLabel::Class);

    if parent_kind.is_none() {
        let parent_name = parent_qn.rsplit('.').next().unwrap_or(parent_qn);
        ingestor.ensure_node_batch(
            parent_label,
            props! {
                "qualified_name" => parent_qn,
                "name" => parent_name,
                "is_external" => true,
            },
        );
        state.registry.insert(parent_qn, SymbolKind::Class);
    }

    ingestor.ensure_relationship_batch(
        NodeRef::primary(child_label, child_qn),
        RelKind::Inherits,
        NodeRef::primary(parent_label, parent_qn),
        None,
    );
}

/// After all definitions are ingested, link every method to the nearest
/// ancestor method it overrides (BFS over the inheritance map).
pub fn process_method_overrides(state: &IndexState, ingestor: &mut dyn Ingestor) {
    for (method_qn, kind) in state.registry.items() {
        if kind != SymbolKind::Method {
            continue;
        }
        let Some((class_qn, method_name)) = method_qn.rsplit_once('.') else {
            continue;
        };
        if !state.class_inheritance.contains_key(class_qn) {
            continue;
        }

        let mut queue: VecDeque<String> = VecDeque::from([class_qn.to_string()]);
        let mut visited: std::collections::HashSet<String> =
            std::collections::HashSet::from([class_qn.to_string()]);
        while let Some(current) = queue.pop_front() {
            if current != class_qn {
                let parent_method_qn = format!("{current}.{method_name}");
                if state.registry.contains(&parent_method_qn) {
                    tracing::debug!("Override: {method_qn} -> {parent_method_qn}");
                    ingestor.ensure_relationship_batch(
                        NodeRef::primary(NodeLabel::Method, method_qn.clone()),
                        RelKind::Overrides,
                        NodeRef::primary(NodeLabel::Method, parent_method_qn),
                        None,
                    );
                    break;
                }
            }
            if let Some(parents) = state.class_inheritance.get(&current) {
                for parent in parents {
                    if visited.insert(parent.clone()) {
                        queue.push_back(parent.clone());
                    }
                }
            }
        }
    }
}

/// Strip type parameters: `Repo<T>` -> `Repo`.
fn strip_generics(name: &str) -> String {
    match name.find('<') {
        Some(idx) => name[..idx].trim().to_string(),
        None => name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::new_parser;

    #[test]
    fn generics_are_stripped() {
        assert_eq!(strip_generics("Repository<User>"), "Repository");
        assert_eq!(strip_generics("Plain"), "Plain");
    }

    #[test]
    fn python_parent_extraction() {
        let source = "class Sub(Base, mixins.Extra):\n    pass\n";
        let mut parser = new_parser(Language::Python, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let class_node = collect_nodes(tree.root_node(), &["class_definition"])[0];
        let (parents, _) = extract_parent_names(class_node, source, Language::Python);
        assert_eq!(parents, vec!["Base".to_string(), "mixins.Extra".to_string()]);
    }

    #[test]
    fn java_superclass_and_interfaces() {
        let source = "class Sub extends Base implements Runnable, Closeable {}\n";
        let mut parser = new_parser(Language::Java, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let class_node = collect_nodes(tree.root_node(), &["class_declaration"])[0];
        let (parents, interfaces) = extract_parent_names(class_node, source, Language::Java);
        assert_eq!(parents, vec!["Base".to_string()]);
        assert_eq!(interfaces, vec!["Runnable".to_string(), "Closeable".to_string()]);
    }

    #[test]
    fn js_extends_clause() {
        let source = "class Child extends Parent {}\n";
        let mut parser = new_parser(Language::JavaScript, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let class_node = collect_nodes(tree.root_node(), &["class_declaration"])[0];
        let (parents, _) = extract_parent_names(class_node, source, Language::JavaScript);
        assert_eq!(parents, vec!["Parent".to_string()]);
    }
}
