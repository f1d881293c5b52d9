//! Java type inference and the Java-specific method-call resolver.
//!
//! Builds a reverse map from simple class names to in-repo FQNs for
//! fast resolution; generic type parameters are stripped before lookup.

use std::collections::HashMap;
use tree_sitter::Node;

use super::LocalTypes;
use crate::parsing::ast::{collect_nodes, field_text, node_text};
use crate::state::IndexState;
use crate::symbol::SymbolKind;

pub fn build_local_variable_type_map(
    scope_node: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
) -> LocalTypes {
    let mut local_types = LocalTypes::new();
    let reverse = simple_class_index(state);

    // Formal parameters: `void f(Mailer mailer)`.
    if let Some(params) = scope_node.child_by_field_name("parameters") {
        for param in collect_nodes(params, &["formal_parameter"]) {
            record_typed_declaration(param, source, module_qn, state, &reverse, &mut local_types);
        }
    }

    // Local declarations: `Mailer mailer = new Mailer();`.
    for declaration in collect_nodes(scope_node, &["local_variable_declaration", "field_declaration"])
    {
        record_typed_declaration(
            declaration,
            source,
            module_qn,
            state,
            &reverse,
            &mut local_types,
        );
    }

    local_types
}

fn record_typed_declaration(
    node: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    reverse: &HashMap<String, String>,
    local_types: &mut LocalTypes,
) {
    let Some(type_node) = node.child_by_field_name("type") else {
        return;
    };
    let type_name = strip_generics(node_text(type_node, source));
    let Some(type_fqn) = resolve_java_type(&type_name, module_qn, state, reverse) else {
        return;
    };

    if let Some(name) = field_text(node, "name", source) {
        local_types.insert(name.to_string(), type_fqn);
        return;
    }
    for declarator in collect_nodes(node, &["variable_declarator"]) {
        if let Some(name) = field_text(declarator, "name", source) {
            local_types.insert(name.to_string(), type_fqn.clone());
        }
    }
}

/// Reverse map of simple class name to FQN over all registered
/// class-like symbols, skipping ambiguous names.
fn simple_class_index(state: &IndexState) -> HashMap<String, String> {
    let mut index: HashMap<String, Option<String>> = HashMap::new();
    for (fqn, kind) in state.registry.items() {
        if !kind.node_label().is_class_like() {
            continue;
        }
        let simple = fqn.rsplit('.').next().unwrap_or(&fqn).to_string();
        index
            .entry(simple)
            .and_modify(|existing| *existing = None)
            .or_insert(Some(fqn));
    }
    index
        .into_iter()
        .filter_map(|(simple, fqn)| fqn.map(|f| (simple, f)))
        .collect()
}

fn resolve_java_type(
    type_name: &str,
    module_qn: &str,
    state: &IndexState,
    reverse: &HashMap<String, String>,
) -> Option<String> {
    if type_name.is_empty() || type_name.chars().next()?.is_lowercase() {
        return None;
    }
    if let Some(map) = state.module_imports(module_qn) {
        if let Some(full) = map.get(type_name) {
            return Some(full.clone());
        }
    }
    let local = format!("{module_qn}.{type_name}");
    if state.registry.contains(&local) {
        return Some(local);
    }
    reverse.get(type_name).cloned()
}

/// Resolve a Java method invocation with knowledge of the visible class
/// hierarchy. Unqualified calls search the caller's own class chain
/// before the module.
pub fn resolve_java_method_call(
    call_node: Node,
    source: &str,
    module_qn: &str,
    local_types: &LocalTypes,
    class_context: Option<&str>,
    state: &IndexState,
) -> Option<(SymbolKind, String)> {
    let name = field_text(call_node, "name", source)?;
    let object = call_node
        .child_by_field_name("object")
        .map(|o| node_text(o, source).to_string());

    match object {
        None => {
            // `f()` inside a method: own class, then ancestors, then module.
            if let Some(class_qn) = class_context {
                let own = format!("{class_qn}.{name}");
                if let Some(kind) = state.registry.get(&own) {
                    return Some((kind, own));
                }
                if let Some(found) = state.find_inherited_method(class_qn, name) {
                    let kind = state.registry.get(&found)?;
                    return Some((kind, found));
                }
            }
            let module_level = format!("{module_qn}.{name}");
            state
                .registry
                .get(&module_level)
                .map(|kind| (kind, module_level))
        }
        Some(object_name) => {
            let reverse = simple_class_index(state);
            let class_qn = local_types
                .get(&object_name)
                .cloned()
                .or_else(|| resolve_java_type(&object_name, module_qn, state, &reverse))?;
            let direct = format!("{class_qn}.{name}");
            if let Some(kind) = state.registry.get(&direct) {
                return Some((kind, direct));
            }
            let found = state.find_inherited_method(&class_qn, name)?;
            let kind = state.registry.get(&found)?;
            Some((kind, found))
        }
    }
}

fn strip_generics(name: &str) -> String {
    match name.find('<') {
        Some(idx) => name[..idx].trim().to_string(),
        None => name.trim().to_string(),
    }
}
