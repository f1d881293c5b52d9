//! JavaScript / TypeScript type inference: `new C()` bindings and
//! TypeScript parameter annotations.

use tree_sitter::Node;

use super::LocalTypes;
use crate::definitions::classes::resolve_class_name;
use crate::parsing::ast::{collect_nodes, field_text, node_text};
use crate::state::IndexState;

pub fn build_local_variable_type_map(
    scope_node: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
) -> LocalTypes {
    let mut local_types = LocalTypes::new();

    // TS annotations: `function f(repo: UserRepo)`.
    if let Some(params) = scope_node.child_by_field_name("parameters") {
        for param in collect_nodes(params, &["required_parameter", "optional_parameter"]) {
            let name = param
                .child_by_field_name("pattern")
                .map(|n| node_text(n, source));
            let annotation = collect_nodes(param, &["type_annotation"])
                .first()
                .and_then(|a| a.child(1))
                .map(|t| node_text(t, source));
            if let (Some(name), Some(annotation)) = (name, annotation) {
                if let Some(resolved) = resolve_class_name(state, strip_generics(annotation), module_qn)
                {
                    local_types.insert(name.to_string(), resolved);
                }
            }
        }
    }

    // `const x = new C(...)`.
    for declarator in collect_nodes(scope_node, &["variable_declarator"]) {
        let Some(name) = field_text(declarator, "name", source) else {
            continue;
        };
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        if value.kind() != "new_expression" {
            continue;
        }
        if let Some(constructor) = value.child_by_field_name("constructor") {
            let type_name = node_text(constructor, source);
            if let Some(resolved) = resolve_class_name(state, type_name, module_qn) {
                tracing::debug!("Inferred {name}: {resolved}");
                local_types.insert(name.to_string(), resolved);
            } else {
                local_types.insert(name.to_string(), type_name.to_string());
            }
        }
    }

    // `x = new C()` reassignments.
    for assignment in collect_nodes(scope_node, &["assignment_expression"]) {
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        if left.kind() != "identifier" || right.kind() != "new_expression" {
            continue;
        }
        if let Some(constructor) = right.child_by_field_name("constructor") {
            let type_name = node_text(constructor, source);
            let resolved = resolve_class_name(state, type_name, module_qn)
                .unwrap_or_else(|| type_name.to_string());
            local_types
                .entry(node_text(left, source).to_string())
                .or_insert(resolved);
        }
    }

    local_types
}

fn strip_generics(name: &str) -> &str {
    match name.find('<') {
        Some(idx) => name[..idx].trim(),
        None => name.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Language, new_parser};
    use crate::symbol::SymbolKind;

    #[test]
    fn new_expression_binds_type() {
        let source = "function go() {\n  const s = new Store();\n  s.save();\n}\n";
        let mut parser = new_parser(Language::JavaScript, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut state = IndexState::new();
        state.registry.insert("proj.m", SymbolKind::Module);
        state.registry.insert("proj.m.Store", SymbolKind::Class);

        let func = collect_nodes(tree.root_node(), &["function_declaration"])[0];
        let map = build_local_variable_type_map(func, source, "proj.m", &state);
        assert_eq!(map.get("s").map(String::as_str), Some("proj.m.Store"));
    }
}
