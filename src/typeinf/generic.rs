//! Constructor-pattern type inference for Go, Lua, Ruby, PHP, C#, and
//! Scala. Each language contributes its idiomatic construction shape;
//! everything else falls through to an empty map.

use tree_sitter::Node;

use super::LocalTypes;
use crate::definitions::classes::resolve_class_name;
use crate::parsing::Language;
use crate::parsing::ast::{collect_nodes, field_text, node_text};
use crate::state::IndexState;

pub fn build_local_variable_type_map(
    scope_node: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    state: &IndexState,
) -> LocalTypes {
    let mut local_types = LocalTypes::new();
    match language {
        Language::Go => infer_go(scope_node, source, module_qn, state, &mut local_types),
        Language::Lua => infer_lua(scope_node, source, module_qn, state, &mut local_types),
        Language::Ruby => infer_ruby(scope_node, source, module_qn, state, &mut local_types),
        Language::Php => infer_php(scope_node, source, module_qn, state, &mut local_types),
        Language::CSharp => infer_csharp(scope_node, source, module_qn, state, &mut local_types),
        Language::Scala => infer_scala(scope_node, source, module_qn, state, &mut local_types),
        _ => {}
    }
    local_types
}

fn resolve(state: &IndexState, name: &str, module_qn: &str) -> String {
    resolve_class_name(state, name, module_qn).unwrap_or_else(|| format!("{module_qn}.{name}"))
}

/// `x := Thing{...}` and `var x = Thing{...}`.
fn infer_go(
    scope: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    out: &mut LocalTypes,
) {
    for decl in collect_nodes(scope, &["short_var_declaration", "var_declaration"]) {
        let names: Vec<String> = collect_nodes(decl, &["identifier"])
            .iter()
            .filter(|n| {
                n.parent()
                    .map(|p| matches!(p.kind(), "expression_list" | "var_spec"))
                    .unwrap_or(false)
            })
            .map(|n| node_text(*n, source).to_string())
            .collect();
        let Some(literal) = collect_nodes(decl, &["composite_literal"]).into_iter().next() else {
            continue;
        };
        let Some(type_node) = literal.child_by_field_name("type") else {
            continue;
        };
        let type_name = node_text(type_node, source);
        if let Some(name) = names.first() {
            out.entry(name.clone())
                .or_insert_with(|| resolve(state, type_name, module_qn));
        }
    }
}

/// `local x = C:new()` — `new` is the Lua constructor convention.
fn infer_lua(
    scope: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    out: &mut LocalTypes,
) {
    for decl in collect_nodes(
        scope,
        &["variable_declaration", "local_variable_declaration", "assignment_statement"],
    ) {
        let call = collect_nodes(decl, &["function_call"]).into_iter().next();
        let Some(call) = call else { continue };
        let Some(head) = call.child(0) else { continue };
        if head.kind() != "method_index_expression" && head.kind() != "dot_index_expression" {
            continue;
        }
        let head_text = node_text(head, source);
        let Some((base, method)) = head_text
            .rsplit_once(':')
            .or_else(|| head_text.rsplit_once('.'))
        else {
            continue;
        };
        if method != "new" {
            continue;
        }
        let names: Vec<String> = collect_nodes(decl, &["identifier"])
            .iter()
            .take_while(|n| n.start_byte() < call.start_byte())
            .map(|n| node_text(*n, source).to_string())
            .collect();
        if let Some(name) = names.last() {
            out.entry(name.clone())
                .or_insert_with(|| resolve(state, base, module_qn));
        }
    }
}

/// `x = C.new` / `x = C.new(...)`.
fn infer_ruby(
    scope: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    out: &mut LocalTypes,
) {
    for assignment in collect_nodes(scope, &["assignment"]) {
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        if left.kind() != "identifier" {
            continue;
        }
        let right_text = node_text(right, source);
        let Some(receiver) = right_text
            .strip_suffix(".new")
            .or_else(|| right_text.split_once(".new(").map(|(head, _)| head))
        else {
            continue;
        };
        if receiver.is_empty() || !receiver.chars().next().unwrap().is_uppercase() {
            continue;
        }
        out.entry(node_text(left, source).to_string())
            .or_insert_with(|| resolve(state, &receiver.replace("::", "."), module_qn));
    }
}

/// `$x = new C(...)`.
fn infer_php(
    scope: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    out: &mut LocalTypes,
) {
    for assignment in collect_nodes(scope, &["assignment_expression"]) {
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        if right.kind() != "object_creation_expression" {
            continue;
        }
        let type_name = collect_nodes(right, &["name", "qualified_name"])
            .first()
            .map(|n| node_text(*n, source).replace('\\', "."));
        if let Some(type_name) = type_name {
            out.entry(node_text(left, source).to_string())
                .or_insert_with(|| resolve(state, &type_name, module_qn));
        }
    }
}

/// `var x = new C();` and `C x = new C();`.
fn infer_csharp(
    scope: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    out: &mut LocalTypes,
) {
    for declarator in collect_nodes(scope, &["variable_declarator"]) {
        let Some(name) = field_text(declarator, "name", source)
            .or_else(|| declarator.child(0).map(|n| node_text(n, source)))
        else {
            continue;
        };
        let Some(creation) = collect_nodes(declarator, &["object_creation_expression"])
            .into_iter()
            .next()
        else {
            continue;
        };
        let type_name = creation
            .child_by_field_name("type")
            .map(|t| strip_generics(node_text(t, source)));
        if let Some(type_name) = type_name {
            out.entry(name.to_string())
                .or_insert_with(|| resolve(state, &type_name, module_qn));
        }
    }
}

/// `val x = new C(...)`.
fn infer_scala(
    scope: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    out: &mut LocalTypes,
) {
    for definition in collect_nodes(scope, &["val_definition", "var_definition"]) {
        let Some(pattern) = definition.child_by_field_name("pattern") else {
            continue;
        };
        let Some(value) = definition.child_by_field_name("value") else {
            continue;
        };
        let value_text = node_text(value, source).trim().to_string();
        let Some(rest) = value_text.strip_prefix("new ") else {
            continue;
        };
        let type_name = rest
            .split(['(', '[', ' '])
            .next()
            .unwrap_or(rest)
            .trim()
            .to_string();
        if type_name.is_empty() {
            continue;
        }
        out.entry(node_text(pattern, source).to_string())
            .or_insert_with(|| resolve(state, &type_name, module_qn));
    }
}

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
    use crate::symbol::SymbolKind;

    fn state_with_class(module: &str, class: &str) -> IndexState {
        let mut state = IndexState::new();
        state.registry.insert(module, SymbolKind::Module);
        state
            .registry
            .insert(&format!("{module}.{class}"), SymbolKind::Class);
        state
    }

    #[test]
    fn lua_colon_new_constructor() {
        let source = "local account = Account:new()\naccount:deposit(10)\n";
        let mut parser = new_parser(Language::Lua, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let state = state_with_class("proj.bank", "Account");
        let map = build_local_variable_type_map(
            tree.root_node(),
            source,
            "proj.bank",
            Language::Lua,
            &state,
        );
        assert_eq!(
            map.get("account").map(String::as_str),
            Some("proj.bank.Account")
        );
    }

    #[test]
    fn php_new_expression() {
        let source = "<?php\n$mailer = new Mailer();\n$mailer->send();\n";
        let mut parser = new_parser(Language::Php, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let state = state_with_class("proj.app", "Mailer");
        let map = build_local_variable_type_map(
            tree.root_node(),
            source,
            "proj.app",
            Language::Php,
            &state,
        );
        assert_eq!(map.get("$mailer").map(String::as_str), Some("proj.app.Mailer"));
    }

    #[test]
    fn ruby_class_new() {
        let source = "user = User.new(name)\nuser.save\n";
        let mut parser = new_parser(Language::Ruby, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let state = state_with_class("proj.models", "User");
        let map = build_local_variable_type_map(
            tree.root_node(),
            source,
            "proj.models",
            Language::Ruby,
            &state,
        );
        assert_eq!(map.get("user").map(String::as_str), Some("proj.models.User"));
    }
}
