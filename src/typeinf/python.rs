//! Python type inference: annotated parameters, constructor-call
//! assignments, `self.attr` instance attributes, iterator variables of
//! comprehensions and `for` loops, and method-chain return types.

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

    seed_parameter_types(scope_node, source, module_qn, state, &mut local_types);

    for assignment in collect_nodes(scope_node, &["assignment"]) {
        process_assignment(assignment, source, module_qn, state, &mut local_types);
    }
    for comprehension in collect_nodes(
        scope_node,
        &["list_comprehension", "set_comprehension", "dictionary_comprehension"],
    ) {
        analyze_iteration(comprehension, source, module_qn, state, &mut local_types);
    }
    for for_statement in collect_nodes(scope_node, &["for_statement"]) {
        analyze_iteration(for_statement, source, module_qn, state, &mut local_types);
    }

    // Instance attributes assigned anywhere in the enclosing class body
    // are visible to every method of the class.
    if let Some(class_node) = enclosing_python_class(scope_node) {
        for assignment in collect_nodes(class_node, &["assignment"]) {
            process_self_attribute(assignment, source, module_qn, state, &mut local_types);
        }
    }

    local_types
}

fn seed_parameter_types(
    scope_node: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    local_types: &mut LocalTypes,
) {
    let Some(params) = scope_node.child_by_field_name("parameters") else {
        return;
    };
    for param in collect_nodes(params, &["typed_parameter", "typed_default_parameter"]) {
        let name = param
            .child_by_field_name("name")
            .map(|n| node_text(n, source))
            .or_else(|| param.child(0).map(|n| node_text(n, source)));
        let annotation = field_text(param, "type", source);
        if let (Some(name), Some(annotation)) = (name, annotation) {
            if let Some(type_fqn) = resolve_type_name(annotation, module_qn, state) {
                local_types.insert(name.to_string(), type_fqn);
            }
        }
    }
}

fn process_assignment(
    assignment: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    local_types: &mut LocalTypes,
) {
    let Some(left) = assignment.child_by_field_name("left") else {
        return;
    };
    let Some(right) = assignment.child_by_field_name("right") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let var_name = node_text(left, source).to_string();

    if let Some(inferred) =
        infer_expression_type(node_text(right, source), module_qn, Some(local_types), state)
    {
        tracing::debug!("Inferred {var_name}: {inferred}");
        local_types.entry(var_name).or_insert(inferred);
    }
}

fn process_self_attribute(
    assignment: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    local_types: &mut LocalTypes,
) {
    let Some(left) = assignment.child_by_field_name("left") else {
        return;
    };
    let Some(right) = assignment.child_by_field_name("right") else {
        return;
    };
    if left.kind() != "attribute" {
        return;
    }
    let attr_text = node_text(left, source);
    if !attr_text.starts_with("self.") {
        return;
    }
    if let Some(inferred) = infer_expression_type(node_text(right, source), module_qn, None, state)
    {
        local_types
            .entry(attr_text.to_string())
            .or_insert(inferred);
    }
}

/// `for x in [A(), A()]` and comprehension clauses bind `x` to the
/// element constructor's type.
fn analyze_iteration(
    node: Node,
    source: &str,
    module_qn: &str,
    state: &IndexState,
    local_types: &mut LocalTypes,
) {
    let (left, right) = match node.kind() {
        "for_statement" => (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ),
        _ => {
            let clause = collect_nodes(node, &["for_in_clause"]).into_iter().next();
            match clause {
                Some(clause) => (
                    clause.child_by_field_name("left"),
                    clause.child_by_field_name("right"),
                ),
                None => (None, None),
            }
        }
    };
    let (Some(left), Some(right)) = (left, right) else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    if !matches!(right.kind(), "list" | "set" | "tuple") {
        return;
    }
    let Some(first_call) = collect_nodes(right, &["call"]).into_iter().next() else {
        return;
    };
    if let Some(inferred) =
        infer_expression_type(node_text(first_call, source), module_qn, None, state)
    {
        local_types
            .entry(node_text(left, source).to_string())
            .or_insert(inferred);
    }
}

/// Infer the type of an expression given as source text.
///
/// Handles plain names (via local types), constructor calls `C(...)`,
/// and call chains `a().b().c()` by following annotated or inferred
/// return types through the registry.
pub fn infer_expression_type(
    expr: &str,
    module_qn: &str,
    local_types: Option<&LocalTypes>,
    state: &IndexState,
) -> Option<String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return None;
    }

    let segments = split_chain(expr);
    let (head, rest) = segments.split_first()?;

    let mut current_type = if let Some(base) = head.strip_suffix("()") {
        // Constructor or factory call.
        let resolved = resolve_type_name(base, module_qn, state)?;
        if class_like(state, &resolved) {
            resolved
        } else if state.registry.contains(&resolved) {
            infer_callable_return_type(&resolved, state)?
        } else {
            return None;
        }
    } else {
        local_types
            .and_then(|types| types.get(head.as_str()))
            .cloned()
            .or_else(|| resolve_type_name(head, module_qn, state))?
    };

    for segment in rest {
        let method_name = segment.strip_suffix("()").unwrap_or(segment);
        let method_qn = format!("{current_type}.{method_name}");
        if state.registry.contains(&method_qn) {
            current_type = infer_callable_return_type(&method_qn, state)?;
        } else {
            // Walk the inheritance map for an ancestor's method.
            let inherited = state.find_inherited_method(&current_type, method_name)?;
            current_type = infer_callable_return_type(&inherited, state)?;
        }
    }

    Some(current_type)
}

/// Infer what a registered function or method returns by reading its
/// annotation or its `return X(...)` statements.
pub fn infer_callable_return_type(callable_qn: &str, state: &IndexState) -> Option<String> {
    let node_and_module = find_callable_ast(callable_qn, state)?;
    let (scope_module, file_path, class_name, callable_name) = node_and_module;
    let entry = state.ast_cache.peek(&file_path)?;
    let source = entry.source.as_str();
    let root = entry.tree.root_node();

    let func_node = find_function_node(root, source, class_name.as_deref(), &callable_name)?;

    // Annotated return type wins.
    if let Some(annotation) = field_text(func_node, "return_type", source) {
        if let Some(resolved) = resolve_type_name(annotation, &scope_module, state) {
            return Some(resolved);
        }
    }

    // `return self` keeps the receiver type.
    for ret in collect_nodes(func_node, &["return_statement"]) {
        let Some(value) = ret.child(1) else { continue };
        let text = node_text(value, source).trim().to_string();
        if text == "self" {
            if let Some(class_name) = &class_name {
                return resolve_type_name(class_name, &scope_module, state);
            }
            continue;
        }
        if let Some(base) = text.strip_suffix("()") {
            if let Some(resolved) = resolve_type_name(base, &scope_module, state) {
                if class_like(state, &resolved) {
                    return Some(resolved);
                }
            }
        }
    }
    None
}

fn find_callable_ast(
    callable_qn: &str,
    state: &IndexState,
) -> Option<(String, std::path::PathBuf, Option<String>, String)> {
    let parts: Vec<&str> = callable_qn.split('.').collect();
    if parts.len() < 2 {
        return None;
    }
    let callable_name = parts[parts.len() - 1].to_string();

    // Try `module.Class.method` first, then `module.function`.
    if parts.len() >= 3 {
        let module = parts[..parts.len() - 2].join(".");
        if let Some(path) = state.module_paths.get(&module) {
            return Some((
                module,
                path.clone(),
                Some(parts[parts.len() - 2].to_string()),
                callable_name,
            ));
        }
    }
    let module = parts[..parts.len() - 1].join(".");
    let path = state.module_paths.get(&module)?;
    Some((module, path.clone(), None, callable_name))
}

fn find_function_node<'tree>(
    root: Node<'tree>,
    source: &str,
    class_name: Option<&str>,
    function_name: &str,
) -> Option<Node<'tree>> {
    let search_root = match class_name {
        Some(class_name) => collect_nodes(root, &["class_definition"])
            .into_iter()
            .find(|c| field_text(*c, "name", source) == Some(class_name))?,
        None => root,
    };
    collect_nodes(search_root, &["function_definition"])
        .into_iter()
        .find(|f| field_text(*f, "name", source) == Some(function_name))
}

fn class_like(state: &IndexState, fqn: &str) -> bool {
    state
        .registry
        .get(fqn)
        .map(|k| k.node_label().is_class_like())
        .unwrap_or(false)
}

fn resolve_type_name(name: &str, module_qn: &str, state: &IndexState) -> Option<String> {
    let cleaned = name
        .trim()
        .trim_start_matches("Optional[")
        .trim_end_matches(']')
        .trim_matches(['"', '\''])
        .trim();
    if cleaned.is_empty() || cleaned.contains(' ') {
        return None;
    }
    resolve_class_name(state, cleaned, module_qn).or_else(|| {
        let local = format!("{module_qn}.{cleaned}");
        state.registry.contains(&local).then_some(local)
    })
}

fn enclosing_python_class(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "class_definition" => return Some(ancestor),
            "module" => return None,
            _ => current = ancestor.parent(),
        }
    }
    None
}

/// Split `a(x).b().c` into chain segments, respecting parentheses.
/// Call segments are normalized to `name()` regardless of arguments.
fn split_chain(expr: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut push = |piece: &str| {
        let piece = piece.trim();
        if piece.is_empty() {
            return;
        }
        match piece.find('(') {
            Some(open) => segments.push(format!("{}()", piece[..open].trim())),
            None => segments.push(piece.to_string()),
        }
    };
    for (i, ch) in expr.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&expr[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use crate::symbol::SymbolKind;

    fn state_with(entries: &[(&str, SymbolKind)]) -> IndexState {
        let mut state = IndexState::new();
        for (fqn, kind) in entries {
            state.registry.insert(fqn, *kind);
        }
        state
    }

    #[test]
    fn constructor_assignment_is_inferred() {
        let state = state_with(&[
            ("proj.m", SymbolKind::Module),
            ("proj.m.Widget", SymbolKind::Class),
        ]);
        let inferred = infer_expression_type("Widget()", "proj.m", None, &state);
        assert_eq!(inferred.as_deref(), Some("proj.m.Widget"));
    }

    #[test]
    fn unknown_expressions_return_none() {
        let state = state_with(&[("proj.m", SymbolKind::Module)]);
        assert_eq!(infer_expression_type("mystery()", "proj.m", None, &state), None);
        assert_eq!(infer_expression_type("", "proj.m", None, &state), None);
    }

    #[test]
    fn build_map_covers_assignments() {
        let source = "def go():\n    w = Widget()\n    w.spin()\n";
        let mut parser = crate::parsing::new_parser(Language::Python, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let state = state_with(&[
            ("proj.m", SymbolKind::Module),
            ("proj.m.Widget", SymbolKind::Class),
        ]);
        let func = collect_nodes(tree.root_node(), &["function_definition"])[0];
        let map = build_local_variable_type_map(func, source, "proj.m", &state);
        assert_eq!(map.get("w").map(String::as_str), Some("proj.m.Widget"));
    }

    #[test]
    fn self_attributes_are_keyed_by_reference() {
        let source = "class App:\n    def __init__(self):\n        self.db = Store()\n    def run(self):\n        self.db.save()\n";
        let mut parser = crate::parsing::new_parser(Language::Python, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let state = state_with(&[
            ("proj.m", SymbolKind::Module),
            ("proj.m.Store", SymbolKind::Class),
        ]);
        let funcs = collect_nodes(tree.root_node(), &["function_definition"]);
        let run = funcs
            .iter()
            .find(|f| field_text(**f, "name", source) == Some("run"))
            .unwrap();
        let map = build_local_variable_type_map(*run, source, "proj.m", &state);
        assert_eq!(map.get("self.db").map(String::as_str), Some("proj.m.Store"));
    }
}
