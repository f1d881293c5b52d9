//! AST traversal helpers shared by all processors.

use tree_sitter::Node;

use super::LanguageSpec;

/// Decode the source text covered by a node.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// Text of a named child field, if present.
pub fn field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source))
        .filter(|text| !text.is_empty())
}

/// Collect every descendant (including `root`) whose kind is in `kinds`.
///
/// Iterative traversal; results come back in document order.
pub fn collect_nodes<'tree>(root: Node<'tree>, kinds: &[&str]) -> Vec<Node<'tree>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if kinds.contains(&node.kind()) {
            out.push(node);
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i as u32) {
                stack.push(child);
            }
        }
    }
    out.sort_by_key(|n| n.start_byte());
    out
}

/// Error-tolerant sub-roots for a possibly broken parse.
///
/// A clean tree yields just the root. When the tree contains ERROR
/// nodes, descend through each one to its non-error descendants and
/// return those alongside the root, so definitions outside the error
/// region are still captured.
pub fn error_tolerant_roots(root: Node<'_>) -> Vec<Node<'_>> {
    if !root.has_error() {
        return vec![root];
    }

    let mut roots = vec![root];
    for i in 0..root.child_count() {
        if let Some(child) = root.child(i as u32) {
            flatten_error_nodes(child, &mut roots);
        }
    }

    let mut seen = std::collections::HashSet::new();
    roots.retain(|node| seen.insert(node.id()));
    roots
}

fn flatten_error_nodes<'tree>(node: Node<'tree>, out: &mut Vec<Node<'tree>>) {
    if node.kind() != "ERROR" {
        out.push(node);
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            flatten_error_nodes(child, out);
        }
    }
}

/// True when the node has a class-like ancestor before the module
/// boundary. Used to classify function nodes as methods.
pub fn has_class_ancestor(node: Node, spec: &LanguageSpec) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if spec.is_module_node(ancestor.kind()) {
            return false;
        }
        if spec.is_class_node(ancestor.kind()) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

/// The nearest class-like ancestor, if any, before the module boundary.
pub fn enclosing_class<'tree>(node: Node<'tree>, spec: &LanguageSpec) -> Option<Node<'tree>> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if spec.is_module_node(ancestor.kind()) {
            return None;
        }
        if spec.is_class_node(ancestor.kind()) {
            return Some(ancestor);
        }
        current = ancestor.parent();
    }
    None
}

/// Parameter names from a function node's parameter list.
///
/// Works across grammars: tries the common field names, falling back to
/// identifier-like children.
pub fn parameter_names(func_node: Node, source: &str) -> Vec<String> {
    let params_node = func_node
        .child_by_field_name("parameters")
        .or_else(|| func_node.child_by_field_name("params"));
    let Some(params) = params_node else {
        return Vec::new();
    };

    let mut names = Vec::new();
    for i in 0..params.child_count() {
        let Some(child) = params.child(i as u32) else {
            continue;
        };
        let candidate = child
            .child_by_field_name("name")
            .or_else(|| child.child_by_field_name("pattern"))
            .map(|n| node_text(n, source).to_string())
            .or_else(|| {
                matches!(
                    child.kind(),
                    "identifier"
                        | "variable_name"
                        | "parameter"
                        | "required_parameter"
                        | "optional_parameter"
                        | "default_parameter"
                        | "typed_parameter"
                        | "typed_default_parameter"
                        | "rest_parameter"
                        | "formal_parameter"
                        | "simple_parameter"
                )
                .then(|| node_text(child, source).to_string())
            });
        if let Some(name) = candidate {
            if !name.is_empty() {
                names.push(name);
            }
        }
    }
    names
}

/// Minimal display signature: `name(a, b)`.
pub fn lite_signature(name: &str, params: &[String]) -> String {
    if params.is_empty() {
        format!("{name}()")
    } else {
        format!("{name}({})", params.join(", "))
    }
}
