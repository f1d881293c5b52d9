//! Function ingestion: top-level functions, nested functions, anonymous
//! and immediately-invoked functions, Go receiver methods, and C++
//! out-of-class method definitions.

use tree_sitter::Node;

use super::{DefinitionContext, extract_decorators, extract_docstring, infer_visibility};
use crate::graph::{Ingestor, NodeLabel, NodeRef, Properties, RelKind};
use crate::parsing::ast::{
    self, collect_nodes, field_text, has_class_ancestor, lite_signature, node_text,
    parameter_names,
};
use crate::parsing::{Language, LanguageSpec};
use crate::props;
use crate::state::IndexState;
use crate::symbol::SymbolKind;

pub const IIFE_FUNC_PREFIX: &str = "iife_func_";
pub const IIFE_ARROW_PREFIX: &str = "iife_arrow_";
pub const IIFE_DIRECT_PREFIX: &str = "iife_";
pub const ANONYMOUS_PREFIX: &str = "anonymous_";
pub const LAMBDA_PREFIX: &str = "lambda_";

#[allow(clippy::too_many_arguments)]
pub fn ingest_all_functions(
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
    if spec.function_node_types.is_empty() {
        tracing::debug!("No function node types for {language}; skipping functions");
        return;
    }

    for func_node in collect_nodes(root, spec.function_node_types) {
        if has_class_ancestor(func_node, spec) {
            continue;
        }
        // Object-literal members are ingested by the JS pattern pass
        // under their object's name.
        if is_object_literal_member(func_node) {
            continue;
        }

        if language == Language::Go && func_node.kind() == "method_declaration" {
            ingest_go_receiver_method(
                func_node, source, module_qn, ctx, state, ingestor, relative_path,
            );
            continue;
        }

        if language == Language::Cpp
            && handle_cpp_out_of_class_method(
                func_node, source, module_qn, ctx, state, ingestor, relative_path,
            )
        {
            continue;
        }

        let Some((func_name, func_qn)) =
            resolve_function_identity(func_node, source, module_qn, language, spec)
        else {
            continue;
        };

        let decorators = extract_decorators(func_node, source, language);
        let params = parameter_names(func_node, source);
        let signature = lite_signature(&func_name, &params);
        let is_entry_point = detect_entry_point(&func_name, relative_path, language, &decorators);

        let mut props = props! {
            "qualified_name" => func_qn.clone(),
            "name" => func_name.clone(),
            "decorators" => decorators,
            "start_line" => func_node.start_position().row + 1,
            "end_line" => func_node.end_position().row + 1,
            "docstring" => extract_docstring(func_node, source, language),
            "signature" => signature,
            "language" => language.key(),
            "module_qn" => module_qn,
            "path" => relative_path,
            "is_entry_point" => is_entry_point,
        };
        if let Some(visibility) = infer_visibility(&func_name, language) {
            props.insert("visibility", visibility.into());
        }

        tracing::info!("Found function: {func_name} ({func_qn})");
        ingestor.ensure_node_batch(NodeLabel::Function, props);
        state.registry.insert(&func_qn, SymbolKind::Function);

        let (parent_label, parent_qn) =
            function_parent(func_node, source, module_qn, spec);
        ingestor.ensure_relationship_batch(
            NodeRef::primary(parent_label, parent_qn),
            RelKind::Defines,
            NodeRef::primary(NodeLabel::Function, func_qn.clone()),
            None,
        );

        if language == Language::Cpp && is_cpp_exported(func_node) {
            ingestor.ensure_relationship_batch(
                NodeRef::primary(NodeLabel::Module, module_qn),
                RelKind::Exports,
                NodeRef::primary(NodeLabel::Function, func_qn),
                None,
            );
        }
    }
}

/// Name + FQN for a function node, generating deterministic synthetic
/// names for anonymous functions.
fn resolve_function_identity(
    func_node: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    spec: &LanguageSpec,
) -> Option<(String, String)> {
    let mut func_name = extract_function_name(func_node, source, language, spec);

    if func_name.is_none() && language == Language::Lua {
        func_name = lua_assignment_name(func_node, source);
    }

    let func_name =
        func_name.unwrap_or_else(|| synthetic_name(func_node, language));

    let func_qn = if language == Language::Rust {
        rust_function_qn(func_node, source, module_qn, &func_name)
    } else {
        nested_function_qn(func_node, source, module_qn, &func_name, spec)
    };
    Some((func_name, func_qn))
}

fn extract_function_name(
    func_node: Node,
    source: &str,
    language: Language,
    spec: &LanguageSpec,
) -> Option<String> {
    // C and C++ put the name at the bottom of a declarator chain.
    if matches!(language, Language::C | Language::Cpp) {
        return extract_cpp_function_name(func_node, source);
    }

    if let Some(name) = field_text(func_node, spec.name_field, source) {
        return Some(name.to_string());
    }

    // `const f = () => {}` takes the declarator's name.
    if func_node.kind() == "arrow_function" || func_node.kind() == "function_expression" {
        let mut current = func_node.parent();
        while let Some(node) = current {
            if node.kind() == "variable_declarator" {
                if let Some(name) = field_text(node, "name", source) {
                    return Some(name.to_string());
                }
            }
            if matches!(node.kind(), "statement_block" | "program") {
                break;
            }
            current = node.parent();
        }
    }

    None
}

/// Synthetic deterministic names derived from kind and position.
fn synthetic_name(func_node: Node, language: Language) -> String {
    let row = func_node.start_position().row;
    let col = func_node.start_position().column;

    if language == Language::Cpp && func_node.kind() == "lambda_expression" {
        return format!("{LAMBDA_PREFIX}{row}_{col}");
    }

    if let Some(parent) = func_node.parent() {
        if parent.kind() == "parenthesized_expression" {
            if let Some(grandparent) = parent.parent() {
                if grandparent.kind() == "call_expression"
                    && grandparent.child_by_field_name("function") == Some(parent)
                {
                    let prefix = if func_node.kind() == "arrow_function" {
                        IIFE_ARROW_PREFIX
                    } else {
                        IIFE_FUNC_PREFIX
                    };
                    return format!("{prefix}{row}_{col}");
                }
            }
        }
        if parent.kind() == "call_expression"
            && parent.child_by_field_name("function") == Some(func_node)
        {
            return format!("{IIFE_DIRECT_PREFIX}{row}_{col}");
        }
    }

    format!("{ANONYMOUS_PREFIX}{row}_{col}")
}

fn is_object_literal_member(func_node: Node) -> bool {
    match func_node.parent() {
        Some(parent) if parent.kind() == "object" => true,
        Some(parent) if parent.kind() == "pair" => parent
            .parent()
            .is_some_and(|grandparent| grandparent.kind() == "object"),
        _ => false,
    }
}

/// Lua `M.fn = function() ... end` takes the assigned name.
fn lua_assignment_name(func_node: Node, source: &str) -> Option<String> {
    let mut current = func_node.parent();
    while let Some(node) = current {
        match node.kind() {
            "assignment_statement" | "variable_declaration" | "local_variable_declaration" => {
                let target = collect_nodes(node, &["dot_index_expression", "identifier"])
                    .into_iter()
                    .find(|n| n.start_byte() < func_node.start_byte())?;
                let name = node_text(target, source).trim().to_string();
                return (!name.is_empty()).then_some(name);
            }
            "chunk" => return None,
            _ => current = node.parent(),
        }
    }
    None
}

/// FQN via enclosing function names (nested closures).
fn nested_function_qn(
    func_node: Node,
    source: &str,
    module_qn: &str,
    func_name: &str,
    spec: &LanguageSpec,
) -> String {
    let mut path_parts: Vec<String> = Vec::new();
    let mut current = func_node.parent();
    while let Some(node) = current {
        if spec.is_module_node(node.kind()) {
            break;
        }
        if spec.is_function_node(node.kind()) {
            if let Some(name) = field_text(node, spec.name_field, source) {
                path_parts.push(name.to_string());
            }
        }
        current = node.parent();
    }
    path_parts.reverse();

    if path_parts.is_empty() {
        format!("{module_qn}.{func_name}")
    } else {
        format!("{module_qn}.{}.{func_name}", path_parts.join("."))
    }
}

/// Rust FQN accounts for inline `mod` blocks between file and item.
fn rust_function_qn(func_node: Node, source: &str, module_qn: &str, func_name: &str) -> String {
    let mut mod_parts: Vec<String> = Vec::new();
    let mut current = func_node.parent();
    while let Some(node) = current {
        if node.kind() == "mod_item" {
            if let Some(name) = field_text(node, "name", source) {
                mod_parts.push(name.to_string());
            }
        }
        current = node.parent();
    }
    mod_parts.reverse();

    if mod_parts.is_empty() {
        format!("{module_qn}.{func_name}")
    } else {
        format!("{module_qn}.{}.{func_name}", mod_parts.join("."))
    }
}

/// The DEFINES source: the nearest named enclosing function, else the
/// module.
fn function_parent(
    func_node: Node,
    source: &str,
    module_qn: &str,
    spec: &LanguageSpec,
) -> (NodeLabel, String) {
    let mut current = func_node.parent();
    while let Some(node) = current {
        if spec.is_module_node(node.kind()) {
            break;
        }
        if spec.is_function_node(node.kind()) {
            if let Some(name) = field_text(node, spec.name_field, source) {
                let parent_qn = nested_function_qn(node, source, module_qn, name, spec);
                return (NodeLabel::Function, parent_qn);
            }
            break;
        }
        current = node.parent();
    }
    (NodeLabel::Module, module_qn.to_string())
}

/// Go: `func (r *Recv) Name(...)` attaches to the receiver type.
fn ingest_go_receiver_method(
    func_node: Node,
    source: &str,
    module_qn: &str,
    _ctx: &DefinitionContext,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) {
    let Some(name) = field_text(func_node, "name", source) else {
        return;
    };
    let receiver_type = func_node
        .child_by_field_name("receiver")
        .and_then(|recv| {
            collect_nodes(recv, &["type_identifier"])
                .first()
                .map(|n| node_text(*n, source).to_string())
        });
    let Some(receiver_type) = receiver_type else {
        return;
    };

    let class_qn = format!("{module_qn}.{receiver_type}");
    let method_qn = format!("{class_qn}.{name}");
    let params = parameter_names(func_node, source);

    let mut props = method_props(name, &method_qn, func_node, &params, relative_path);
    if let Some(visibility) = infer_visibility(name, Language::Go) {
        props.insert("visibility", visibility.into());
    }
    tracing::info!("Found method: {name} ({method_qn})");
    ingestor.ensure_node_batch(NodeLabel::Method, props);
    state.registry.insert(&method_qn, SymbolKind::Method);

    ingestor.ensure_relationship_batch(
        NodeRef::primary(NodeLabel::Class, class_qn),
        RelKind::DefinesMethod,
        NodeRef::primary(NodeLabel::Method, method_qn),
        None,
    );
}

/// C++: `void Class::method() { ... }` attaches to the class.
fn handle_cpp_out_of_class_method(
    func_node: Node,
    source: &str,
    module_qn: &str,
    _ctx: &DefinitionContext,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    relative_path: &str,
) -> bool {
    let Some(raw_name) = extract_cpp_function_name(func_node, source) else {
        return false;
    };
    let Some((class_part, method_name)) = raw_name.rsplit_once("::") else {
        return false;
    };
    let class_normalized = class_part.replace("::", ".");
    let class_qn = format!("{module_qn}.{class_normalized}");
    let method_qn = format!("{class_qn}.{method_name}");
    let params = parameter_names(func_node, source);

    tracing::info!("Found method: {method_name} ({method_qn})");
    ingestor.ensure_node_batch(
        NodeLabel::Method,
        method_props(method_name, &method_qn, func_node, &params, relative_path),
    );
    state.registry.insert(&method_qn, SymbolKind::Method);
    ingestor.ensure_relationship_batch(
        NodeRef::primary(NodeLabel::Class, class_qn),
        RelKind::DefinesMethod,
        NodeRef::primary(NodeLabel::Method, method_qn),
        None,
    );
    true
}

fn method_props(
    name: &str,
    method_qn: &str,
    node: Node,
    params: &[String],
    relative_path: &str,
) -> Properties {
    props! {
        "qualified_name" => method_qn,
        "name" => name,
        "decorators" => Vec::<String>::new(),
        "start_line" => node.start_position().row + 1,
        "end_line" => node.end_position().row + 1,
        "signature" => lite_signature(name, params),
        "path" => relative_path,
    }
}

/// Descend the C++ declarator chain to the declared name. A qualified
/// name (`Class::method`) is returned whole; operators get their
/// word-form name.
pub fn extract_cpp_function_name(func_node: Node, source: &str) -> Option<String> {
    let mut declarator = func_node.child_by_field_name("declarator")?;
    loop {
        match declarator.kind() {
            "function_declarator" => {
                declarator = declarator.child_by_field_name("declarator")?;
            }
            "pointer_declarator" | "reference_declarator" => {
                let mut found = None;
                for i in 0..declarator.child_count() {
                    if let Some(child) = declarator.child(i as u32) {
                        if child.is_named() {
                            found = Some(child);
                        }
                    }
                }
                declarator = found?;
            }
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name" => {
                return Some(node_text(declarator, source).to_string());
            }
            "operator_name" => {
                return Some(cpp_operator_word(node_text(declarator, source)));
            }
            _ => return None,
        }
    }
}

/// `operator+` -> `operator_plus`, etc.
pub fn cpp_operator_word(operator_text: &str) -> String {
    let symbol = operator_text.trim_start_matches("operator").trim();
    let word = match symbol {
        "+" => "plus",
        "-" => "minus",
        "*" => "star",
        "/" => "slash",
        "%" => "percent",
        "==" => "equals",
        "!=" => "not_equals",
        "<" => "less",
        ">" => "greater",
        "<=" => "less_equals",
        ">=" => "greater_equals",
        "<<" => "shift_left",
        ">>" => "shift_right",
        "()" => "call",
        "[]" => "index",
        "=" => "assign",
        "+=" => "plus_assign",
        "-=" => "minus_assign",
        "++" => "increment",
        "--" => "decrement",
        _ => return format!("operator_{}", symbol.replace(|c: char| !c.is_alphanumeric(), "_")),
    };
    format!("operator_{word}")
}

pub(crate) fn is_cpp_exported(func_node: Node) -> bool {
    let mut current = func_node.parent();
    while let Some(node) = current {
        if node.kind() == "export_declaration" {
            return true;
        }
        if node.kind() == "translation_unit" {
            return false;
        }
        current = node.parent();
    }
    false
}

/// Entry-point heuristic per language.
fn detect_entry_point(
    name: &str,
    relative_path: &str,
    language: Language,
    decorators: &[String],
) -> bool {
    let lowered = name.to_lowercase();
    let file_name = relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
        .to_lowercase();

    match language {
        Language::Python => {
            if lowered == "main" {
                return true;
            }
            decorators.iter().any(|d| {
                let d = d.to_lowercase();
                d.starts_with("@app.")
                    || d.starts_with("@router.")
                    || d.starts_with("@blueprint.")
                    || d.starts_with("@bp.")
                    || d.starts_with("@api.")
            })
        }
        Language::JavaScript | Language::TypeScript => {
            lowered == "main"
                || matches!(
                    file_name.as_str(),
                    "index.js" | "index.ts" | "main.js" | "main.ts" | "app.js" | "app.ts"
                )
        }
        Language::Java | Language::Go | Language::Rust | Language::C | Language::Cpp => {
            lowered == "main"
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_words() {
        assert_eq!(cpp_operator_word("operator+"), "operator_plus");
        assert_eq!(cpp_operator_word("operator=="), "operator_equals");
        assert_eq!(cpp_operator_word("operator[]"), "operator_index");
    }

    #[test]
    fn entry_points() {
        assert!(detect_entry_point("main", "app.py", Language::Python, &[]));
        assert!(detect_entry_point(
            "handler",
            "views.py",
            Language::Python,
            &["@app.route('/x')".to_string()]
        ));
        assert!(detect_entry_point("anything", "index.js", Language::JavaScript, &[]));
        assert!(!detect_entry_point("helper", "util.go", Language::Go, &[]));
    }

    #[test]
    fn synthetic_names_are_deterministic() {
        let source = "(function() { return 1; })();\n";
        let mut parser = crate::parsing::new_parser(Language::JavaScript, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let funcs = ast::collect_nodes(tree.root_node(), &["function_expression"]);
        assert_eq!(funcs.len(), 1);
        let name = synthetic_name(funcs[0], Language::JavaScript);
        assert!(name.starts_with(IIFE_FUNC_PREFIX), "got {name}");
    }
}
