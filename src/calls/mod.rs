//! Call processor: walks every call site in every cached AST, asks the
//! resolver for a target, and emits CALLS edges.

pub mod builtins;
pub mod dynamic;
pub mod resolver;

use std::path::Path;

use tree_sitter::Node;

use crate::definitions::functions::{IIFE_ARROW_PREFIX, IIFE_FUNC_PREFIX, cpp_operator_word};
use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind};
use crate::parsing::ast::{collect_nodes, field_text, has_class_ancestor, node_text};
use crate::parsing::{Language, LanguageSpec, fqn, language_spec};
use crate::props;
use crate::state::IndexState;
use crate::symbol::SymbolKind;
use crate::typeinf::{self, LocalTypes};

pub use resolver::{CallResolver, import_distance};

/// Behavior toggles for the call pass, straight from the settings.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub heuristic_calls_enabled: bool,
    pub placeholder_nodes_enabled: bool,
}

pub struct CallProcessor<'a> {
    pub project_name: &'a str,
    pub options: CallOptions,
}

impl<'a> CallProcessor<'a> {
    pub fn new(project_name: &'a str, options: CallOptions) -> Self {
        Self {
            project_name,
            options,
        }
    }

    /// Process every call site in one cached file.
    pub fn process_calls_in_file(
        &self,
        file_path: &Path,
        relative_path: &Path,
        state: &IndexState,
        ingestor: &mut dyn Ingestor,
    ) {
        let Some(entry) = state.ast_cache.peek(file_path) else {
            return;
        };
        let language = entry.language;
        let spec = language_spec(language);
        if spec.call_node_types.is_empty() {
            tracing::debug!("No call node types for {language}; skipping calls");
            return;
        }
        let source = entry.source.as_str();
        let root = entry.tree.root_node();
        let module_qn = fqn::module_qualified_name(self.project_name, relative_path, language);

        tracing::debug!("Processing calls in {}", relative_path.display());

        self.process_function_scopes(root, source, &module_qn, language, spec, state, ingestor);
        self.process_class_scopes(root, source, &module_qn, language, spec, state, ingestor);
        self.process_module_scope(root, source, &module_qn, language, spec, state, ingestor);
    }

    /// Calls inside top-level (non-method) functions.
    #[allow(clippy::too_many_arguments)]
    fn process_function_scopes(
        &self,
        root: Node,
        source: &str,
        module_qn: &str,
        language: Language,
        spec: &LanguageSpec,
        state: &IndexState,
        ingestor: &mut dyn Ingestor,
    ) {
        for func_node in collect_nodes(root, spec.function_node_types) {
            if has_class_ancestor(func_node, spec) {
                continue;
            }
            let Some(func_name) = function_name(func_node, source, language, spec) else {
                continue;
            };
            let func_qn = nested_caller_qn(func_node, source, module_qn, &func_name, spec);
            self.ingest_calls_in_scope(
                func_node,
                source,
                &func_qn,
                NodeLabel::Function,
                module_qn,
                language,
                spec,
                None,
                state,
                ingestor,
            );
        }
    }

    /// Calls inside class methods, with the class as context.
    #[allow(clippy::too_many_arguments)]
    fn process_class_scopes(
        &self,
        root: Node,
        source: &str,
        module_qn: &str,
        language: Language,
        spec: &LanguageSpec,
        state: &IndexState,
        ingestor: &mut dyn Ingestor,
    ) {
        for class_node in collect_nodes(root, spec.class_node_types) {
            let class_name = if language == Language::Rust && class_node.kind() == "impl_item" {
                field_text(class_node, "type", source).map(|t| strip_generics(t).to_string())
            } else {
                field_text(class_node, spec.name_field, source).map(String::from)
            };
            let Some(class_name) = class_name else {
                continue;
            };
            let class_qn = format!("{module_qn}.{class_name}");
            let body = class_node
                .child_by_field_name(spec.body_field)
                .unwrap_or(class_node);
            for method_node in collect_nodes(body, spec.function_node_types) {
                if !crate::definitions::classes::is_direct_method(method_node, class_node, spec) {
                    continue;
                }
                let method_name = match language {
                    Language::Cpp => {
                        crate::definitions::functions::extract_cpp_function_name(
                            method_node,
                            source,
                        )
                    }
                    _ => field_text(method_node, spec.name_field, source).map(String::from),
                };
                let Some(method_name) = method_name else {
                    continue;
                };
                let method_qn = format!("{class_qn}.{method_name}");
                self.ingest_calls_in_scope(
                    method_node,
                    source,
                    &method_qn,
                    NodeLabel::Method,
                    module_qn,
                    language,
                    spec,
                    Some(&class_qn),
                    state,
                    ingestor,
                );
            }
        }
    }

    /// Calls in module scope: call sites with no enclosing function or
    /// class.
    #[allow(clippy::too_many_arguments)]
    fn process_module_scope(
        &self,
        root: Node,
        source: &str,
        module_qn: &str,
        language: Language,
        spec: &LanguageSpec,
        state: &IndexState,
        ingestor: &mut dyn Ingestor,
    ) {
        let local_types =
            typeinf::build_local_variable_type_map(root, source, module_qn, language, state);
        for call_node in collect_nodes(root, spec.call_node_types) {
            if !is_module_level(call_node, spec) {
                continue;
            }
            self.resolve_and_emit(
                call_node,
                source,
                module_qn,
                NodeLabel::Module,
                module_qn,
                language,
                None,
                &local_types,
                state,
                ingestor,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn ingest_calls_in_scope(
        &self,
        caller_node: Node,
        source: &str,
        caller_qn: &str,
        caller_label: NodeLabel,
        module_qn: &str,
        language: Language,
        spec: &LanguageSpec,
        class_context: Option<&str>,
        state: &IndexState,
        ingestor: &mut dyn Ingestor,
    ) {
        let local_types =
            typeinf::build_local_variable_type_map(caller_node, source, module_qn, language, state);
        let call_nodes = collect_nodes(caller_node, spec.call_node_types);
        tracing::debug!(
            "Found {} call sites in {caller_qn} ({language})",
            call_nodes.len()
        );
        for call_node in call_nodes {
            self.resolve_and_emit(
                call_node,
                source,
                caller_qn,
                caller_label,
                module_qn,
                language,
                class_context,
                &local_types,
                state,
                ingestor,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_and_emit(
        &self,
        call_node: Node,
        source: &str,
        caller_qn: &str,
        caller_label: NodeLabel,
        module_qn: &str,
        language: Language,
        class_context: Option<&str>,
        local_types: &LocalTypes,
        state: &IndexState,
        ingestor: &mut dyn Ingestor,
    ) {
        let Some(call_name) = call_target_name(call_node, source, language) else {
            return;
        };
        let resolver = CallResolver::new(state);

        let mut callee = if language == Language::Java && call_node.kind() == "method_invocation" {
            typeinf::java::resolve_java_method_call(
                call_node,
                source,
                module_qn,
                local_types,
                class_context,
                state,
            )
        } else {
            resolver.resolve(&call_name, module_qn, Some(local_types), class_context)
        };

        if callee.is_none() && self.options.heuristic_calls_enabled {
            callee = dynamic::resolve_from_snippet(state, node_text(call_node, source), module_qn);
        }
        if callee.is_none() {
            callee = builtins::resolve_builtin_call(&call_name);
        }
        if callee.is_none() {
            callee = resolver.resolve_cpp_operator_call(&call_name, module_qn);
        }
        if callee.is_none() && self.options.placeholder_nodes_enabled {
            callee = Some(self.ensure_placeholder_function(&call_name, ingestor));
        }
        let Some((kind, callee_qn)) = callee else {
            return;
        };

        // Constructor calls land on a class; redirect to the registered
        // constructor method when one exists, otherwise skip the edge.
        let (kind, callee_qn) = if kind.node_label().is_class_like() {
            let Some(redirected) = constructor_method(state, &callee_qn, language) else {
                return;
            };
            redirected
        } else {
            (kind, callee_qn)
        };

        let callee_label = match kind {
            SymbolKind::Method => NodeLabel::Method,
            _ => NodeLabel::Function,
        };
        if callee_qn.starts_with(builtins::BUILTIN_PREFIX) {
            ingestor.ensure_node_batch(
                callee_label,
                props! {
                    "qualified_name" => callee_qn.clone(),
                    "name" => callee_qn.rsplit('.').next().unwrap_or(&callee_qn).to_string(),
                    "is_external" => true,
                },
            );
        }

        tracing::debug!("Call: {caller_qn} -> {callee_qn} ({call_name})");
        ingestor.ensure_relationship_batch(
            NodeRef::primary(caller_label, caller_qn),
            RelKind::Calls,
            NodeRef::primary(callee_label, callee_qn),
            None,
        );
    }

    /// Placeholder Function node for an unresolved call, under the
    /// project's synthetic framework namespace.
    fn ensure_placeholder_function(
        &self,
        call_name: &str,
        ingestor: &mut dyn Ingestor,
    ) -> (SymbolKind, String) {
        let mut normalized: String = call_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        normalized = normalized.trim_matches('_').to_string();
        if normalized.is_empty() {
            normalized = "unknown_call".to_string();
        }
        let placeholder_qn = format!("{}.framework.{normalized}", self.project_name);
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {
                "qualified_name" => placeholder_qn.clone(),
                "name" => call_name,
                "decorators" => Vec::<String>::new(),
                "is_external" => true,
                "is_placeholder" => true,
            },
        );
        (SymbolKind::Function, placeholder_qn)
    }
}

/// True when no function or class node sits above the call.
fn is_module_level(call_node: Node, spec: &LanguageSpec) -> bool {
    let mut current = call_node.parent();
    while let Some(node) = current {
        if spec.is_function_node(node.kind()) || spec.is_class_node(node.kind()) {
            return false;
        }
        if spec.is_module_node(node.kind()) {
            return true;
        }
        current = node.parent();
    }
    true
}

/// Extract the target name from a call node, per language shape.
pub fn call_target_name(call_node: Node, source: &str, language: Language) -> Option<String> {
    if let Some(func_child) = call_node.child_by_field_name("function") {
        match func_child.kind() {
            "identifier" | "attribute" | "member_expression" | "qualified_identifier"
            | "scoped_identifier" | "name" | "qualified_name" => {
                return Some(
                    node_text(func_child, source)
                        .replace("::", ".")
                        .replace('\\', "."),
                );
            }
            "field_expression" => {
                // C++ `obj.method(...)` / `obj->method(...)` takes the
                // field; Rust `obj.method(...)` keeps the whole path.
                if language == Language::Cpp {
                    let field = func_child.child_by_field_name("field")?;
                    return Some(node_text(field, source).to_string());
                }
                return Some(node_text(func_child, source).to_string());
            }
            "parenthesized_expression" => {
                return iife_target_name(func_child);
            }
            _ => {}
        }
    }

    match call_node.kind() {
        // C++ operator overloads appear as plain expressions.
        "binary_expression" | "unary_expression" | "update_expression" => {
            let operator = call_node.child_by_field_name("operator")?;
            return Some(cpp_operator_word(&format!(
                "operator{}",
                node_text(operator, source)
            )));
        }
        // Java `obj.method(args)`.
        "method_invocation" => {
            let name = field_text(call_node, "name", source)?;
            return match call_node.child_by_field_name("object") {
                Some(object) => Some(format!("{}.{name}", node_text(object, source))),
                None => Some(name.to_string()),
            };
        }
        // JS `new C()` / Java `new C()`.
        "new_expression" | "object_creation_expression" => {
            let constructor = call_node
                .child_by_field_name("constructor")
                .or_else(|| call_node.child_by_field_name("type"))?;
            return Some(node_text(constructor, source).to_string());
        }
        // Lua `m.f(...)` / `obj:method(...)`.
        "function_call" => {
            let head = call_node.child(0)?;
            return Some(node_text(head, source).replace(':', "."));
        }
        // Ruby `obj.method(args)` and bare `method(args)`.
        "call" if language == Language::Ruby => {
            let method = field_text(call_node, "method", source)?;
            return match call_node.child_by_field_name("receiver") {
                Some(receiver) => Some(format!(
                    "{}.{method}",
                    node_text(receiver, source).replace("::", ".")
                )),
                None => Some(method.to_string()),
            };
        }
        // PHP `$obj->method(...)` / `Scope::method(...)`.
        "member_call_expression" | "scoped_call_expression" => {
            let name = field_text(call_node, "name", source)?;
            let object = call_node
                .child_by_field_name("object")
                .or_else(|| call_node.child_by_field_name("scope"));
            return match object {
                Some(object) => Some(format!(
                    "{}.{name}",
                    node_text(object, source).replace('\\', ".")
                )),
                None => Some(name.to_string()),
            };
        }
        _ => {}
    }

    field_text(call_node, "name", source).map(String::from)
}

/// Synthetic target name for `(function(){...})()`.
fn iife_target_name(parenthesized: Node) -> Option<String> {
    for i in 0..parenthesized.child_count() {
        let Some(child) = parenthesized.child(i as u32) else {
            continue;
        };
        let row = child.start_position().row;
        let col = child.start_position().column;
        match child.kind() {
            "function_expression" => return Some(format!("{IIFE_FUNC_PREFIX}{row}_{col}")),
            "arrow_function" => return Some(format!("{IIFE_ARROW_PREFIX}{row}_{col}")),
            _ => {}
        }
    }
    None
}

fn function_name(
    func_node: Node,
    source: &str,
    language: Language,
    spec: &LanguageSpec,
) -> Option<String> {
    match language {
        Language::C | Language::Cpp => {
            crate::definitions::functions::extract_cpp_function_name(func_node, source)
        }
        _ => field_text(func_node, spec.name_field, source).map(String::from),
    }
}

fn nested_caller_qn(
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

/// The constructor method registered for a class, per language
/// convention: `__init__` (Python), `constructor` (JS/TS), `new`
/// (Rust/Lua), or the class's own simple name (Java/C++/C#).
fn constructor_method(
    state: &IndexState,
    class_qn: &str,
    language: Language,
) -> Option<(SymbolKind, String)> {
    let simple = class_qn.rsplit('.').next().unwrap_or(class_qn);
    let candidates: &[&str] = match language {
        Language::Python => &["__init__"],
        Language::JavaScript | Language::TypeScript => &["constructor"],
        Language::Rust | Language::Lua => &["new"],
        _ => &[],
    };
    for candidate in candidates {
        let qn = format!("{class_qn}.{candidate}");
        if let Some(kind) = state.registry.get(&qn) {
            return Some((kind, qn));
        }
    }
    let own_name = format!("{class_qn}.{simple}");
    state.registry.get(&own_name).map(|kind| (kind, own_name))
}

fn strip_generics(name: &str) -> &str {
    match name.find('<') {
        Some(idx) => name[..idx].trim(),
        None => name.trim(),
    }
}
