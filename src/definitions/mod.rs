//! Definition processor: per-file AST walk that emits Module, Class,
//! Function, and Method nodes with their DEFINES / DEFINES_METHOD /
//! INHERITS / IMPLEMENTS edges, and registers every definition in the
//! symbol registry.

pub mod classes;
pub mod functions;
pub mod js_patterns;
pub mod signature;

use std::path::Path;

use crate::error::{IndexError, IndexResult};
use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind};
use crate::imports::{ImportEnv, ImportSink, parse_imports};
use crate::parsing::{Language, ast, fqn, language_spec, new_parser};
use crate::paths::{content_hash, is_test_path, to_posix};
use crate::props;
use crate::state::IndexState;
use crate::structure::StructureProcessor;
use crate::symbol::SymbolKind;

pub use signature::compute_structure_signature;

/// Read-only facts shared by all definition ingestion.
pub struct DefinitionContext<'a> {
    pub repo_path: &'a Path,
    pub project_name: &'a str,
}

/// A file parsed ahead of time (by the worker pool or the selective
/// updater), handed over so it is not parsed twice.
pub struct ParsedSource {
    pub tree: tree_sitter::Tree,
    pub source: String,
    pub structure_signature: Option<String>,
}

/// Parse one file and ingest every definition in it.
///
/// On success the AST moves into the state's cache and the computed
/// structural signature is returned. A parse failure returns an error;
/// the caller decides whether strict mode aborts the run.
pub fn process_file(
    file_path: &Path,
    language: Language,
    ctx: &DefinitionContext,
    structure: &StructureProcessor,
    state: &mut IndexState,
    ingestor: &mut dyn Ingestor,
    pre_parsed: Option<ParsedSource>,
) -> IndexResult<String> {
    let relative = file_path
        .strip_prefix(ctx.repo_path)
        .unwrap_or(file_path)
        .to_path_buf();
    let relative_str = to_posix(&relative);
    tracing::info!("Parsing {} file: {relative_str}", language.name());

    let parsed = match pre_parsed {
        Some(parsed) => parsed,
        None => {
            let bytes = std::fs::read(file_path)
                .map_err(|e| IndexError::file_read(file_path, e))?;
            let source = String::from_utf8_lossy(&bytes).into_owned();
            let mut parser = new_parser(language, Some(file_path)).map_err(|e| {
                IndexError::ParseFailure {
                    path: file_path.to_path_buf(),
                    language: language.name().to_string(),
                    reason: e.to_string(),
                }
            })?;
            let tree = parser
                .parse(&source, None)
                .ok_or_else(|| IndexError::ParseFailure {
                    path: file_path.to_path_buf(),
                    language: language.name().to_string(),
                    reason: "parser produced no tree".to_string(),
                })?;
            ParsedSource {
                tree,
                source,
                structure_signature: None,
            }
        }
    };

    let ParsedSource {
        tree,
        source,
        structure_signature,
    } = parsed;
    let spec = language_spec(language);
    let root = tree.root_node();
    let file_hash = content_hash(source.as_bytes());

    let module_qn = fqn::module_qualified_name(ctx.project_name, &relative, language);
    state
        .module_paths
        .insert(module_qn.clone(), file_path.to_path_buf());
    state
        .module_hashes
        .insert(module_qn.clone(), file_hash.clone());

    // Module node, registered before anything that hangs off it.
    let parent_qn = module_qn
        .rsplit_once('.')
        .map(|(head, _)| head.to_string())
        .unwrap_or_else(|| ctx.project_name.to_string());
    ingestor.ensure_node_batch(
        NodeLabel::Module,
        props! {
            "qualified_name" => module_qn.clone(),
            "name" => file_path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string(),
            "path" => relative_str.clone(),
            "language" => language.key(),
            "parent_qn" => parent_qn,
            "file_hash" => file_hash,
            "is_test" => is_test_path(&relative),
        },
    );
    state.registry.insert(&module_qn, SymbolKind::Module);

    let parent_rel = relative.parent().map(Path::to_path_buf).unwrap_or_default();
    ingestor.ensure_relationship_batch(
        structure.parent_ref(&parent_rel),
        RelKind::ContainsModule,
        NodeRef::primary(NodeLabel::Module, module_qn.clone()),
        None,
    );
    ingestor.ensure_relationship_batch(
        NodeRef::new(NodeLabel::File, "path", relative_str.clone()),
        RelKind::ContainsModule,
        NodeRef::primary(NodeLabel::Module, module_qn.clone()),
        None,
    );

    // Imports before definitions: class parents resolve through the map.
    {
        let env = ImportEnv {
            repo_path: ctx.repo_path,
            project_name: ctx.project_name,
            module_qn: &module_qn,
            language,
        };
        let map = state.imports.entry(module_qn.clone()).or_default();
        let mut sink = ImportSink {
            map,
            externals: &mut state.external_modules,
            ingestor,
        };
        parse_imports(root, &source, &env, &mut sink);
    }

    // Definitions, descending through ERROR regions where needed.
    for safe_root in ast::error_tolerant_roots(root) {
        functions::ingest_all_functions(
            safe_root, &source, &module_qn, language, spec, ctx, state, ingestor, &relative_str,
        );
        classes::ingest_classes_and_methods(
            safe_root, &source, &module_qn, language, spec, ctx, state, ingestor, &relative_str,
        );
        if matches!(language, Language::JavaScript | Language::TypeScript) {
            js_patterns::ingest_js_patterns(
                safe_root, &source, &module_qn, language, ctx, state, ingestor, &relative_str,
            );
        }
    }

    let signature = structure_signature_or_compute(structure_signature, root, &source, language);

    state
        .ast_cache
        .insert(file_path.to_path_buf(), tree, source, language, Some(signature.clone()));

    Ok(signature)
}

fn structure_signature_or_compute(
    precomputed: Option<String>,
    root: tree_sitter::Node,
    source: &str,
    language: Language,
) -> String {
    precomputed.unwrap_or_else(|| compute_structure_signature(root, source, language))
}

/// Python docstring: the first string expression of a definition body.
/// Other languages have no docstring convention the engine extracts.
pub fn extract_docstring(node: tree_sitter::Node, source: &str, language: Language) -> Option<String> {
    if language != Language::Python {
        return None;
    }
    let body = node.child_by_field_name("body")?;
    let first = body.child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.child(0)?;
    if string_node.kind() != "string" {
        return None;
    }
    let raw = ast::node_text(string_node, source).trim();
    let without_prefix =
        raw.trim_start_matches(|c: char| matches!(c, 'r' | 'b' | 'f' | 'u' | 'R' | 'B' | 'F' | 'U'));
    Some(
        without_prefix
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_string(),
    )
}

/// Decorator / annotation names attached to a definition node.
pub fn extract_decorators(node: tree_sitter::Node, source: &str, language: Language) -> Vec<String> {
    match language {
        Language::Python => {
            let Some(parent) = node.parent() else {
                return Vec::new();
            };
            if parent.kind() != "decorated_definition" {
                return Vec::new();
            }
            ast::collect_nodes(parent, &["decorator"])
                .iter()
                .map(|d| ast::node_text(*d, source).trim().to_string())
                .collect()
        }
        Language::Java | Language::CSharp | Language::Scala => {
            let mut out = Vec::new();
            for i in 0..node.child_count() {
                let Some(child) = node.child(i as u32) else { continue };
                if matches!(child.kind(), "modifiers" | "attribute_list" | "annotation") {
                    for ann in ast::collect_nodes(
                        child,
                        &["marker_annotation", "annotation", "attribute"],
                    ) {
                        out.push(ast::node_text(ann, source).trim().to_string());
                    }
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Leading-underscore privacy for Python, case-based visibility for Go.
pub fn infer_visibility(name: &str, language: Language) -> Option<&'static str> {
    match language {
        Language::Python => {
            if name.starts_with('_') && !name.starts_with("__") {
                Some("private")
            } else {
                Some("public")
            }
        }
        Language::Go => {
            let first = name.chars().next()?;
            if first.is_uppercase() {
                Some("public")
            } else {
                Some("private")
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::new_parser;

    #[test]
    fn python_docstring_extraction() {
        let source = "def f():\n    \"\"\"Does things.\"\"\"\n    pass\n";
        let mut parser = new_parser(Language::Python, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let func = ast::collect_nodes(tree.root_node(), &["function_definition"])[0];
        assert_eq!(
            extract_docstring(func, source, Language::Python).as_deref(),
            Some("Does things.")
        );
    }

    #[test]
    fn python_decorators() {
        let source = "@app.route('/x')\ndef handler():\n    pass\n";
        let mut parser = new_parser(Language::Python, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let func = ast::collect_nodes(tree.root_node(), &["function_definition"])[0];
        let decorators = extract_decorators(func, source, Language::Python);
        assert_eq!(decorators, vec!["@app.route('/x')".to_string()]);
    }

    #[test]
    fn visibility_heuristics() {
        assert_eq!(infer_visibility("_helper", Language::Python), Some("private"));
        assert_eq!(infer_visibility("helper", Language::Python), Some("public"));
        assert_eq!(infer_visibility("Export", Language::Go), Some("public"));
        assert_eq!(infer_visibility("local", Language::Go), Some("private"));
        assert_eq!(infer_visibility("x", Language::Rust), None);
    }
}
