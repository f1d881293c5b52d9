//! Tree-sitter grammar loading and parser construction.
//!
//! The grammar library is treated as a black box that produces an AST
//! with field-addressable children; everything language-specific beyond
//! grammar selection lives in the spec tables.

use std::path::Path;
use tree_sitter::Parser;

use super::Language;
use crate::error::{ParseError, ParseResult};

/// Resolve the tree-sitter grammar for a language.
///
/// TypeScript picks the TSX variant for `.tsx` files, which accepts JSX
/// syntax the plain grammar rejects.
pub fn grammar_for(language: Language, path: Option<&Path>) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => {
            let is_tsx = path
                .and_then(|p| p.extension())
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("tsx"));
            if is_tsx {
                tree_sitter_typescript::LANGUAGE_TSX.into()
            } else {
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
            }
        }
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Language::Lua => tree_sitter_lua::LANGUAGE.into(),
        Language::Scala => tree_sitter_scala::LANGUAGE.into(),
    }
}

/// Create a parser configured for the given language and file.
pub fn new_parser(language: Language, path: Option<&Path>) -> ParseResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar_for(language, path))
        .map_err(|e| ParseError::GrammarInit {
            language: language.name().to_string(),
            reason: e.to_string(),
        })?;
    Ok(parser)
}
