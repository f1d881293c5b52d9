//! Per-language local-variable type inference.
//!
//! Every engine exposes the same shape: given a scope node, produce
//! `{variable name -> inferred type FQN}`. Non-inferable cases yield an
//! empty map, never an error. The call resolver consumes the result to
//! pick method targets.

pub mod generic;
pub mod java;
pub mod javascript;
pub mod python;

use std::collections::HashMap;
use tree_sitter::Node;

use crate::parsing::Language;
use crate::state::IndexState;

/// A map from local variable (or `self.attr` reference) to a type FQN.
pub type LocalTypes = HashMap<String, String>;

/// Build the local-variable type map for a caller scope.
pub fn build_local_variable_type_map(
    scope_node: Node,
    source: &str,
    module_qn: &str,
    language: Language,
    state: &IndexState,
) -> LocalTypes {
    match language {
        Language::Python => python::build_local_variable_type_map(scope_node, source, module_qn, state),
        Language::JavaScript | Language::TypeScript => {
            javascript::build_local_variable_type_map(scope_node, source, module_qn, state)
        }
        Language::Java => java::build_local_variable_type_map(scope_node, source, module_qn, state),
        Language::Go
        | Language::Lua
        | Language::Ruby
        | Language::Php
        | Language::CSharp
        | Language::Scala => {
            generic::build_local_variable_type_map(scope_node, source, module_qn, language, state)
        }
        // No useful local-flow story for the remaining languages.
        _ => LocalTypes::new(),
    }
}
