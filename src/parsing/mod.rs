//! Language detection, grammar loading, and per-language parsing tables.

pub mod ast;
pub mod fqn;
pub mod grammar;
pub mod language;
pub mod spec;

pub use fqn::file_to_module_parts;
pub use grammar::new_parser;
pub use language::Language;
pub use spec::{LanguageSpec, language_spec};
