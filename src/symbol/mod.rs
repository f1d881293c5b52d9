//! Symbol kinds and the fully-qualified-name registry.

pub mod registry;

use serde::{Deserialize, Serialize};

use crate::graph::NodeLabel;

/// The kind of a registered symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Module,
    Interface,
    Package,
    Enum,
    Type,
    Union,
}

impl SymbolKind {
    /// The graph label nodes of this kind are emitted under.
    pub fn node_label(&self) -> NodeLabel {
        match self {
            Self::Function => NodeLabel::Function,
            Self::Method => NodeLabel::Method,
            Self::Class => NodeLabel::Class,
            Self::Module => NodeLabel::Module,
            Self::Interface => NodeLabel::Interface,
            Self::Package => NodeLabel::Package,
            Self::Enum => NodeLabel::Enum,
            Self::Type => NodeLabel::Type,
            Self::Union => NodeLabel::Union,
        }
    }
}

pub use registry::{FqnTrie, SymbolRegistry};
