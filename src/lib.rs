//! codegraph: a multi-language code indexing engine.
//!
//! Consumes a source repository and produces a code knowledge graph:
//! typed nodes for projects, packages, modules, classes, functions,
//! methods, and external dependencies, connected by typed
//! relationships. The graph streams to an interchangeable write-side
//! sink ([`graph::Ingestor`]).

pub mod calls;
pub mod cli;
pub mod config;
pub mod definitions;
pub mod error;
pub mod graph;
pub mod imports;
pub mod incremental;
pub mod logging;
pub mod manifest;
pub mod parsing;
pub mod paths;
pub mod pipeline;
pub mod state;
pub mod structure;
pub mod symbol;
pub mod typeinf;

pub use config::Settings;
pub use error::{IndexError, IndexResult};
pub use graph::{Ingestor, MemoryIngestor, NodeLabel, RelKind};
pub use parsing::Language;
pub use pipeline::{GraphPipeline, IndexStats};
pub use symbol::{SymbolKind, SymbolRegistry};
