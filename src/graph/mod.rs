//! Graph data model and the write-side ingestor boundary.

pub mod ingestor;
pub mod schema;

pub use ingestor::{Ingestor, MemoryIngestor, WriteQuery};
pub use schema::{NodeLabel, NodeRef, Properties, PropertyValue, RelKind, is_allowed_edge};
