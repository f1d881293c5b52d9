//! Incremental re-indexing: per-file content hashes and structural
//! signatures, plus Git HEAD deltas.

pub mod cache;
pub mod git;

pub use cache::{IncrementalCache, ParseDecision};
pub use git::GitDelta;
