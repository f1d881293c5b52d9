//! Error types for the indexing engine.
//!
//! Structured errors via thiserror. Nothing in the core raises across the
//! public `run()` boundary unless strict mode is enabled; recoverable
//! conditions (unresolved calls, missing registry entries) are modeled as
//! `Option`, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {language} file '{path}': {reason}")]
    ParseFailure {
        path: PathBuf,
        language: String,
        reason: String,
    },

    #[error("Repository root '{path}' is not a directory")]
    InvalidRepoRoot { path: PathBuf },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Incremental cache at '{path}' is corrupted: {reason}")]
    CacheCorrupted { path: PathBuf, reason: String },

    #[error("Ingestor rejected a write during {operation}: {cause}")]
    IngestorRejection { operation: String, cause: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Indexing run was cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

/// Errors specific to parser construction.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to initialize {language} grammar: {reason}")]
    GrammarInit { language: String, reason: String },

    #[error("Parser returned no tree for '{path}'")]
    EmptyTree { path: PathBuf },
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

impl IndexError {
    /// Wrap an io::Error from reading `path`.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}
