//! Error taxonomy for codetrail-core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the ignore evaluator, file lister, hasher, snapshot
/// store, change detector, splitter, and reference-graph builder.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A single file failed to read or hash. Callers skip the file and
    /// continue the walk/batch; this variant exists so the event can still
    /// be logged at the call site.
    #[error("failed to read or hash {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file could not be written atomically.
    #[error("failed to write snapshot at {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but could not be decoded as JSON.
    #[error("failed to decode snapshot at {path}: {source}")]
    SnapshotDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `.gitignore` pattern could not be compiled.
    #[error("invalid ignore pattern {pattern:?} in {source_file}: {message}")]
    InvalidPattern {
        pattern: String,
        source_file: String,
        message: String,
    },

    /// The codebase root does not exist or is not a directory.
    #[error("codebase path not found: {0}")]
    PathNotFound(PathBuf),

    /// The tree-sitter parser failed to produce a usable tree.
    #[error("parse failure for {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
