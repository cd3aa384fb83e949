//! `search::Error` taxonomy: one variant per error kind the indexing and
//! search orchestrators must distinguish, mapped 1:1 onto the propagation
//! policy (surfaced vs. absorbed-and-logged) documented on each variant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Bad caller input: empty query, out-of-range `top_k`/`threshold`,
    /// `max_graph_hops < 1`. Always surfaced.
    #[error("validation error: {0}")]
    Validation(String),

    /// The codebase path passed to `index`/`search` does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// `search` was called against a codebase with no collection yet.
    #[error("codebase not indexed: {0}")]
    NotIndexed(String),

    /// Rate-limited embedding/explainer call; retried with backoff before
    /// this variant is ever surfaced to a caller.
    #[error("transient remote error: {0}")]
    TransientRemote(String),

    /// A single file failed to read or hash; the file is skipped and
    /// indexing continues, so this is logged at debug, never surfaced.
    #[error("file read error for {path}: {source}")]
    FileRead { path: String, #[source] source: std::io::Error },

    /// Graph-DB failure. During search this degrades to seed-only results
    /// (logged at warn); during indexing it is a best-effort enrichment
    /// failure (also logged at warn, never fatal to the batch).
    #[error("graph error: {0}")]
    Graph(String),

    /// Vector-DB RPC failure. Always surfaced; the snapshot is not
    /// committed, so the next `index` re-converges the undone work.
    #[error("vector database error: {0}")]
    VectorDb(String),

    /// An existing collection's recorded vector size doesn't match the
    /// configured embedding dimension.
    #[error("collection '{collection}' has dimension {existing}, expected {expected}")]
    DimensionMismatch { collection: String, existing: u64, expected: u64 },

    /// Snapshot failed to persist; the caller must treat the operation as
    /// failed even if the vector-DB writes already landed.
    #[error("snapshot io error: {0}")]
    SnapshotIo(#[from] codetrail_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Tensor op failure inside the local embedding model.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
