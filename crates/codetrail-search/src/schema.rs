//! Collection and point schema for the code-chunk vector store.
//!
//! One collection per codebase, named deterministically from its absolute
//! path, carrying up to four named vectors: `code_dense`/`code_sparse`
//! always, `doc_dense`/`doc_sparse` when documentation embedding is enabled.

use qdrant_client::qdrant::Distance;
use serde::{Deserialize, Serialize};

use codetrail_core::hash_path_64;

/// Named vector fields, as they appear in the collection's vector config
/// and in each point's per-vector-name map.
pub mod vectors {
    pub const CODE_DENSE: &str = "code_dense";
    pub const CODE_SPARSE: &str = "code_sparse";
    pub const DOC_DENSE: &str = "doc_dense";
    pub const DOC_SPARSE: &str = "doc_sparse";
}

/// Payload field names, matching the external-interfaces wire contract.
pub mod fields {
    pub const CONTENT: &str = "content";
    pub const DOC: &str = "doc";
    pub const RELATIVE_PATH: &str = "relative_path";
    pub const START_LINE: &str = "start_line";
    pub const END_LINE: &str = "end_line";
    pub const LANGUAGE: &str = "language";
    pub const INDEXED_AT: &str = "indexed_at";
}

/// Derives the stable collection name for a codebase from its absolute path.
pub fn collection_name(absolute_codebase_path: &str) -> String {
    let digest = hash_path_64(absolute_codebase_path);
    format!("code_chunks_{}", &digest[..8])
}

#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub code_dim: u64,
    pub doc_dim: Option<u64>,
    pub distance: Distance,
}

/// Metadata payload stored alongside each point's vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub relative_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub indexed_at: String,
}

/// One unit of upsert work: a chunk id, its vectors keyed by vector name,
/// and the payload to store with it.
#[derive(Debug, Clone)]
pub struct CodePoint {
    pub id: String,
    pub code_dense: Vec<f32>,
    pub doc_dense: Option<Vec<f32>>,
    pub payload: ChunkPayload,
}

/// A single fused search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_name_is_stable_for_the_same_path() {
        let a = collection_name("/home/user/repo");
        let b = collection_name("/home/user/repo");
        assert_eq!(a, b);
        assert!(a.starts_with("code_chunks_"));
        assert_eq!(a.len(), "code_chunks_".len() + 8);
    }

    #[test]
    fn collection_name_differs_across_paths() {
        assert_ne!(collection_name("/a"), collection_name("/b"));
    }
}
