//! Hybrid vector and graph search over indexed codebases.
//!
//! A codebase is split into chunks by `codetrail-core`, embedded, and
//! upserted into a Qdrant collection carrying both dense and sparse named
//! vectors. Reference edges between chunks are mirrored into a graph
//! database so a search can expand past what embeddings alone retrieve.
//!
//! # Example
//!
//! ```ignore
//! use codetrail_search::{QdrantConfig, QdrantStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = QdrantStore::connect(QdrantConfig::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod embeddings;
pub mod error;
pub mod explainer;
pub mod graphdb;
pub mod hybrid;
pub mod indexer;
pub mod retry;
pub mod schema;
pub mod search;

pub use client::{QdrantConfig, QdrantStore};
pub use error::{Result, SearchError};
pub use explainer::{Explainer, ExplainerConfig, FakeExplainer, RemoteExplainer};
pub use graphdb::{FalkorGraphDb, GraphDb, InMemoryGraphDb, NeighborId};
pub use hybrid::{HybridSearcher, RRF_K};
pub use indexer::{IndexStats, Indexer, IndexerConfig};
pub use schema::{ChunkPayload, CodePoint, CollectionConfig, SearchHit};
pub use search::{SearchRequest, Searcher};

pub use embeddings::{
    create_provider, validate_dimension, EmbeddingConfig, EmbeddingProvider, EmbeddingProviderType,
    LocalProvider, OpenAIConfig, OpenAIProvider, ProviderStatus, DEFAULT_BATCH_SIZE, EMBEDDING_DIM,
};
