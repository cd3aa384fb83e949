//! Embedding generation for semantic code search.
//!
//! One [`EmbeddingProvider`] instance embeds both code content and
//! documentation text into the same vector space, backed by either local
//! Candle inference or an OpenAI-compatible remote endpoint.

pub mod factory;
pub mod jina_bert_v2;
mod local;
pub mod openai;
mod provider;

pub use provider::{EmbeddingProvider, EmbeddingProviderType, ProviderStatus, DEFAULT_BATCH_SIZE};

pub use factory::{create as create_provider, validate_dimension, EmbeddingConfig};

pub use local::{LocalProvider, EMBEDDING_DIM};

pub use openai::{OpenAIConfig, OpenAIProvider};
