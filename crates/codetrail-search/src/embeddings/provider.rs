//! Embedding provider trait: a single dense-vector interface shared by
//! code content and documentation text, backed by either a local Candle
//! model or a remote OpenAI-compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default batch size for [`EmbeddingProvider::embed_batch`].
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderType {
    #[default]
    Local,
    Openai,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderType::Local => write!(f, "local"),
            EmbeddingProviderType::Openai => write!(f, "openai"),
        }
    }
}

/// Health/capability snapshot for diagnostics and `warmup`.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub available: bool,
    pub provider_type: EmbeddingProviderType,
    pub device: String,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ProviderStatus {
    pub fn healthy(provider_type: EmbeddingProviderType, device: impl Into<String>) -> Self {
        Self { available: true, provider_type, device: device.into(), latency_ms: None, error: None }
    }

    pub fn unavailable(provider_type: EmbeddingProviderType, error: impl Into<String>) -> Self {
        Self { available: false, provider_type, device: "N/A".into(), latency_ms: None, error: Some(error.into()) }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// A source of dense embeddings for code or documentation text. The same
/// provider instance embeds both content kinds; callers decide which named
/// vector a given embedding lands in.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds `texts` in chunks of `batch_size`, preserving input order.
    async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>>;

    async fn check_status(&self) -> Result<ProviderStatus>;

    /// Preloads models / opens connections ahead of the first real call.
    async fn warmup(&self) -> Result<()>;

    fn embedding_dim(&self) -> usize;

    fn provider_type(&self) -> EmbeddingProviderType;
}
