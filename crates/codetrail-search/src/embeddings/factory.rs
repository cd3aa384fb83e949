//! Constructs the configured [`EmbeddingProvider`] and validates its
//! dimension against a target collection configuration.

use std::sync::Arc;

use crate::error::{Result, SearchError};

use super::local::LocalProvider;
use super::openai::{OpenAIConfig, OpenAIProvider};
use super::provider::{EmbeddingProvider, EmbeddingProviderType};

#[derive(Debug, Clone, Default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,
    pub openai: Option<OpenAIConfig>,
}

impl EmbeddingConfig {
    pub fn local() -> Self {
        Self { provider: EmbeddingProviderType::Local, openai: None }
    }

    pub fn openai_with_config(config: OpenAIConfig) -> Self {
        Self { provider: EmbeddingProviderType::Openai, openai: Some(config) }
    }

    pub fn openai() -> Self {
        Self { provider: EmbeddingProviderType::Openai, openai: None }
    }
}

/// Checks a provider's declared dimension against the dimension a vector
/// collection was (or would be) created with.
pub fn validate_dimension(provider: &dyn EmbeddingProvider, expected: u64) -> Result<()> {
    let actual = provider.embedding_dim() as u64;
    if actual != expected {
        return Err(SearchError::DimensionMismatch { collection: "embedding-provider".into(), existing: actual, expected });
    }
    Ok(())
}

pub fn create(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderType::Local => Arc::new(LocalProvider::new()?),
        EmbeddingProviderType::Openai => {
            let provider = match &config.openai {
                Some(cfg) => OpenAIProvider::new(cfg.clone())?,
                None => OpenAIProvider::from_env()?,
            };
            Arc::new(provider)
        }
    };
    Ok(provider)
}
