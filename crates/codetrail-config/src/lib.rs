//! Configuration for the indexing and search orchestrators.
//!
//! Supports layered loading via [`ConfigLoader`]:
//! - Global config: `~/.codetrail/config.toml`
//! - Local config: `.codetrail/config.toml` under the codebase root
//! - CLI overrides via [`ConfigOverrides`]
//!
//! Layers are merged in that order, each one overriding fields the previous
//! layer set explicitly.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for indexing and search.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Chunking behavior: chunk size, overlap, docstring extraction.
    pub splitter: SplitterSettings,

    /// Additional ignore patterns layered on top of `.gitignore`.
    pub ignore_patterns: Vec<String>,

    /// Explainer and doc-embedding behavior during indexing.
    pub indexing: IndexingSettings,

    /// Vector database connection.
    pub vector_db: VectorDbSettings,

    /// Graph database connection.
    pub graph_db: GraphDbSettings,

    /// Embedding provider selection and connection.
    pub embedding: EmbeddingSettings,

    /// Explainer provider connection, used when `indexing.explainer_enabled`.
    pub explainer: ExplainerSettings,

    /// Where per-codebase snapshot files are written.
    pub storage: StorageSettings,

    /// Logging configuration.
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitterSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub extract_docs: bool,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self { chunk_size: 2500, chunk_overlap: 300, extract_docs: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexingSettings {
    pub explainer_enabled: bool,
    pub explainer_parallelism: usize,
    pub embedding_batch_size: usize,
    pub doc_embedding_enabled: bool,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self { explainer_enabled: false, explainer_parallelism: 1, embedding_batch_size: 32, doc_embedding_enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorDbSettings {
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for VectorDbSettings {
    fn default() -> Self {
        Self { url: "http://localhost:6334".to_string(), api_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphDbSettings {
    pub url: String,
    pub enabled: bool,
}

impl Default for GraphDbSettings {
    fn default() -> Self {
        Self { url: "redis://localhost:6379".to_string(), enabled: true }
    }
}

/// Embedding provider selection and connection settings.
///
/// ```toml
/// [embedding]
/// provider = "local"  # or "openai"
///
/// [embedding.openai]
/// url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// model = "text-embedding-3-small"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderType,
    pub openai: Option<OpenAISettings>,
}

impl EmbeddingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            EmbeddingProviderType::Local => Ok(()),
            EmbeddingProviderType::Openai => {
                let Some(settings) = &self.openai else {
                    return Err(ConfigError::ValidationError(
                        "embedding.provider is 'openai' but [embedding.openai] is missing".to_string(),
                    ));
                };
                if settings.url.is_empty() {
                    return Err(ConfigError::ValidationError("embedding.openai.url is required".to_string()));
                }
                if settings.model.is_empty() {
                    return Err(ConfigError::ValidationError("embedding.openai.model is required".to_string()));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderType {
    #[default]
    Local,
    Openai,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Openai => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::Openai),
            other => Err(ConfigError::invalid_value("embedding.provider", format!("unknown provider '{other}', expected 'local' or 'openai'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAISettings {
    pub url: String,
    pub api_key_env: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "text-embedding-3-small".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplainerSettings {
    pub url: String,
    pub api_key_env: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub snapshots_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { snapshots_dir: PathBuf::from(".codetrail/snapshots") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::default(), file: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI-style overrides applied after the global/local config files are merged.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub vector_db_url: Option<String>,
    pub graph_db_url: Option<String>,
    pub embedding_provider: Option<EmbeddingProviderType>,
    pub log_level: Option<String>,
    pub snapshots_dir: Option<PathBuf>,
}

impl CoreConfig {
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.vector_db_url {
            self.vector_db.url = url.clone();
        }
        if let Some(ref url) = overrides.graph_db_url {
            self.graph_db.url = url.clone();
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(ref dir) = overrides.snapshots_dir {
            self.storage.snapshots_dir = dir.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()
    }

    /// Resolves the snapshots directory against a codebase root when
    /// configured as a relative path.
    pub fn snapshots_dir(&self, codebase_root: &std::path::Path) -> PathBuf {
        if self.storage.snapshots_dir.is_absolute() {
            self.storage.snapshots_dir.clone()
        } else {
            codebase_root.join(&self.storage.snapshots_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.splitter.chunk_size, 2500);
        assert_eq!(config.splitter.chunk_overlap, 300);
        assert!(config.splitter.extract_docs);
        assert!(!config.indexing.explainer_enabled);
        assert_eq!(config.indexing.embedding_batch_size, 32);
        assert_eq!(config.vector_db.url, "http://localhost:6334");
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Local);
    }

    #[test]
    fn apply_overrides_sets_specified_fields_only() {
        let mut config = CoreConfig::default();
        let overrides = ConfigOverrides { vector_db_url: Some("http://remote:6334".to_string()), log_level: Some("debug".to_string()), ..Default::default() };
        config.apply_overrides(&overrides);
        assert_eq!(config.vector_db.url, "http://remote:6334");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.graph_db.url, GraphDbSettings::default().url);
    }

    #[test]
    fn snapshots_dir_resolves_relative_against_codebase_root() {
        let config = CoreConfig::default();
        let root = PathBuf::from("/home/user/project");
        assert_eq!(config.snapshots_dir(&root), PathBuf::from("/home/user/project/.codetrail/snapshots"));
    }

    #[test]
    fn snapshots_dir_keeps_absolute_path() {
        let mut config = CoreConfig::default();
        config.storage.snapshots_dir = PathBuf::from("/var/lib/codetrail/snapshots");
        let root = PathBuf::from("/home/user/project");
        assert_eq!(config.snapshots_dir(&root), PathBuf::from("/var/lib/codetrail/snapshots"));
    }

    #[test]
    fn embedding_provider_type_round_trips_through_str() {
        assert_eq!("local".parse::<EmbeddingProviderType>().unwrap(), EmbeddingProviderType::Local);
        assert_eq!("openai".parse::<EmbeddingProviderType>().unwrap(), EmbeddingProviderType::Openai);
        assert!("unknown".parse::<EmbeddingProviderType>().is_err());
    }

    #[test]
    fn validate_local_provider_always_passes() {
        assert!(EmbeddingSettings::default().validate().is_ok());
    }

    #[test]
    fn validate_openai_provider_requires_settings() {
        let settings = EmbeddingSettings { provider: EmbeddingProviderType::Openai, openai: None };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn validate_openai_provider_passes_with_settings() {
        let settings = EmbeddingSettings { provider: EmbeddingProviderType::Openai, openai: Some(OpenAISettings::default()) };
        assert!(settings.validate().is_ok());
    }
}
