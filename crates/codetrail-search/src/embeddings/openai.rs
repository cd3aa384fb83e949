//! Embedding provider for OpenAI-compatible `/v1/embeddings` endpoints
//! (OpenAI, Azure OpenAI, Ollama, and similar self-hosted servers).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::provider::{EmbeddingProvider, EmbeddingProviderType, ProviderStatus, DEFAULT_BATCH_SIZE};
use crate::error::{Result, SearchError};
use crate::retry::with_retry;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub azure_mode: bool,
}

impl OpenAIConfig {
    pub fn ollama() -> Self {
        Self { base_url: "http://localhost:11434/v1".into(), api_key: None, model: "nomic-embed-text".into(), timeout_secs: DEFAULT_TIMEOUT_SECS, azure_mode: false }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self { base_url: "https://api.openai.com/v1".into(), api_key: Some(api_key.into()), model: "text-embedding-3-small".into(), timeout_secs: DEFAULT_TIMEOUT_SECS, azure_mode: false }
    }

    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CODETRAIL_OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: std::env::var("CODETRAIL_OPENAI_API_KEY").ok(),
            model: std::env::var("CODETRAIL_OPENAI_MODEL").unwrap_or_else(|_| "text-embedding-3-small".into()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            azure_mode: std::env::var("CODETRAIL_OPENAI_AZURE_MODE").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
    dimension: AtomicUsize,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::TransientRemote(format!("http client error: {e}")))?;
        Ok(Self { client, config, dimension: AtomicUsize::new(0) })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    fn embeddings_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") { format!("{base}/embeddings") } else { format!("{base}/v1/embeddings") }
    }

    async fn embed_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        with_retry(|| self.send_request(texts.clone())).await
    }

    async fn send_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = self.embeddings_url();
        let body = EmbeddingsRequest { model: self.config.model.clone(), input: texts };

        let mut request = self.client.post(&url).header("Content-Type", "application/json").json(&body);
        if let Some(ref api_key) = self.config.api_key {
            request = if self.config.azure_mode { request.header("api-key", api_key) } else { request.header("Authorization", format!("Bearer {api_key}")) };
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                SearchError::TransientRemote(format!("request failed: {e}"))
            } else {
                SearchError::VectorDb(format!("request failed: {e}"))
            }
        })?;

        match response.status() {
            StatusCode::OK => {
                let parsed: EmbeddingsResponse = response.json().await.map_err(|e| SearchError::VectorDb(format!("invalid response: {e}")))?;
                let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
                if let Some(first) = embeddings.first() {
                    let dim = first.len();
                    let cached = self.dimension.load(Ordering::Relaxed);
                    if cached == 0 {
                        self.dimension.store(dim, Ordering::Relaxed);
                    } else if cached != dim as usize {
                        return Err(SearchError::DimensionMismatch { collection: "embedding-provider".into(), existing: cached as u64, expected: dim as u64 });
                    }
                }
                Ok(embeddings)
            }
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Err(SearchError::TransientRemote(format!("remote temporarily unavailable: {}", response.status())))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::VectorDb(format!("request failed with status {status}: {body}")))
            }
        }
    }

    async fn health_check(&self) -> Result<Duration> {
        let start = Instant::now();
        self.send_request(vec!["health check".into()]).await?;
        Ok(start.elapsed())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.embed_request(vec![text.to_string()]).await?;
        batch.into_iter().next().ok_or_else(|| SearchError::VectorDb("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let batch_size = if batch_size == 0 { DEFAULT_BATCH_SIZE } else { batch_size };
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            out.extend(self.embed_request(chunk.to_vec()).await?);
        }
        Ok(out)
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        match self.health_check().await {
            Ok(latency) => Ok(ProviderStatus::healthy(EmbeddingProviderType::Openai, "remote").with_latency(latency.as_millis() as u64)),
            Err(e) => Ok(ProviderStatus::unavailable(EmbeddingProviderType::Openai, e.to_string())),
        }
    }

    async fn warmup(&self) -> Result<()> {
        let status = self.check_status().await?;
        if !status.available {
            return Err(SearchError::TransientRemote(status.error.unwrap_or_else(|| "provider not ready".into())));
        }
        Ok(())
    }

    fn embedding_dim(&self) -> usize {
        let dim = self.dimension.load(Ordering::Relaxed);
        if dim > 0 {
            dim
        } else {
            match self.config.model.as_str() {
                "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
                "text-embedding-3-large" => 3072,
                _ => 768,
            }
        }
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Openai
    }
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider").field("base_url", &self.config.base_url).field("model", &self.config.model).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_response(dim: usize, count: usize) -> serde_json::Value {
        let data: Vec<serde_json::Value> = (0..count).map(|_| serde_json::json!({"embedding": vec![0.1_f32; dim]})).collect();
        serde_json::json!({"data": data})
    }

    fn test_config(server: &MockServer) -> OpenAIConfig {
        OpenAIConfig { base_url: server.uri(), api_key: Some("test-key".into()), model: "test-model".into(), timeout_secs: 5, azure_mode: false }
    }

    #[tokio::test]
    async fn embed_returns_the_single_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/embeddings")).respond_with(ResponseTemplate::new(200).set_body_json(mock_response(768, 1))).mount(&server).await;

        let provider = OpenAIProvider::new(test_config(&server)).unwrap();
        let embedding = provider.embed("hello world").await.unwrap();
        assert_eq!(embedding.len(), 768);
    }

    #[tokio::test]
    async fn embed_batch_splits_across_batch_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/embeddings")).respond_with(ResponseTemplate::new(200).set_body_json(mock_response(768, 2))).mount(&server).await;

        let provider = OpenAIProvider::new(test_config(&server)).unwrap();
        let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
        let embeddings = provider.embed_batch(&texts, 2).await.unwrap();
        assert_eq!(embeddings.len(), 6);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let server = MockServer::start().await;
        let provider = OpenAIProvider::new(test_config(&server)).unwrap();
        let result = provider.embed_batch(&[], 32).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn transient_service_unavailable_is_retried_and_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/embeddings")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let provider = OpenAIProvider::new(test_config(&server).with_timeout(2)).unwrap();
        let result = provider.embed("test").await;
        assert!(matches!(result, Err(SearchError::TransientRemote(_))));
    }

    #[test]
    fn ollama_config_has_no_api_key() {
        let config = OpenAIConfig::ollama();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "nomic-embed-text");
    }
}
