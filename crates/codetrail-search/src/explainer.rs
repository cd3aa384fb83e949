//! Code-to-English explainer adapter: produces one concise sentence per
//! chunk, used to build the `doc` text that gets embedded alongside a
//! chunk's code when doc embedding is enabled.
//!
//! A batch runs with bounded parallelism (`parallelism` concurrent requests);
//! batches themselves run sequentially. A `null`/empty explanation from the
//! remote is substituted with the literal string `"unknown"` rather than
//! dropped, so every input chunk always gets exactly one output sentence.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SearchError};
use crate::retry::with_retry;

const UNKNOWN: &str = "unknown";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait Explainer: Send + Sync {
    /// Explains each code snippet in order, with up to `parallelism`
    /// requests in flight at once. The returned vector has exactly
    /// `codes.len()` entries, in the same order as the input.
    async fn explain_batch(&self, codes: &[String], parallelism: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct ExplainerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl ExplainerConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CODETRAIL_EXPLAINER_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: std::env::var("CODETRAIL_EXPLAINER_API_KEY").ok(),
            model: std::env::var("CODETRAIL_EXPLAINER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Chat-completions-backed explainer: one prompt per snippet asking for a
/// single sentence description, reusing the shared retry policy for
/// rate-limited or transiently unavailable responses.
pub struct RemoteExplainer {
    client: Client,
    config: ExplainerConfig,
}

impl RemoteExplainer {
    pub fn new(config: ExplainerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::TransientRemote(format!("http client error: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ExplainerConfig::from_env())
    }

    fn chat_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") { format!("{base}/chat/completions") } else { format!("{base}/v1/chat/completions") }
    }

    async fn explain_one(&self, code: &str) -> Result<String> {
        with_retry(|| self.send_request(code)).await
    }

    async fn send_request(&self, code: &str) -> Result<String> {
        let prompt = format!(
            "Describe what the following code does in a single concise English sentence. \
             Respond with only the sentence, no preamble.\n\n```\n{code}\n```"
        );
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
        };

        let mut request = self.client.post(self.chat_url()).header("Content-Type", "application/json").json(&body);
        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                SearchError::TransientRemote(format!("request failed: {e}"))
            } else {
                SearchError::VectorDb(format!("request failed: {e}"))
            }
        })?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let parsed: ChatResponse = response.json().await.map_err(|e| SearchError::VectorDb(format!("invalid response: {e}")))?;
                let text = parsed.choices.into_iter().next().and_then(|c| c.message.content).map(|s| s.trim().to_string());
                Ok(match text {
                    Some(s) if !s.is_empty() => s,
                    _ => UNKNOWN.to_string(),
                })
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS | reqwest::StatusCode::SERVICE_UNAVAILABLE | reqwest::StatusCode::GATEWAY_TIMEOUT => {
                Err(SearchError::TransientRemote(format!("remote temporarily unavailable: {}", response.status())))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::VectorDb(format!("request failed with status {status}: {body}")))
            }
        }
    }
}

#[async_trait]
impl Explainer for RemoteExplainer {
    async fn explain_batch(&self, codes: &[String], parallelism: usize) -> Result<Vec<String>> {
        if codes.is_empty() {
            return Ok(vec![]);
        }
        let parallelism = parallelism.max(1);
        let futures = codes.iter().map(|code| self.explain_one(code));
        let results: Vec<Result<String>> = stream::iter(futures).buffered(parallelism).collect().await;

        results.into_iter().collect::<Result<Vec<String>>>().map(|explanations| {
            explanations.into_iter().map(|s| if s.trim().is_empty() { UNKNOWN.to_string() } else { s }).collect()
        })
    }
}

/// Deterministic explainer for orchestrator tests: returns a fixed sentence
/// derived from each snippet's length, never makes a network call.
pub struct FakeExplainer;

#[async_trait]
impl Explainer for FakeExplainer {
    async fn explain_batch(&self, codes: &[String], _parallelism: usize) -> Result<Vec<String>> {
        Ok(codes
            .iter()
            .map(|code| if code.trim().is_empty() { UNKNOWN.to_string() } else { format!("a {}-character code snippet", code.len()) })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> ExplainerConfig {
        ExplainerConfig { base_url: server.uri(), api_key: Some("test-key".into()), model: "test-model".into(), timeout_secs: 5 }
    }

    fn chat_response(content: &str) -> serde_json::Value {
        serde_json::json!({"choices": [{"message": {"content": content}}]})
    }

    #[tokio::test]
    async fn explain_batch_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_json(chat_response("parses a config file"))).mount(&server).await;

        let explainer = RemoteExplainer::new(test_config(&server)).unwrap();
        let codes = vec!["fn a() {}".to_string(), "fn b() {}".to_string(), "fn c() {}".to_string()];
        let explanations = explainer.explain_batch(&codes, 2).await.unwrap();
        assert_eq!(explanations.len(), 3);
        assert!(explanations.iter().all(|e| e == "parses a config file"));
    }

    #[tokio::test]
    async fn null_content_becomes_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": [{"message": {"content": null}}]}))).mount(&server).await;

        let explainer = RemoteExplainer::new(test_config(&server)).unwrap();
        let explanations = explainer.explain_batch(&["fn a() {}".to_string()], 1).await.unwrap();
        assert_eq!(explanations, vec![UNKNOWN.to_string()]);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let server = MockServer::start().await;
        let explainer = RemoteExplainer::new(test_config(&server)).unwrap();
        let result = explainer.explain_batch(&[], 4).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn fake_explainer_is_deterministic_and_never_empty() {
        let explainer = FakeExplainer;
        let explanations = explainer.explain_batch(&["abc".to_string(), "".to_string()], 1).await.unwrap();
        assert_eq!(explanations[0], "a 3-character code snippet");
        assert_eq!(explanations[1], UNKNOWN);
    }
}
