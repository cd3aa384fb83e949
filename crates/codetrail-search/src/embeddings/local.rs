//! Local embedding provider backed by Candle, running the Jina code-embedding
//! model (768-dim) on CPU/Metal/CUDA depending on compiled features.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use hf_hub::{api::sync::Api, Repo, RepoType};
use once_cell::sync::OnceCell;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};
use tracing::{debug, info};

use super::jina_bert_v2::{BertModel, Config as JinaConfig};
use super::provider::{EmbeddingProvider, EmbeddingProviderType, ProviderStatus, DEFAULT_BATCH_SIZE};
use crate::error::{Result, SearchError};

pub const EMBEDDING_DIM: usize = 768;
const DTYPE: DType = DType::F32;
const MODEL_ID: &str = "jinaai/jina-embeddings-v2-base-code";

/// `Arc<Inner>` gives interior clonability so `spawn_blocking` can move the
/// provider into a blocking task without cloning the loaded model weights.
#[derive(Clone)]
pub struct LocalProvider {
    inner: Arc<Inner>,
}

struct Inner {
    model: OnceCell<LoadedModel>,
    device: Device,
}

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalProvider {
    pub fn new() -> Result<Self> {
        Ok(Self { inner: Arc::new(Inner { model: OnceCell::new(), device: select_device()? }) })
    }

    pub fn with_device(device: Device) -> Self {
        Self { inner: Arc::new(Inner { model: OnceCell::new(), device }) }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.model.get().is_some()
    }

    fn device_name(&self) -> String {
        match &self.inner.device {
            Device::Cpu => "CPU".to_string(),
            #[cfg(feature = "metal")]
            Device::Metal(_) => "Metal".to_string(),
            #[cfg(feature = "cuda")]
            Device::Cuda(_) => "CUDA".to_string(),
            #[allow(unreachable_patterns)]
            _ => "Unknown".to_string(),
        }
    }

    fn ensure_model(&self) -> Result<&LoadedModel> {
        self.inner.model.get_or_try_init(|| load_model(&self.inner.device))
    }

    fn embed_sync(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let loaded = self.ensure_model()?;
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        debug!("embedding {} texts locally", texts.len());
        encode(&loaded.model, &loaded.tokenizer, &loaded.device, &texts)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.embed_batch(std::slice::from_ref(&text.to_string()), 1).await?;
        batch.into_iter().next().ok_or_else(|| SearchError::Graph("empty embedding result".into()))
    }

    async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let batch_size = if batch_size == 0 { DEFAULT_BATCH_SIZE } else { batch_size };
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            let provider = self.clone();
            let chunk = chunk.to_vec();
            let embeddings = tokio::task::spawn_blocking(move || provider.embed_sync(&chunk))
                .await
                .map_err(|e| SearchError::TransientRemote(format!("embedding task panicked: {e}")))??;
            out.extend(embeddings);
        }
        Ok(out)
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        let available = self.is_loaded() || check_model_cached(MODEL_ID).is_ok();
        let device = self.device_name();
        if available {
            Ok(ProviderStatus::healthy(EmbeddingProviderType::Local, device))
        } else {
            Ok(ProviderStatus::unavailable(EmbeddingProviderType::Local, "model not cached locally"))
        }
    }

    async fn warmup(&self) -> Result<()> {
        let provider = self.clone();
        let start = Instant::now();
        tokio::task::spawn_blocking(move || provider.ensure_model().map(|_| ()))
            .await
            .map_err(|e| SearchError::TransientRemote(format!("warmup task panicked: {e}")))??;
        info!("local embedding model warmed up in {:?}", start.elapsed());
        Ok(())
    }

    fn embedding_dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Local
    }
}

fn select_device() -> Result<Device> {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("using Metal acceleration");
            return Ok(device);
        }
    }
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("using CUDA acceleration");
            return Ok(device);
        }
    }
    info!("using CPU (no GPU acceleration available)");
    Ok(Device::Cpu)
}

fn check_model_cached(model_id: &str) -> std::result::Result<bool, String> {
    let api = Api::new().map_err(|e| format!("HuggingFace API unavailable: {e}"))?;
    let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
    api.repo(repo).info().map(|_| true).map_err(|e| format!("model not available: {e}"))
}

fn download_model_files(model_id: &str) -> Result<(PathBuf, PathBuf, PathBuf)> {
    let api = Api::new().map_err(|e| SearchError::TransientRemote(format!("HF API unavailable: {e}")))?;
    let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
    let api_repo = api.repo(repo);
    let config = api_repo.get("config.json").map_err(|e| SearchError::TransientRemote(format!("download config.json: {e}")))?;
    let tokenizer = api_repo.get("tokenizer.json").map_err(|e| SearchError::TransientRemote(format!("download tokenizer.json: {e}")))?;
    let weights = api_repo.get("model.safetensors").map_err(|e| SearchError::TransientRemote(format!("download model.safetensors: {e}")))?;
    Ok((config, tokenizer, weights))
}

fn load_model(device: &Device) -> Result<LoadedModel> {
    info!("loading embedding model ({MODEL_ID})...");
    let (config_path, tokenizer_path, weights_path) = download_model_files(MODEL_ID)?;

    let config_str = std::fs::read_to_string(&config_path)?;
    let config: JinaConfig = serde_json::from_str(&config_str)?;

    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| SearchError::VectorDb(format!("failed to load tokenizer: {e}")))?;

    let vb = unsafe {
        candle_nn::VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device)
            .map_err(|e| SearchError::VectorDb(format!("failed to load weights: {e}")))?
    };

    let model = BertModel::new(vb, &config).map_err(|e| SearchError::VectorDb(format!("failed to construct model: {e}")))?;
    info!("embedding model loaded (dim={EMBEDDING_DIM})");
    Ok(LoadedModel { model, tokenizer, device: device.clone() })
}

fn normalize_l2(v: &Tensor) -> Result<Tensor> {
    v.broadcast_div(&v.sqr()?.sum_keepdim(1)?.sqrt()?).map_err(|e| SearchError::VectorDb(format!("l2 normalization failed: {e}")))
}

fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
    let sum_mask = mask.sum(1)?;
    let summed = embeddings.broadcast_mul(&mask)?.sum(1)?;
    summed.broadcast_div(&sum_mask).map_err(|e| SearchError::VectorDb(format!("mean pooling failed: {e}")))
}

fn encode(model: &BertModel, tokenizer: &Tokenizer, device: &Device, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
    let mut tokenizer = tokenizer.clone();
    let padding = PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id: 1,
        pad_token: "<pad>".to_string(),
        ..Default::default()
    };
    tokenizer.with_padding(Some(padding));

    let encodings = tokenizer.encode_batch(texts.to_vec(), true).map_err(|e| SearchError::VectorDb(format!("tokenization failed: {e}")))?;

    let token_ids: Vec<Tensor> = encodings
        .iter()
        .map(|enc| Tensor::new(enc.get_ids(), device))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SearchError::VectorDb(format!("token tensor failed: {e}")))?;
    let attention_masks: Vec<Tensor> = encodings
        .iter()
        .map(|enc| Tensor::new(enc.get_attention_mask(), device))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SearchError::VectorDb(format!("attention mask failed: {e}")))?;

    let token_ids = Tensor::stack(&token_ids, 0).map_err(|e| SearchError::VectorDb(format!("stack tokens failed: {e}")))?;
    let attention_mask = Tensor::stack(&attention_masks, 0).map_err(|e| SearchError::VectorDb(format!("stack masks failed: {e}")))?;

    let embeddings = model
        .forward_with_mask(&token_ids, Some(&attention_mask))
        .map_err(|e| SearchError::VectorDb(format!("forward pass failed: {e}")))?;

    let pooled = mean_pool(&embeddings, &attention_mask)?;
    let normalized = normalize_l2(&pooled)?;

    (0..normalized.dim(0)?)
        .map(|i| normalized.get(i)?.to_vec1::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SearchError::VectorDb(format!("embedding conversion failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_provider_constructs_without_loading_a_model() {
        let provider = LocalProvider::new().unwrap();
        assert!(!provider.is_loaded());
        assert_eq!(provider.embedding_dim(), EMBEDDING_DIM);
    }

    #[test]
    fn provider_type_is_local() {
        let provider = LocalProvider::new().unwrap();
        assert_eq!(provider.provider_type(), EmbeddingProviderType::Local);
    }

    #[tokio::test]
    async fn empty_batch_returns_empty_without_loading_a_model() {
        let provider = LocalProvider::new().unwrap();
        let result = provider.embed_batch(&[], DEFAULT_BATCH_SIZE).await.unwrap();
        assert!(result.is_empty());
        assert!(!provider.is_loaded());
    }

    #[tokio::test]
    #[ignore] // requires model download
    async fn embed_batch_respects_input_order() {
        let provider = LocalProvider::new().unwrap();
        let texts = vec!["fn main() {}".to_string(), "def main(): pass".to_string()];
        let embeddings = provider.embed_batch(&texts, 32).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), EMBEDDING_DIM);
    }
}
