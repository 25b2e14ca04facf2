//! Dense text encoders for queries and hypothesis documents.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaEncoder;
pub use openai::OpenAIEmbedder;

use crate::cache::{CacheStats, EmbeddingCache};
use crate::config::EmbeddingsConfig;
use crate::error::{HydeError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode several texts, one vector per input in the same order.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.encode(text).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str;

    /// Cache counters when the encoder memoizes results
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Encoder decorator that memoizes single-text encodes in an LRU cache.
///
/// Only `encode` consults the cache; batches (index builds) go straight through.
pub struct CachedEncoder {
    inner: Arc<dyn Encoder>,
    cache: Arc<EmbeddingCache>,
}

impl CachedEncoder {
    pub fn new(inner: Arc<dyn Encoder>, cache: Arc<EmbeddingCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Encoder for CachedEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text) {
            log::debug!("Cache hit for text: {}", text);
            return Ok(cached);
        }
        let embedding = self.inner.encode(text).await?;
        self.cache.put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner.encode_batch(texts).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(self.cache.stats())
    }
}

/// Whether an embedding error is worth retrying (network, 429 rate limit or 5xx)
pub(crate) fn is_retryable(e: &HydeError) -> bool {
    let msg = e.to_string();
    msg.contains("Network error")
        || msg.contains("429")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
}

/// Retry `op` with exponential backoff, up to `max_retries` retries, for
/// retryable errors only.
pub(crate) async fn with_retry<T, F, Fut>(max_retries: usize, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start = std::time::Instant::now();
    let mut attempt = 0;
    let mut delay = Duration::from_secs(1);

    loop {
        match op().await {
            Ok(value) => {
                log::debug!(
                    "Embedding API call took {:?} (attempt {})",
                    start.elapsed(),
                    attempt + 1
                );
                return Ok(value);
            }
            Err(e) if attempt < max_retries && is_retryable(&e) => {
                log::warn!("Retry {}/{} after error: {}", attempt + 1, max_retries, e);
                tokio::time::sleep(delay).await;
                delay *= 2; // Exponential backoff
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Build the configured encoder, wrapped in an LRU cache when `cache_capacity > 0`
pub fn build_encoder(config: &EmbeddingsConfig) -> Result<Arc<dyn Encoder>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let encoder: Arc<dyn Encoder> = match config.backend.as_str() {
        "ollama" => Arc::new(OllamaEncoder::new(
            config.base_url(),
            &config.model,
            config.batch_size,
            config.max_retries,
            timeout,
        )?),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                HydeError::Config(format!(
                    "Environment variable {} not set",
                    config.api_key_env
                ))
            })?;
            Arc::new(OpenAIEmbedder::new(
                config.base_url(),
                api_key,
                &config.model,
                config.batch_size,
                config.max_retries,
                timeout,
            )?)
        }
        other => {
            return Err(HydeError::Config(format!(
                "Unknown embeddings backend: {}",
                other
            )))
        }
    };

    if config.cache_capacity > 0 {
        let cache = Arc::new(EmbeddingCache::new(config.cache_capacity));
        Ok(Arc::new(CachedEncoder::new(encoder, cache)))
    } else {
        Ok(encoder)
    }
}
