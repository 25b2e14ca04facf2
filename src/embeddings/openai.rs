use super::{with_retry, Encoder};
use crate::error::{HydeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request structure for OpenAI embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response structure from OpenAI embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in API response
#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// OpenAI embeddings client
///
/// Handles batch embedding generation with retry logic and rate limiting.
pub struct OpenAIEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    batch_size: usize,
    max_retries: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root (e.g., "https://api.openai.com")
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "text-embedding-3-small")
    /// * `batch_size` - Maximum number of texts to send per API request (max 2048)
    /// * `max_retries` - Retries for rate limits and server errors
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        batch_size: usize,
        max_retries: usize,
        timeout: Duration,
    ) -> Result<Self> {
        // Validate batch size doesn't exceed OpenAI limits
        let batch_size = batch_size.clamp(1, 2048);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HydeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            batch_size,
            max_retries,
        })
    }

    /// Internal method to make a single API request
    ///
    /// # Arguments
    ///
    /// * `texts` - Texts to embed in one request
    ///
    /// # Returns
    ///
    /// Vector of embeddings corresponding to input texts
    async fn embed_batch_internal(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| HydeError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(HydeError::Embedding(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| HydeError::Embedding(format!("Failed to parse response: {}", e)))?;

        order_embeddings(result, texts.len())
    }
}

/// Sort by the API's `index` field and check one vector came back per input
fn order_embeddings(mut result: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if result.data.len() != expected {
        return Err(HydeError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            result.data.len()
        )));
    }
    result.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
    Ok(result.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Encoder for OpenAIEmbedder {
    /// Embed a single text with retry logic
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        let mut embeddings =
            with_retry(self.max_retries, || self.embed_batch_internal(&input)).await?;
        if embeddings.is_empty() {
            return Err(HydeError::Embedding(
                "Empty response from OpenAI API".to_string(),
            ));
        }
        Ok(embeddings.remove(0))
    }

    /// Embed a batch of texts, automatically splitting into smaller batches if needed
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let embeddings =
                with_retry(self.max_retries, || self.embed_batch_internal(chunk)).await?;
            all_embeddings.extend(embeddings);

            // Rate limiting: small delay between batches to avoid hitting rate limits
            if chunk.len() == self.batch_size {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(batch_size: usize) -> OpenAIEmbedder {
        OpenAIEmbedder::new(
            "https://api.openai.com",
            "test-key".to_string(),
            "text-embedding-3-small",
            batch_size,
            3,
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_embedder_new() {
        let embedder = embedder(100);
        assert_eq!(embedder.model, "text-embedding-3-small");
        assert_eq!(embedder.batch_size, 100);
        assert_eq!(embedder.endpoint, "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn test_embedder_batch_size_limit() {
        // Batch size is capped at 2048
        assert_eq!(embedder(5000).batch_size, 2048);
        assert_eq!(embedder(2048).batch_size, 2048);
    }

    #[test]
    fn test_embedder_batch_size_zero() {
        assert_eq!(embedder(0).batch_size, 1);
    }

    #[test]
    fn test_order_embeddings_by_index() {
        let body = r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        let ordered = order_embeddings(parsed, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_embeddings_count_mismatch() {
        let body = r#"{"data":[{"embedding":[0.5]}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert!(order_embeddings(parsed, 2).is_err());
    }
}
