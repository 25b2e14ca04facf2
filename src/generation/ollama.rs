use super::{Generator, RetryPolicy};
use crate::error::{HydeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for Ollama's `/api/generate`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Non-streaming response from `/api/generate`
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generator backed by a locally hosted Ollama server
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    policy: RetryPolicy,
}

impl OllamaGenerator {
    /// Create a new Ollama generator
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, e.g. "http://localhost:11434"
    /// * `model` - Model tag (e.g., "llama3.1")
    /// * `temperature` - Sampling temperature used for every call
    /// * `timeout` - Per-request timeout; a timed out call counts as a failed attempt
    /// * `policy` - Retry policy for failed calls
    pub fn new(
        base_url: &str,
        model: &str,
        temperature: f32,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HydeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
            policy,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| HydeError::Generation(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(HydeError::Generation(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| HydeError::Generation(format!("Failed to parse response: {}", e)))?;

        Ok(result.response)
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }
}
