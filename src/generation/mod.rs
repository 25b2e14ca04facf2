//! Text generation backends for hypothetical documents.
//!
//! A [`Generator`] samples `n` independent completions for one prompt. Backends
//! implement a single completion call; sampling and retries are shared.

pub mod ollama;
pub mod openai;
pub mod retry;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use retry::{Backoff, RetryPolicy};

use crate::config::GenerationConfig;
use crate::error::{HydeError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Text generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// One completion for `prompt`, no retries.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Policy applied to every completion call made by [`Generator::generate`].
    fn retry_policy(&self) -> &RetryPolicy;

    fn model_name(&self) -> &str;

    fn temperature(&self) -> f32;

    /// Sample `n` completions, each an independent call with the same prompt
    /// and temperature. Failed calls are retried per [`Generator::retry_policy`].
    async fn generate(&self, prompt: &str, n: usize) -> Result<Vec<String>> {
        let mut texts = Vec::with_capacity(n);
        for i in 0..n {
            let what = format!("generation {}/{} ({})", i + 1, n, self.model_name());
            let text = self
                .retry_policy()
                .run(&what, move || self.complete(prompt))
                .await?;
            texts.push(text);
        }
        Ok(texts)
    }
}

/// Build the configured generation backend
pub fn build_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    let policy = RetryPolicy::from_config(&config.retry);
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.backend.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(
            config.base_url(),
            &config.model,
            config.temperature,
            timeout,
            policy,
        )?)),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                HydeError::Config(format!(
                    "Environment variable {} not set",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(OpenAiGenerator::new(
                config.base_url(),
                api_key,
                &config.model,
                config.temperature,
                timeout,
                policy,
            )?))
        }
        other => Err(HydeError::Config(format!(
            "Unknown generation backend: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every third call, otherwise echoes a counter.
    struct FlakyGenerator {
        calls: AtomicUsize,
        policy: RetryPolicy,
    }

    #[async_trait]
    impl Generator for FlakyGenerator {
        async fn complete(&self, prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 3 == 2 {
                return Err(HydeError::Generation("timeout".to_string()));
            }
            Ok(format!("{} #{}", prompt, n))
        }

        fn retry_policy(&self) -> &RetryPolicy {
            &self.policy
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn temperature(&self) -> f32 {
            0.7
        }
    }

    #[tokio::test]
    async fn test_generate_returns_n_samples_despite_failures() {
        let generator = FlakyGenerator {
            calls: AtomicUsize::new(0),
            policy: RetryPolicy::bounded(3, Duration::ZERO),
        };
        let texts = generator.generate("p", 8).await.unwrap();
        assert_eq!(texts.len(), 8);
        assert!(texts.iter().all(|t| t.starts_with("p #")));
        // 8 successes + 3 failures (calls 2, 5, 8)
        assert_eq!(generator.calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_generate_zero_samples() {
        let generator = FlakyGenerator {
            calls: AtomicUsize::new(0),
            policy: RetryPolicy::default(),
        };
        assert!(generator.generate("p", 0).await.unwrap().is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_build_unknown_backend() {
        let config = GenerationConfig {
            backend: "llamafile".to_string(),
            ..GenerationConfig::default()
        };
        assert!(matches!(build_generator(&config), Err(HydeError::Config(_))));
    }

    #[test]
    fn test_build_ollama_backend() {
        let generator = build_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.model_name(), "llama3.1");
        assert!((generator.temperature() - 0.7).abs() < 1e-6);
        assert_eq!(generator.retry_policy().max_attempts, Some(10));
    }
}
