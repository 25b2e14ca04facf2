//! HyDE pipeline: prompt -> sample hypothetical documents -> encode -> average -> search.

use crate::embeddings::Encoder;
use crate::error::{HydeError, Result};
use crate::generation::Generator;
use crate::index::{DenseSearcher, SearchHit};
use crate::prompts::Promptor;
use crate::vector;
use std::sync::Arc;

/// Default number of hypothesis documents per query
pub const DEFAULT_SAMPLES: usize = 8;

/// HyDE orchestrator for one prompting style.
///
/// Holds shared, read-only handles to the backends; cheap to build per style.
pub struct Hyde {
    promptor: Promptor,
    generator: Arc<dyn Generator>,
    encoder: Arc<dyn Encoder>,
    searcher: Option<Arc<dyn DenseSearcher>>,
    samples: usize,
    include_query: bool,
}

impl Hyde {
    pub fn new(
        promptor: Promptor,
        generator: Arc<dyn Generator>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self {
            promptor,
            generator,
            encoder,
            searcher: None,
            samples: DEFAULT_SAMPLES,
            include_query: true,
        }
    }

    pub fn with_searcher(mut self, searcher: Arc<dyn DenseSearcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Whether `encode` puts the raw query vector in front of the hypothesis vectors
    pub fn with_include_query(mut self, include_query: bool) -> Self {
        self.include_query = include_query;
        self
    }

    /// Sample `samples` hypothesis documents for `query`
    pub async fn generate(&self, query: &str) -> Result<Vec<String>> {
        let prompt = self.promptor.render(query);
        self.generator.generate(&prompt, self.samples).await
    }

    /// One vector per input text: the query first (when included), then each
    /// hypothesis document in order.
    pub async fn encode(&self, query: &str, hypothesis_documents: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(hypothesis_documents.len() + 1);
        if self.include_query {
            vectors.push(self.encoder.encode(query).await?);
        }
        for doc in hypothesis_documents {
            vectors.push(self.encoder.encode(doc).await?);
        }
        Ok(vectors)
    }

    /// Component-wise mean of the vector set
    pub fn combine(&self, vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
        vector::mean(vectors)
    }

    /// generate -> encode -> combine
    pub async fn query_vector(&self, query: &str) -> Result<Vec<f32>> {
        let documents = self.generate(query).await?;
        log::debug!(
            "[{}] generated {} hypothesis documents for {:?}",
            self.promptor.style(),
            documents.len(),
            query
        );
        let vectors = self.encode(query, &documents).await?;
        self.combine(&vectors)
    }

    /// Dense search with a combined vector
    pub async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let searcher = self
            .searcher
            .as_ref()
            .ok_or_else(|| HydeError::Search("No dense searcher configured".to_string()))?;
        searcher.search(vector, k).await
    }

    /// Full retrieval: query_vector -> search
    pub async fn e2e_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let vector = self.query_vector(query).await?;
        self.search(&vector, k).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Deterministic backends shared by orchestrator and experiment tests.

    use crate::embeddings::Encoder;
    use crate::error::Result;
    use crate::generation::{Generator, RetryPolicy};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the prompt, so the output depends only on (style, query).
    pub struct EchoGenerator {
        pub calls: AtomicUsize,
        policy: RetryPolicy,
    }

    impl EchoGenerator {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                policy: RetryPolicy::default(),
            }
        }
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("passage for: {}", prompt))
        }

        fn retry_policy(&self) -> &RetryPolicy {
            &self.policy
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn temperature(&self) -> f32 {
            0.0
        }
    }

    /// Bag-of-bytes embedding: 16 buckets of byte counts.
    pub struct ByteHistogramEncoder;

    #[async_trait]
    impl Encoder for ByteHistogramEncoder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 16];
            for b in text.bytes() {
                v[(b % 16) as usize] += 1.0;
            }
            Ok(v)
        }

        fn model_name(&self) -> &str {
            "byte-histogram"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{ByteHistogramEncoder, EchoGenerator};
    use super::*;
    use crate::prompts::PromptStyle;
    use std::sync::atomic::Ordering;

    struct FixedSearcher;

    #[async_trait::async_trait]
    impl DenseSearcher for FixedSearcher {
        async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
            Ok((0..k)
                .map(|i| SearchHit {
                    docid: format!("d{}", i),
                    score: vector[0] - i as f32,
                })
                .collect())
        }
    }

    fn hyde(style: PromptStyle, generator: Arc<EchoGenerator>) -> Hyde {
        Hyde::new(Promptor::new(style), generator, Arc::new(ByteHistogramEncoder))
    }

    #[tokio::test]
    async fn test_generate_uses_style_prompt_and_sample_count() {
        let generator = Arc::new(EchoGenerator::new());
        let h = hyde(PromptStyle::WebSearchExpert, generator.clone()).with_samples(3);
        let docs = h.generate("what is rust").await.unwrap();
        assert_eq!(docs.len(), 3);
        assert!(docs[0].contains("expert"));
        assert!(docs[0].contains("what is rust"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_default_sample_count() {
        let generator = Arc::new(EchoGenerator::new());
        let docs = hyde(PromptStyle::WebSearch, generator).generate("q").await.unwrap();
        assert_eq!(docs.len(), DEFAULT_SAMPLES);
    }

    #[tokio::test]
    async fn test_encode_includes_query_first() {
        let h = hyde(PromptStyle::WebSearch, Arc::new(EchoGenerator::new()));
        let docs = vec!["aaa".to_string(), "bb".to_string()];
        let vectors = h.encode("q", &docs).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], ByteHistogramEncoder.encode("q").await.unwrap());
        assert_eq!(vectors[2], ByteHistogramEncoder.encode("bb").await.unwrap());

        let h = h.with_include_query(false);
        assert_eq!(h.encode("q", &docs).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_combine_single_vector_is_identity() {
        let h = hyde(PromptStyle::WebSearch, Arc::new(EchoGenerator::new())).with_include_query(false);
        let docs = vec!["only document".to_string()];
        let vectors = h.encode("ignored", &docs).await.unwrap();
        let combined = h.combine(&vectors).unwrap();
        assert_eq!(combined, ByteHistogramEncoder.encode("only document").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_vector_is_deterministic_for_deterministic_backends() {
        let h = hyde(PromptStyle::WebSearchNovice, Arc::new(EchoGenerator::new()));
        let a = h.query_vector("how do magnets work").await.unwrap();
        let b = h.query_vector("how do magnets work").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_search_requires_searcher() {
        let h = hyde(PromptStyle::WebSearch, Arc::new(EchoGenerator::new()));
        assert!(matches!(h.search(&[1.0], 3).await, Err(HydeError::Search(_))));

        let h = h.with_searcher(Arc::new(FixedSearcher)).with_samples(2);
        let hits = h.e2e_search("q", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].docid, "d0");
    }
}
