//! Pairwise prompting-style similarity experiment.
//!
//! For every style pair (s1, s2) with s1 at or before s2 in the configured order,
//! each judged query is run through one HyDE pipeline per style and the cosine
//! similarity of the two combined vectors is recorded. The results file is
//! rewritten after every completed pair.

use crate::embeddings::Encoder;
use crate::error::Result;
use crate::generation::Generator;
use crate::hyde::{Hyde, DEFAULT_SAMPLES};
use crate::prompts::{PromptStyle, Promptor};
use crate::results::SimilarityResults;
use crate::topics::{Qrels, TopicSet};
use crate::vector::try_cosine_similarity;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ExperimentOptions {
    pub samples: usize,
    pub include_query: bool,
    /// Leave pairs already present in the results file untouched
    pub skip_completed: bool,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            include_query: true,
            skip_completed: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentSummary {
    pub pairs_computed: usize,
    pub pairs_skipped: usize,
    pub queries_per_pair: usize,
    pub unjudged_queries: usize,
}

pub struct SimilarityExperiment {
    generator: Arc<dyn Generator>,
    encoder: Arc<dyn Encoder>,
    styles: Vec<PromptStyle>,
    results_path: PathBuf,
    options: ExperimentOptions,
}

impl SimilarityExperiment {
    pub fn new(
        generator: Arc<dyn Generator>,
        encoder: Arc<dyn Encoder>,
        styles: Vec<PromptStyle>,
        results_path: PathBuf,
        options: ExperimentOptions,
    ) -> Self {
        Self {
            generator,
            encoder,
            styles,
            results_path,
            options,
        }
    }

    /// (s1, s2) with s1 at or before s2: upper triangle including the diagonal
    pub fn style_pairs(&self) -> Vec<(PromptStyle, PromptStyle)> {
        let mut pairs = Vec::new();
        for (i, s1) in self.styles.iter().enumerate() {
            for s2 in &self.styles[i..] {
                pairs.push((*s1, *s2));
            }
        }
        pairs
    }

    fn pipeline(&self, style: PromptStyle) -> Hyde {
        Hyde::new(
            Promptor::new(style),
            self.generator.clone(),
            self.encoder.clone(),
        )
        .with_samples(self.options.samples)
        .with_include_query(self.options.include_query)
    }

    pub async fn run(&self, topics: &TopicSet, qrels: &Qrels) -> Result<ExperimentSummary> {
        let mut results = SimilarityResults::load_or_default(&self.results_path)?;
        let (judged, unjudged) = topics.judged(qrels);
        if unjudged > 0 {
            log::warn!(
                "Skipping {} of {} topics without relevance judgments",
                unjudged,
                topics.len()
            );
        }

        let mut summary = ExperimentSummary {
            queries_per_pair: judged.len(),
            unjudged_queries: unjudged,
            ..Default::default()
        };

        let pairs = self.style_pairs();
        for (n, (s1, s2)) in pairs.iter().enumerate() {
            let (l1, l2) = (s1.label(), s2.label());
            if self.options.skip_completed && results.has_pair(l1, l2) {
                log::info!("[{}/{}] {} vs {}: already done, skipping", n + 1, pairs.len(), l1, l2);
                summary.pairs_skipped += 1;
                continue;
            }

            let start = Instant::now();
            log::info!("[{}/{}] {} vs {}", n + 1, pairs.len(), l1, l2);
            let hyde1 = self.pipeline(*s1);
            let hyde2 = self.pipeline(*s2);

            results.clear_pair(l1, l2);
            for topic in &judged {
                let v1 = hyde1.query_vector(&topic.title).await?;
                let v2 = hyde2.query_vector(&topic.title).await?;
                let similarity = try_cosine_similarity(&v1, &v2)?;
                log::debug!("{} {} vs {}: {:.4}", topic.id, l1, l2, similarity);
                results.insert(l1, l2, &topic.id, similarity as f64);
            }

            results.save(&self.results_path)?;
            summary.pairs_computed += 1;
            log::info!(
                "{} vs {}: {} queries in {:?}, saved to {}",
                l1,
                l2,
                judged.len(),
                start.elapsed(),
                self.results_path.display()
            );
        }

        Ok(summary)
    }
}
