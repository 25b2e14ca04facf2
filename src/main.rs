//! Prompting-style similarity experiment.
//!
//! For every pair of styles, runs HyDE for each judged topic under both styles
//! and records the cosine similarity of the combined query vectors in
//! `<run_directory>/cosine_similarity_results.json`.

use anyhow::{Context, Result};
use clap::Parser;
use hydebench::embeddings::build_encoder;
use hydebench::experiment::{ExperimentOptions, SimilarityExperiment};
use hydebench::generation::build_generator;
use hydebench::index::DenseIndex;
use hydebench::results::SimilarityResults;
use hydebench::topics::{Qrels, TopicSet};
use hydebench::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hydebench", about = "Cosine similarity of HyDE query vectors across prompting styles")]
struct Args {
    /// Generation model (config default: llama3.1)
    #[arg(long = "model_name")]
    model_name: Option<String>,

    /// Embedding model (config default: nomic-embed-text)
    #[arg(long)]
    encoder: Option<String>,

    /// Dense passage index (config default: ./indexes/contriever_msmarco.db)
    #[arg(long = "index_path")]
    index_path: Option<PathBuf>,

    /// Name of the prebuilt collection the index was built from
    #[arg(long = "prebuilt_index", default_value = "msmarco-v1-passage")]
    prebuilt_index: String,

    /// Output directory (config default: ./runs/)
    #[arg(long = "run_directory")]
    run_directory: Option<PathBuf>,

    #[arg(long = "topics_name", default_value = "dl19-passage")]
    topics_name: String,

    /// Comma-separated style labels, e.g. "web search,web search expert"
    #[arg(long, value_delimiter = ',')]
    styles: Option<Vec<String>>,

    /// Hypothesis documents per query (config default: 8)
    #[arg(long)]
    samples: Option<usize>,

    /// Keep style pairs already in the results file instead of recomputing them
    #[arg(long = "skip_completed")]
    skip_completed: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model_name {
            config.generation.model = model.clone();
        }
        if let Some(encoder) = &self.encoder {
            config.embeddings.model = encoder.clone();
        }
        if let Some(path) = &self.index_path {
            config.index.path = path.clone();
        }
        if let Some(dir) = &self.run_directory {
            config.hydebench.run_directory = dir.clone();
        }
        if let Some(styles) = &self.styles {
            config.experiment.styles = styles.iter().map(|s| s.trim().to_string()).collect();
        }
        if let Some(samples) = self.samples {
            config.generation.samples = samples;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load_unvalidated()?;
    args.apply(&mut config);

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.hydebench.log_level.as_str()),
    )
    .init();

    match Config::config_path() {
        Some(path) => log::info!("Configuration loaded from {}", path.display()),
        None => log::info!("No config file found, using defaults"),
    }
    config.validate()?;
    let styles = config.prompt_styles()?;

    log::info!(
        "Generator {} ({}), encoder {} ({}), prebuilt index {}",
        config.generation.model,
        config.generation.backend,
        config.embeddings.model,
        config.embeddings.backend,
        args.prebuilt_index
    );

    // Similarity does not search, but report the index the run is paired with.
    if config.index.path.is_file() {
        let index = DenseIndex::open(&config.index.path).await?;
        log::info!(
            "Dense index {}: {} passages",
            config.index.path.display(),
            index.len().await?
        );
    } else {
        log::info!(
            "No dense index at {}; not needed for the similarity experiment",
            config.index.path.display()
        );
    }

    let generator = build_generator(&config.generation)?;
    let encoder = build_encoder(&config.embeddings)?;

    let topics = TopicSet::load(config.data_dir(), &args.topics_name)?;
    let qrels = Qrels::load(config.data_dir(), &args.topics_name)?;

    let run_directory = config.run_directory().to_path_buf();
    std::fs::create_dir_all(&run_directory)
        .with_context(|| format!("Failed to create {}", run_directory.display()))?;
    let results_path = SimilarityResults::path_in(&run_directory);

    let experiment = SimilarityExperiment::new(
        generator,
        encoder.clone(),
        styles,
        results_path.clone(),
        ExperimentOptions {
            samples: config.generation.samples,
            include_query: config.embeddings.include_query,
            skip_completed: args.skip_completed,
        },
    );
    let summary = experiment.run(&topics, &qrels).await?;

    log::info!(
        "Done: {} pairs computed, {} skipped, {} queries per pair ({} unjudged), results in {}",
        summary.pairs_computed,
        summary.pairs_skipped,
        summary.queries_per_pair,
        summary.unjudged_queries,
        results_path.display()
    );
    if let Some(stats) = encoder.cache_stats() {
        log::info!(
            "Embedding cache: {} hits, {} misses, {} entries",
            stats.hits,
            stats.misses,
            stats.entries
        );
    }

    Ok(())
}
