//! HyDE retrieval for one prompting style: writes a TREC run over the judged
//! topics and optionally scores it with the external evaluator.

use anyhow::{Context, Result};
use clap::Parser;
use hydebench::embeddings::build_encoder;
use hydebench::eval::{evaluate_metrics, CommandEvalRunner};
use hydebench::generation::build_generator;
use hydebench::index::DenseIndex;
use hydebench::run::{run_file_path, write_trec_run};
use hydebench::topics::{Qrels, TopicSet};
use hydebench::{Config, Hyde, Promptor};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "search")]
#[command(about = "Dense retrieval with HyDE query vectors, output as a TREC run file")]
struct Args {
    /// Prompting style label, e.g. "web search expert"
    #[arg(long, default_value = "web search")]
    style: String,

    #[arg(long = "topics_name", default_value = "dl19-passage")]
    topics_name: String,

    /// Hits per query (default: index.default_k from config)
    #[arg(long)]
    k: Option<usize>,

    #[arg(long = "model_name")]
    model_name: Option<String>,

    #[arg(long)]
    encoder: Option<String>,

    #[arg(long = "index_path")]
    index_path: Option<PathBuf>,

    #[arg(long = "run_directory")]
    run_directory: Option<PathBuf>,

    /// Run tag in the last column of the run file
    #[arg(long, default_value = "hyde")]
    tag: String,

    /// Score the run file with the configured evaluation command
    #[arg(long)]
    evaluate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let mut config = Config::load_unvalidated()?;
    if let Some(model) = &args.model_name {
        config.generation.model = model.clone();
    }
    if let Some(encoder) = &args.encoder {
        config.embeddings.model = encoder.clone();
    }
    if let Some(path) = &args.index_path {
        config.index.path = path.clone();
    }
    if let Some(dir) = &args.run_directory {
        config.hydebench.run_directory = dir.clone();
    }
    config.validate()?;
    let k = args.k.unwrap_or(config.index.default_k);
    let promptor = Promptor::from_label(&args.style)?;

    let index = DenseIndex::open(&config.index.path).await?;
    if let Some(built_with) = index.meta("encoder").await? {
        if built_with != config.embeddings.model {
            log::warn!(
                "Index was built with {}, querying with {}",
                built_with,
                config.embeddings.model
            );
        }
    }

    let hyde = Hyde::new(
        promptor,
        build_generator(&config.generation)?,
        build_encoder(&config.embeddings)?,
    )
    .with_searcher(Arc::new(index))
    .with_samples(config.generation.samples)
    .with_include_query(config.embeddings.include_query);

    let topics = TopicSet::load(config.data_dir(), &args.topics_name)?;
    let qrels = Qrels::load(config.data_dir(), &args.topics_name)?;
    let (judged, unjudged) = topics.judged(&qrels);
    if unjudged > 0 {
        log::warn!("Skipping {} topics without relevance judgments", unjudged);
    }

    std::fs::create_dir_all(config.run_directory())
        .with_context(|| format!("Failed to create {}", config.run_directory().display()))?;
    let run_file = run_file_path(config.run_directory(), &args.topics_name, &args.style);
    let mut writer = BufWriter::new(std::fs::File::create(&run_file)?);

    let start = Instant::now();
    for (i, topic) in judged.iter().enumerate() {
        let hits = hyde.e2e_search(&topic.title, k).await?;
        write_trec_run(&mut writer, &topic.id, &hits, &args.tag)?;
        log::info!(
            "[{}/{}] {}: {} hits",
            i + 1,
            judged.len(),
            topic.id,
            hits.len()
        );
    }
    writer.flush()?;
    log::info!(
        "Wrote {} ({} queries, {:?})",
        run_file.display(),
        judged.len(),
        start.elapsed()
    );

    if args.evaluate {
        let runner = CommandEvalRunner::new(&config.evaluation.command)?;
        let report =
            evaluate_metrics(&runner, &config.evaluation.metrics, &run_file, &args.topics_name)
                .await?;
        println!("\n=== {} on {} ===", args.style, args.topics_name);
        for (metric, value) in &report.values {
            println!("{:<12} {:.4}", metric, value);
        }
        if !report.is_complete() {
            println!("Not reported: {}", report.unparsed.join(", "));
        }
    }

    Ok(())
}
