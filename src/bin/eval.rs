//! Evaluation CLI: score a TREC run file with the external evaluator and
//! report MAP, NDCG@10 and Recall@1000.

use clap::Parser;
use hydebench::eval::{evaluate_metrics, CommandEvalRunner};
use hydebench::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eval")]
struct Args {
    /// TREC run file (`qid Q0 docid rank score tag`)
    run_file: PathBuf,

    /// Topic set name understood by the evaluator, e.g. dl19-passage
    #[arg(long = "topics_name", default_value = "dl19-passage")]
    topics_name: String,

    /// Metrics to compute (default: evaluation.metrics from config)
    #[arg(long, value_delimiter = ',')]
    metrics: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;

    if !args.run_file.is_file() {
        anyhow::bail!("Run file not found: {}", args.run_file.display());
    }

    let metrics = args.metrics.unwrap_or_else(|| config.evaluation.metrics.clone());
    let runner = CommandEvalRunner::new(&config.evaluation.command)?;
    let report = evaluate_metrics(&runner, &metrics, &args.run_file, &args.topics_name).await?;

    println!("\n=== {} ({}) ===", args.run_file.display(), args.topics_name);
    for (metric, value) in &report.values {
        println!("{:<12} {:.4}", metric, value);
    }

    if !report.is_complete() {
        println!("\nNot reported: {}", report.unparsed.join(", "));
        std::process::exit(1);
    }

    Ok(())
}
