use hydebench::eval::{pair_summaries, per_query_std, write_std_csv};
use hydebench::results::SimilarityResults;
use hydebench::Config;
use std::path::PathBuf;

/// CSV of per-query spread across cross-style pairs, inside the run directory
const STD_CSV: &str = "similarity_std.csv";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let run_directory: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.run_directory().to_path_buf());

    let results_path = SimilarityResults::path_in(&run_directory);
    if !results_path.exists() {
        println!("No results at {}.", results_path.display());
        println!("\nRun the similarity experiment first.");
        return Ok(());
    }
    let results = SimilarityResults::load_or_default(&results_path)?;

    println!("\n=== HyDE Style Similarity ({}) ===\n", results_path.display());
    println!(
        "{:<26} {:<26} {:>7} {:>8} {:>8}",
        "Style 1", "Style 2", "Queries", "Mean", "Std"
    );
    println!("{}", "-".repeat(79));
    for s in pair_summaries(&results) {
        println!(
            "{:<26} {:<26} {:>7} {:>8.4} {:>8.4}",
            s.style1, s.style2, s.queries, s.mean, s.std
        );
    }

    let rows = per_query_std(&results);
    if rows.is_empty() {
        println!("\nNo cross-style pairs yet; skipping {}.", STD_CSV);
        return Ok(());
    }
    let csv_path = run_directory.join(STD_CSV);
    write_std_csv(&csv_path, &rows)?;
    println!(
        "\nPer-query std over {} queries written to {}",
        rows.len(),
        csv_path.display()
    );

    Ok(())
}
