use anyhow::Result;
use clap::Parser;
use hydebench::embeddings::build_encoder;
use hydebench::index::collection::CollectionReader;
use hydebench::index::{DenseIndex, Passage};
use hydebench::Config;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "index")]
#[command(about = "Encode a docid<TAB>text collection into a dense passage index")]
struct Args {
    /// Collection TSV, one passage per line
    #[arg(long)]
    collection: PathBuf,

    /// Output index file (default: index.path from config)
    #[arg(long = "index_path")]
    index_path: Option<PathBuf>,

    /// Embedding model (default: embeddings.model from config)
    #[arg(long)]
    encoder: Option<String>,

    /// Stop after this many passages
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let mut config = Config::load_unvalidated()?;
    if let Some(model) = &args.encoder {
        config.embeddings.model = model.clone();
    }
    config.validate()?;
    let index_path = args.index_path.unwrap_or_else(|| config.index.path.clone());

    let encoder = build_encoder(&config.embeddings)?;
    let index = DenseIndex::create(&index_path).await?;

    if let Some(existing) = index.meta("encoder").await? {
        if existing != encoder.model_name() {
            anyhow::bail!(
                "Index {} was built with encoder {}, not {}",
                index_path.display(),
                existing,
                encoder.model_name()
            );
        }
    }
    index.set_meta("encoder", encoder.model_name()).await?;

    log::info!(
        "Indexing {} into {} with {}",
        args.collection.display(),
        index_path.display(),
        encoder.model_name()
    );

    let start = Instant::now();
    let mut reader = CollectionReader::open(&args.collection)?;
    let limit = args.limit.unwrap_or(usize::MAX);
    let batch_size = config.embeddings.batch_size;
    let mut total = 0usize;

    while total < limit {
        let batch = reader.next_batch(batch_size.min(limit - total))?;
        if batch.is_empty() {
            break;
        }
        let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = encoder.encode_batch(&texts).await?;

        let passages: Vec<Passage> = batch
            .into_iter()
            .zip(embeddings)
            .map(|((docid, text), embedding)| Passage {
                docid,
                text,
                embedding,
            })
            .collect();
        total += index.add_passages(passages).await?;

        if total % (batch_size * 100) < batch_size {
            log::info!("Indexed {} passages ({:?})", total, start.elapsed());
        }
    }

    log::info!(
        "Indexing complete: {} passages written, {} in index, took {:?}",
        total,
        index.len().await?,
        start.elapsed()
    );

    Ok(())
}
