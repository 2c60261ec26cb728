use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use techinsight::config::DEFAULT_BATCH_SIZE;
use techinsight::telemetry::init_tracing;
use techinsight::vector_store::verify_dimension;
use techinsight::{
    ArticleSource, DatabaseArgs, Embedder, IngestOutcome, IngestPipeline, PgArticleStore,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "techinsight-seed",
    about = "Seed an empty articles table from CSV with hashed embeddings"
)]
struct SeedCli {
    #[command(flatten)]
    db: DatabaseArgs,

    /// CSV with id,title,content,author,category,published_at columns
    #[arg(long, env = "CSV_PATH", default_value = "/data/articles.csv")]
    csv_path: PathBuf,

    /// Set to false to skip seeding entirely
    #[arg(
        long,
        env = "RUN_SEED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    run_seed: bool,

    /// Rows committed per INSERT transaction
    #[arg(long, env = "TECHINSIGHT_SEED_BATCH", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SeedCli::parse();
    init_tracing(&cli.log_level);

    if !cli.run_seed {
        info!("RUN_SEED=false; skipping");
        return Ok(());
    }
    if !cli.csv_path.exists() {
        info!(path = %cli.csv_path.display(), "CSV not found; skipping");
        return Ok(());
    }

    let table = cli.db.table_name()?;
    let embedding = cli.db.embedding_config()?;
    let embedder = Embedder::new(&embedding);
    let mut store = PgArticleStore::connect(&cli.db.connection_url(), table)
        .await
        .context("failed to connect to Postgres")?;
    if cli.db.prepare_table {
        store
            .ensure_schema(embedding.dim())
            .await
            .context("failed to prepare articles table")?;
    }
    verify_dimension(&store, &embedder)
        .await
        .context("embedding dimension check failed")?;

    let source = ArticleSource::open(&cli.csv_path)
        .with_context(|| format!("failed to open {}", cli.csv_path.display()))?;
    let pipeline = IngestPipeline::new(embedder, cli.batch_size);
    let outcome = pipeline
        .run(&mut store, source)
        .await
        .context("article ingestion failed")?;

    match outcome {
        IngestOutcome::Skipped { existing } => {
            info!(existing, "already seeded; nothing to do");
        }
        IngestOutcome::Completed { inserted, batches } => {
            info!(
                inserted,
                batches,
                table = %store.table().qualified(),
                "seeding complete"
            );
        }
    }
    Ok(())
}
