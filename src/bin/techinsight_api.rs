use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use techinsight::api::{cors_layer, router, AppState};
use techinsight::config::split_list;
use techinsight::telemetry::init_tracing;
use techinsight::vector_store::verify_dimension;
use techinsight::{DatabaseArgs, Embedder, PgArticleStore, SearchConfig, SimilarityRanker};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "techinsight-api",
    about = "HTTP API for article CRUD and pgvector semantic search"
)]
struct ApiCli {
    #[command(flatten)]
    db: DatabaseArgs,

    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "TECHINSIGHT_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Allowed CORS origins, comma separated
    #[arg(
        long,
        env = "TECHINSIGHT_CORS_ORIGINS",
        default_value = "http://localhost:3000,http://localhost:3001,http://127.0.0.1:3000,http://127.0.0.1:3001"
    )]
    cors_origins: String,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ApiCli::parse();
    init_tracing(&cli.log_level);

    let table = cli.db.table_name()?;
    let embedding = cli.db.embedding_config()?;
    let embedder = Embedder::new(&embedding);
    let store = PgArticleStore::connect(&cli.db.connection_url(), table)
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

    let ranker = SimilarityRanker::new(embedder, SearchConfig::default());
    let state = AppState::new(Arc::new(store), ranker);
    let app = router(state).layer(cors_layer(&split_list(&cli.cors_origins)));

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, dim = embedding.dim(), "techinsight-api listening");
    axum::serve(listener, app)
        .await
        .context("server shutdown")?;
    Ok(())
}
