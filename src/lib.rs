#![warn(missing_docs)]
//! Core library for the techinsight article catalog: deterministic hashed
//! embeddings, pgvector-backed similarity search, and idempotent bulk seeding.

pub mod api;
pub mod article;
pub mod config;
pub mod embedder;
pub mod error;
pub mod ingest;
pub mod ranker;
pub mod telemetry;
pub mod vector_store;

pub use api::{router, AppState};
pub use article::{Article, ArticleDraft, ArticlePatch, EmbeddedArticle};
pub use config::{DatabaseArgs, EmbeddingConfig, SearchConfig};
pub use embedder::{embed, Embedder, EMBEDDING_VERSION};
pub use error::{Error, Result};
pub use ingest::{ArticleSource, IngestOutcome, IngestPipeline};
pub use ranker::{SearchHit, SearchParams, SimilarityRanker};
pub use vector_store::{ArticleStore, MemoryArticleStore, PgArticleStore, TableName};
