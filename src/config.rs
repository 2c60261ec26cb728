//! Process-wide embedding and search settings plus the CLI pieces that build
//! them.
//!
//! Settings are built once at startup, never mutated afterwards, and shared by
//! reference (or `Arc`) between every writer and reader of stored vectors.

use clap::Args;

use crate::error::{Error, Result};
use crate::vector_store::TableName;

/// Default embedding width; matches the `VECTOR(384)` column of the schema.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Default number of rows per ingestion transaction.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Embedding dimension shared by the embedder and the vector column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbeddingConfig {
    dim: usize,
}

impl EmbeddingConfig {
    /// Validates and wraps the dimension.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(Self { dim })
    }

    /// Configured embedding dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

/// Defaults and bounds applied to search requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// Hits returned when the caller does not pass a limit.
    pub default_limit: usize,
    /// Largest accepted limit.
    pub max_limit: usize,
    /// Distance threshold used when the caller does not pass one.
    pub default_max_distance: f64,
    /// Largest accepted threshold (cosine distance tops out at 2).
    pub distance_ceiling: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            default_max_distance: 0.6,
            distance_ceiling: 2.0,
        }
    }
}

/// Database connection and table flags shared by the binaries.
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string (postgres://, postgresql://, or SQLAlchemy-style postgresql+driver://)
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgresql://tech:tech@db:5432/techinsight"
    )]
    pub database_url: String,

    /// Schema holding the articles table
    #[arg(long, env = "TECHINSIGHT_SCHEMA", default_value = "public")]
    pub schema: String,

    /// Articles table name
    #[arg(long, env = "TECHINSIGHT_TABLE", default_value = "articles")]
    pub table: String,

    /// Embedding dimension; must match the table's vector column
    #[arg(long, env = "EMBEDDING_DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Create the vector extension and articles table when missing
    #[arg(
        long,
        env = "TECHINSIGHT_PREPARE_TABLE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub prepare_table: bool,
}

impl DatabaseArgs {
    /// Connection string with any SQLAlchemy driver suffix stripped.
    pub fn connection_url(&self) -> String {
        normalize_database_url(&self.database_url)
    }

    /// Validated table identifier.
    pub fn table_name(&self) -> Result<TableName> {
        TableName::new(self.schema.clone(), self.table.clone())
    }

    /// Validated embedding settings.
    pub fn embedding_config(&self) -> Result<EmbeddingConfig> {
        EmbeddingConfig::new(self.embedding_dim)
    }
}

/// Rewrites `postgresql+asyncpg://` and `postgresql+psycopg://` URLs into the
/// plain form accepted by `tokio-postgres`.
pub fn normalize_database_url(url: &str) -> String {
    url.replace("postgresql+asyncpg://", "postgresql://")
        .replace("postgresql+psycopg://", "postgresql://")
}

/// Splits a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_rejected() {
        assert!(matches!(EmbeddingConfig::new(0), Err(Error::ZeroDimension)));
        assert_eq!(EmbeddingConfig::new(8).expect("valid").dim(), 8);
    }

    #[test]
    fn sqlalchemy_urls_are_normalized() {
        assert_eq!(
            normalize_database_url("postgresql+asyncpg://tech:tech@db:5432/techinsight"),
            "postgresql://tech:tech@db:5432/techinsight"
        );
        assert_eq!(
            normalize_database_url("postgresql+psycopg://u@h/d"),
            "postgresql://u@h/d"
        );
        assert_eq!(normalize_database_url("postgres://u@h/d"), "postgres://u@h/d");
    }

    #[test]
    fn list_splitting_drops_blanks() {
        assert_eq!(
            split_list("http://a, ,http://b,"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }
}
