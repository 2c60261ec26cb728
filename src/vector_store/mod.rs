//! Storage collaborator for articles and their embeddings.
//!
//! The [`ArticleStore`] trait is the only seam between the embedding/ranking
//! core and persistence. [`PgArticleStore`] backs it with Postgres + pgvector;
//! [`MemoryArticleStore`] keeps everything in process for tests and demos.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::article::{Article, ArticleDraft, EmbeddedArticle};
use crate::embedder::Embedder;
use crate::error::{Error, Result};

pub use memory::MemoryArticleStore;
pub use postgres::PgArticleStore;

/// Persistence operations needed by the ranker, the ingestion pipeline and the
/// HTTP layer.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Declared width of the embedding column, when the store knows it.
    async fn embedding_dim(&self) -> Result<Option<usize>>;

    /// Number of stored articles.
    async fn count(&self) -> Result<u64>;

    /// Inserts every row in a single transaction.
    async fn insert_batch(&mut self, rows: &[EmbeddedArticle]) -> Result<()>;

    /// Refreshes planner statistics after a bulk load.
    async fn refresh_statistics(&self) -> Result<()>;

    /// Articles whose cosine distance to `query` is at most `max_distance`,
    /// closest first (ties by id), at most `limit` of them.
    async fn nearest(
        &self,
        query: &[f32],
        max_distance: f64,
        limit: usize,
    ) -> Result<Vec<(Article, f64)>>;

    /// Page of articles, newest publication first (undated last), then by id
    /// descending.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Article>>;

    /// Article by id.
    async fn get(&self, id: i64) -> Result<Option<Article>>;

    /// Stores a new article under the next free id (`max(id) + 1`).
    async fn insert(&self, draft: &ArticleDraft, embedding: &[f32]) -> Result<Article>;

    /// Overwrites every field of an existing article. `None` when the id is
    /// unknown.
    async fn replace(&self, article: &Article, embedding: &[f32]) -> Result<Option<Article>>;

    /// Deletes an article; `false` when the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Fails when the store's vector column is declared with a different width
/// than the embedder produces.
pub async fn verify_dimension<S>(store: &S, embedder: &Embedder) -> Result<()>
where
    S: ArticleStore + ?Sized,
{
    match store.embedding_dim().await? {
        Some(actual) if actual != embedder.dim() => Err(Error::DimensionMismatch {
            expected: embedder.dim(),
            actual,
        }),
        _ => Ok(()),
    }
}

/// Fully-qualified Postgres table name (schema + table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new<S, T>(schema: S, table: T) -> Result<Self>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() {
            return Err(Error::InvalidTableName("schema name is required".into()));
        }
        if table.trim().is_empty() {
            return Err(Error::InvalidTableName("table name is required".into()));
        }
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Single-quoted literal form, usable with `::regclass`.
    pub fn regclass_literal(&self) -> String {
        format!("'{}'", self.qualified().replace('\'', "''"))
    }

    /// Returns the raw schema string.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the raw table string.
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self {
            schema: "public".into(),
            table: "articles".into(),
        }
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn qualified_names_are_quoted() {
        let table = TableName::new("public", "articles").expect("valid");
        assert_eq!(table.qualified(), "\"public\".\"articles\"");
        let odd = TableName::new("my\"schema", "it's").expect("valid");
        assert_eq!(odd.qualified(), "\"my\"\"schema\".\"it's\"");
        assert_eq!(odd.regclass_literal(), "'\"my\"\"schema\".\"it''s\"'");
    }

    #[test]
    fn blank_identifiers_rejected() {
        assert!(matches!(
            TableName::new(" ", "articles"),
            Err(Error::InvalidTableName(_))
        ));
        assert!(matches!(
            TableName::new("public", ""),
            Err(Error::InvalidTableName(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dimension_mismatch_is_rejected() {
        let store = MemoryArticleStore::new(128);
        let embedder = Embedder::default();
        match verify_dimension(&store, &embedder).await {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (384, 128));
            }
            other => panic!("expected mismatch, got {other:?}"),
        }

        let narrow = Embedder::new(&EmbeddingConfig::new(128).expect("valid"));
        verify_dimension(&store, &narrow).await.expect("dims agree");
    }
}
