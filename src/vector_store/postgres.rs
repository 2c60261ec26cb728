//! Postgres + pgvector implementation of [`ArticleStore`].

use async_trait::async_trait;
use pgvector::Vector;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error};

use super::{ArticleStore, TableName};
use crate::article::{Article, ArticleDraft, EmbeddedArticle};
use crate::error::{Error, Result};

const ARTICLE_COLUMNS: &str = "id, title, content, author, category, published_at";

/// Article table in a pgvector-enabled Postgres database.
pub struct PgArticleStore {
    client: Client,
    table: TableName,
    sql: Statements,
}

/// SQL text rendered once per table.
struct Statements {
    count: String,
    insert_row: String,
    analyze: String,
    nearest: String,
    list: String,
    get: String,
    insert_next_id: String,
    replace: String,
    delete: String,
}

impl Statements {
    fn new(table: &TableName) -> Self {
        let t = table.qualified();
        Self {
            count: format!("SELECT COUNT(*) FROM {t}"),
            insert_row: format!(
                "INSERT INTO {t} \
                    (id, title, content, author, category, published_at, embedding) \
                    VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ),
            analyze: format!("ANALYZE {t}"),
            nearest: format!(
                "SELECT {ARTICLE_COLUMNS}, (embedding <=> $1) AS distance \
                FROM {t} \
                WHERE embedding IS NOT NULL \
                  AND (embedding <=> $1) <= $2 \
                ORDER BY distance ASC, id ASC \
                LIMIT $3"
            ),
            list: format!(
                "SELECT {ARTICLE_COLUMNS} FROM {t} \
                ORDER BY published_at DESC NULLS LAST, id DESC \
                LIMIT $1 OFFSET $2"
            ),
            get: format!("SELECT {ARTICLE_COLUMNS} FROM {t} WHERE id = $1"),
            insert_next_id: format!(
                "INSERT INTO {t} \
                    (id, title, content, author, category, published_at, embedding) \
                VALUES \
                    ((SELECT COALESCE(MAX(id), 0) + 1 FROM {t}), $1, $2, $3, $4, $5, $6) \
                RETURNING {ARTICLE_COLUMNS}"
            ),
            replace: format!(
                "UPDATE {t} \
                SET title = $1, \
                    content = $2, \
                    author = $3, \
                    category = $4, \
                    published_at = $5, \
                    embedding = $6, \
                    updated_at = NOW() \
                WHERE id = $7 \
                RETURNING {ARTICLE_COLUMNS}"
            ),
            delete: format!("DELETE FROM {t} WHERE id = $1"),
        }
    }
}

impl PgArticleStore {
    /// Connects to Postgres and drives the connection on a background task.
    pub async fn connect(database_url: &str, table: TableName) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "postgres connection error");
            }
        });
        Ok(Self::new(client, table))
    }

    /// Wraps an already connected client.
    pub fn new(client: Client, table: TableName) -> Self {
        let sql = Statements::new(&table);
        Self { client, table, sql }
    }

    /// Target table.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Creates the pgvector extension and the articles table when missing.
    pub async fn ensure_schema(&self, dim: usize) -> Result<()> {
        if dim == 0 {
            return Err(Error::ZeroDimension);
        }
        self.client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGINT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                author TEXT,
                category TEXT,
                published_at TIMESTAMPTZ,
                embedding VECTOR({dim}),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            self.table.qualified()
        );
        self.client.execute(&ddl, &[]).await?;
        debug!(table = %self.table.qualified(), dim, "articles table ready");
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn embedding_dim(&self) -> Result<Option<usize>> {
        // pgvector records the declared width in atttypmod; -1 means unconstrained.
        let row = self
            .client
            .query_opt(
                "SELECT a.atttypmod \
                FROM pg_attribute a \
                WHERE a.attrelid = to_regclass($1) \
                  AND a.attname = 'embedding' \
                  AND NOT a.attisdropped",
                &[&self.table.qualified()],
            )
            .await?;
        Ok(row
            .map(|row| row.get::<_, i32>(0))
            .and_then(|typmod| usize::try_from(typmod).ok())
            .filter(|dim| *dim > 0))
    }

    async fn count(&self) -> Result<u64> {
        let row = self.client.query_one(self.sql.count.as_str(), &[]).await?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn insert_batch(&mut self, rows: &[EmbeddedArticle]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let transaction = self.client.transaction().await?;
        let statement = transaction.prepare(&self.sql.insert_row).await?;
        for row in rows {
            let article = &row.article;
            let vector = Vector::from(row.embedding.clone());
            transaction
                .execute(
                    &statement,
                    &[
                        &article.id,
                        &article.title,
                        &article.content,
                        &article.author,
                        &article.category,
                        &article.published_at,
                        &vector,
                    ],
                )
                .await?;
        }
        transaction.commit().await?;
        Ok(())
    }

    async fn refresh_statistics(&self) -> Result<()> {
        self.client.batch_execute(&self.sql.analyze).await?;
        Ok(())
    }

    async fn nearest(
        &self,
        query: &[f32],
        max_distance: f64,
        limit: usize,
    ) -> Result<Vec<(Article, f64)>> {
        let vector = Vector::from(query.to_vec());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .client
            .query(self.sql.nearest.as_str(), &[&vector, &max_distance, &limit])
            .await?;
        Ok(rows
            .iter()
            .map(|row| (article_from_row(row), row.get::<_, f64>("distance")))
            .collect())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = self
            .client
            .query(self.sql.list.as_str(), &[&limit, &offset])
            .await?;
        Ok(rows.iter().map(article_from_row).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Article>> {
        let row = self.client.query_opt(self.sql.get.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(article_from_row))
    }

    async fn insert(&self, draft: &ArticleDraft, embedding: &[f32]) -> Result<Article> {
        let vector = Vector::from(embedding.to_vec());
        let published_at = draft.published_at();
        let row = self
            .client
            .query_one(
                self.sql.insert_next_id.as_str(),
                &[
                    &draft.title,
                    &draft.content,
                    &draft.author,
                    &draft.category,
                    &published_at,
                    &vector,
                ],
            )
            .await?;
        Ok(article_from_row(&row))
    }

    async fn replace(&self, article: &Article, embedding: &[f32]) -> Result<Option<Article>> {
        let vector = Vector::from(embedding.to_vec());
        let row = self
            .client
            .query_opt(
                self.sql.replace.as_str(),
                &[
                    &article.title,
                    &article.content,
                    &article.author,
                    &article.category,
                    &article.published_at,
                    &vector,
                    &article.id,
                ],
            )
            .await?;
        Ok(row.as_ref().map(article_from_row))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.client.execute(self.sql.delete.as_str(), &[&id]).await?;
        Ok(affected > 0)
    }
}

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author: row.get("author"),
        category: row.get("category"),
        published_at: row.get("published_at"),
    }
}
