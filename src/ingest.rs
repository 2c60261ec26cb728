//! Idempotent bulk seeding of the article store.
//!
//! The pipeline runs `CHECK_EMPTY -> (SKIP | STREAM)`: a store that already
//! holds any row is left untouched; an empty one is filled from a record
//! stream in fixed-size transactional batches, followed by a statistics
//! refresh. Batches that committed before a failure stay committed; a retry
//! hits the guard again instead of re-inserting.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::article::{parse_timestamp, Article, EmbeddedArticle};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::vector_store::ArticleStore;

/// What an ingestion run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The store already held `existing` rows; nothing was written.
    Skipped {
        /// Rows found by the emptiness check.
        existing: u64,
    },
    /// `inserted` rows were written across `batches` commits.
    Completed {
        /// Rows written.
        inserted: usize,
        /// Transactions committed.
        batches: usize,
    },
}

impl IngestOutcome {
    /// Rows written by this run.
    pub fn inserted(&self) -> usize {
        match self {
            Self::Skipped { .. } => 0,
            Self::Completed { inserted, .. } => *inserted,
        }
    }
}

/// Embeds records and writes them to a store in batches.
#[derive(Debug, Clone, Copy)]
pub struct IngestPipeline {
    embedder: Embedder,
    batch_size: usize,
}

impl IngestPipeline {
    /// Pipeline flushing every `batch_size` rows (at least one).
    pub fn new(embedder: Embedder, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Rows per transaction.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Seeds `store` from `records` unless it already has data.
    ///
    /// Records are pulled one at a time, so memory stays bounded by one batch.
    /// The first record error aborts the run.
    pub async fn run<S, I>(&self, store: &mut S, records: I) -> Result<IngestOutcome>
    where
        S: ArticleStore + ?Sized,
        I: IntoIterator<Item = Result<Article>>,
    {
        let existing = store.count().await?;
        if existing > 0 {
            info!(existing, "store already seeded; skipping ingestion");
            return Ok(IngestOutcome::Skipped { existing });
        }

        let mut batch: Vec<EmbeddedArticle> = Vec::with_capacity(self.batch_size);
        let mut inserted = 0usize;
        let mut batches = 0usize;
        for record in records {
            let article = record?;
            let embedding = self.embedder.embed(&article.embedding_text());
            batch.push(EmbeddedArticle { article, embedding });
            if batch.len() >= self.batch_size {
                inserted += flush(store, &mut batch).await?;
                batches += 1;
                info!(batch = batches, inserted, "committed batch");
            }
        }
        if !batch.is_empty() {
            inserted += flush(store, &mut batch).await?;
            batches += 1;
            info!(batch = batches, inserted, "committed final batch");
        }

        store.refresh_statistics().await?;
        debug!("refreshed storage statistics");
        Ok(IngestOutcome::Completed { inserted, batches })
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(Embedder::default(), DEFAULT_BATCH_SIZE)
    }
}

/// Commits `batch` and clears it. On failure the buffer is left as it was.
async fn flush<S>(store: &mut S, batch: &mut Vec<EmbeddedArticle>) -> Result<usize>
where
    S: ArticleStore + ?Sized,
{
    store.insert_batch(batch).await?;
    let written = batch.len();
    batch.clear();
    Ok(written)
}

/// CSV row as it appears on disk; every column is optional text.
#[derive(Debug, Deserialize)]
struct RawArticleRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

impl RawArticleRow {
    fn into_article(self, record: u64) -> Result<Article> {
        let raw_id = self.id.ok_or(Error::MissingArticleId { record })?;
        let id = raw_id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::InvalidArticleId {
                record,
                value: raw_id.clone(),
            })?;
        Ok(Article {
            id,
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            author: non_empty(self.author),
            category: non_empty(self.category),
            published_at: self.published_at.as_deref().and_then(parse_timestamp),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Streaming reader over a headed CSV file with columns
/// `id,title,content,author,category,published_at` (any order; extra
/// columns ignored).
pub struct ArticleSource<R: Read> {
    rows: csv::DeserializeRecordsIntoIter<R, RawArticleRow>,
    record: u64,
}

impl ArticleSource<File> {
    /// Opens a CSV file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = csv::Reader::from_path(path)?;
        Ok(Self::from_csv(reader))
    }
}

impl<R: Read> ArticleSource<R> {
    /// Reads CSV from any byte stream.
    pub fn from_reader(reader: R) -> Self {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv(reader: csv::Reader<R>) -> Self {
        Self {
            rows: reader.into_deserialize(),
            record: 0,
        }
    }
}

impl<R: Read> Iterator for ArticleSource<R> {
    type Item = Result<Article>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        self.record += 1;
        Some(
            row.map_err(Error::from)
                .and_then(|raw| raw.into_article(self.record)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn csv_rows_become_articles() {
        let csv = "id,title,content,author,category,published_at\n\
                   1,Rust,Ownership rules,ann,lang,2024-01-02T03:04:05Z\n\
                   2,Go,Goroutines,,,not-a-date\n";
        let articles: Vec<Article> = ArticleSource::from_reader(csv.as_bytes())
            .collect::<Result<_>>()
            .expect("valid csv");
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, 1);
        assert_eq!(articles[0].author.as_deref(), Some("ann"));
        assert_eq!(
            articles[0].published_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single()
        );
        assert_eq!(articles[1].author, None);
        assert_eq!(articles[1].category, None);
        assert_eq!(articles[1].published_at, None);
    }

    #[test]
    fn non_numeric_id_is_an_error() {
        let csv = "id,title,content\n1,a,b\nabc,c,d\n";
        let results: Vec<Result<Article>> = ArticleSource::from_reader(csv.as_bytes()).collect();
        assert!(results[0].is_ok());
        match &results[1] {
            Err(Error::InvalidArticleId { record, value }) => {
                assert_eq!(*record, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("expected invalid id, got {other:?}"),
        }
    }

    #[test]
    fn missing_id_is_an_error() {
        let csv = "id,title,content\n,a,b\n";
        let mut source = ArticleSource::from_reader(csv.as_bytes());
        assert!(matches!(
            source.next(),
            Some(Err(Error::MissingArticleId { record: 1 }))
        ));

        let no_column = "title,content\na,b\n";
        let mut source = ArticleSource::from_reader(no_column.as_bytes());
        assert!(matches!(
            source.next(),
            Some(Err(Error::MissingArticleId { record: 1 }))
        ));
    }

    #[test]
    fn outcome_reports_inserted_rows() {
        assert_eq!(IngestOutcome::Skipped { existing: 3 }.inserted(), 0);
        assert_eq!(
            IngestOutcome::Completed {
                inserted: 7,
                batches: 2
            }
            .inserted(),
            7
        );
    }
}
