//! In-process [`ArticleStore`] with exact cosine-distance scans.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ArticleStore;
use crate::article::{Article, ArticleDraft, EmbeddedArticle};
use crate::embedder::l2_norm;
use crate::error::{Error, Result};

/// Article store held in memory.
///
/// Mirrors the pgvector behavior the rest of the crate relies on: cosine
/// distance, zero vectors never match, batches are all-or-nothing. It also
/// counts commits and statistics refreshes, and can be told to fail a given
/// batch, so ingestion can be observed without a database.
#[derive(Debug)]
pub struct MemoryArticleStore {
    dim: usize,
    rows: RwLock<BTreeMap<i64, StoredRow>>,
    commits: usize,
    refreshes: RwLock<usize>,
    fail_on_commit: Option<usize>,
}

#[derive(Debug, Clone)]
struct StoredRow {
    article: Article,
    embedding: Vec<f32>,
}

impl MemoryArticleStore {
    /// Empty store whose vector column is `dim` wide.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: RwLock::new(BTreeMap::new()),
            commits: 0,
            refreshes: RwLock::new(0),
            fail_on_commit: None,
        }
    }

    /// Makes the `n`-th call to `insert_batch` (1-based) fail without
    /// writing anything.
    pub fn fail_on_commit(mut self, n: usize) -> Self {
        self.fail_on_commit = Some(n);
        self
    }

    /// Number of successfully committed batches.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of statistics refreshes requested.
    pub async fn statistics_refreshes(&self) -> usize {
        *self.refreshes.read().await
    }

    fn check_dim(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: embedding.len(),
                actual: self.dim,
            });
        }
        Ok(())
    }
}

/// `1 - cos(a, b)`, or `None` when either side is the zero vector.
fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let similarity = (dot / (na * nb)).clamp(-1.0, 1.0);
    Some(1.0 - similarity)
}

/// Newest first, undated last, then id descending.
fn listing_order(a: &Article, b: &Article) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn embedding_dim(&self) -> Result<Option<usize>> {
        Ok(Some(self.dim))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().await.len() as u64)
    }

    async fn insert_batch(&mut self, rows: &[EmbeddedArticle]) -> Result<()> {
        if self.fail_on_commit == Some(self.commits + 1) {
            self.fail_on_commit = None;
            return Err(Error::StoreUnavailable("injected commit failure".into()));
        }
        let mut stored = self.rows.write().await;
        let mut batch_ids = BTreeSet::new();
        for row in rows {
            self.check_dim(&row.embedding)?;
            let id = row.article.id;
            if stored.contains_key(&id) || !batch_ids.insert(id) {
                return Err(Error::DuplicateArticleId(id));
            }
        }
        for row in rows {
            stored.insert(
                row.article.id,
                StoredRow {
                    article: row.article.clone(),
                    embedding: row.embedding.clone(),
                },
            );
        }
        drop(stored);
        self.commits += 1;
        Ok(())
    }

    async fn refresh_statistics(&self) -> Result<()> {
        *self.refreshes.write().await += 1;
        Ok(())
    }

    async fn nearest(
        &self,
        query: &[f32],
        max_distance: f64,
        limit: usize,
    ) -> Result<Vec<(Article, f64)>> {
        self.check_dim(query)?;
        let rows = self.rows.read().await;
        let mut hits: Vec<(Article, f64)> = rows
            .values()
            .filter_map(|row| {
                let distance = cosine_distance(query, &row.embedding)?;
                (distance <= max_distance).then(|| (row.article.clone(), distance))
            })
            .collect();
        hits.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let rows = self.rows.read().await;
        let mut articles: Vec<Article> = rows.values().map(|row| row.article.clone()).collect();
        articles.sort_by(listing_order);
        Ok(articles.into_iter().skip(offset).take(limit).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.rows.read().await.get(&id).map(|row| row.article.clone()))
    }

    async fn insert(&self, draft: &ArticleDraft, embedding: &[f32]) -> Result<Article> {
        self.check_dim(embedding)?;
        let mut rows = self.rows.write().await;
        let last = rows.keys().next_back().copied().unwrap_or(0);
        let id = last.checked_add(1).ok_or(Error::IdSpaceExhausted)?;
        let article = Article {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            author: draft.author.clone(),
            category: draft.category.clone(),
            published_at: draft.published_at(),
        };
        rows.insert(
            id,
            StoredRow {
                article: article.clone(),
                embedding: embedding.to_vec(),
            },
        );
        Ok(article)
    }

    async fn replace(&self, article: &Article, embedding: &[f32]) -> Result<Option<Article>> {
        self.check_dim(embedding)?;
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&article.id) else {
            return Ok(None);
        };
        row.article = article.clone();
        row.embedding = embedding.to_vec();
        Ok(Some(article.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}
