//! Nearest-neighbor ranking of stored articles against a free-text query.

use serde::Serialize;
use tracing::debug;

use crate::article::Article;
use crate::config::SearchConfig;
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::vector_store::ArticleStore;

/// One ranked article. Lives for a single search call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// `1 / (1 + distance)`, in `(0, 1]`.
    pub score: f64,
    /// Cosine distance between query and article embeddings.
    pub distance: f64,
    /// The matched article.
    pub article: Article,
}

impl SearchHit {
    /// Packages a store row with its derived score.
    pub fn new(article: Article, distance: f64) -> Self {
        Self {
            score: score(distance),
            distance,
            article,
        }
    }
}

/// Relevance score derived from a distance; strictly decreasing.
pub fn score(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}

/// Validated per-call search bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    limit: usize,
    max_distance: f64,
}

impl SearchParams {
    /// Fills in defaults and checks bounds against `config`.
    pub fn new(
        config: &SearchConfig,
        limit: Option<usize>,
        max_distance: Option<f64>,
    ) -> Result<Self> {
        let limit = limit.unwrap_or(config.default_limit);
        if limit < 1 || limit > config.max_limit {
            return Err(Error::LimitOutOfRange {
                value: limit,
                min: 1,
                max: config.max_limit,
            });
        }
        let max_distance = max_distance.unwrap_or(config.default_max_distance);
        if !(0.0..=config.distance_ceiling).contains(&max_distance) {
            return Err(Error::DistanceOutOfRange {
                value: max_distance,
                min: 0.0,
                max: config.distance_ceiling,
            });
        }
        Ok(Self {
            limit,
            max_distance,
        })
    }

    /// Maximum number of hits.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Inclusive distance threshold.
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }
}

/// Embeds queries and turns store rows into thresholded, ordered hits.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityRanker {
    embedder: Embedder,
    config: SearchConfig,
}

impl SimilarityRanker {
    /// Ranker using `embedder` for queries and `config` for request bounds.
    pub fn new(embedder: Embedder, config: SearchConfig) -> Self {
        Self { embedder, config }
    }

    /// Embedder shared with the write path.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Request bounds.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Validates raw request values against this ranker's bounds.
    pub fn params(&self, limit: Option<usize>, max_distance: Option<f64>) -> Result<SearchParams> {
        SearchParams::new(&self.config, limit, max_distance)
    }

    /// Articles closest in meaning to `query`.
    ///
    /// Hits are ordered by non-decreasing distance (ties by id), never exceed
    /// `params.max_distance()`, and number at most `params.limit()`. No match
    /// is an empty list; so is a query without tokens, since it embeds to the
    /// zero vector.
    pub async fn search<S>(
        &self,
        store: &S,
        query: &str,
        params: SearchParams,
    ) -> Result<Vec<SearchHit>>
    where
        S: ArticleStore + ?Sized,
    {
        let qvec = self.embedder.embed(query);
        let rows = store
            .nearest(&qvec, params.max_distance, params.limit)
            .await?;
        let hits = rank(rows, params);
        debug!(query, hits = hits.len(), "semantic search");
        Ok(hits)
    }
}

/// Applies threshold, ordering and limit to raw `(article, distance)` rows.
pub fn rank(rows: Vec<(Article, f64)>, params: SearchParams) -> Vec<SearchHit> {
    let mut rows: Vec<(Article, f64)> = rows
        .into_iter()
        .filter(|(_, distance)| *distance <= params.max_distance)
        .collect();
    rows.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
    rows.truncate(params.limit);
    rows.into_iter()
        .map(|(article, distance)| SearchHit::new(article, distance.max(0.0)))
        .collect()
}
