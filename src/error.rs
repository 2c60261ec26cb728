//! Error type shared by the embedding, ranking, ingestion and storage layers.

use thiserror::Error;

/// Errors surfaced by the library. Embedding itself never fails; everything
/// here comes from configuration, caller input, record sources or the store.
#[derive(Debug, Error)]
pub enum Error {
    /// An embedding dimension of zero was configured.
    #[error("embedding dimension must be positive")]
    ZeroDimension,

    /// Embedder and store disagree on the vector width.
    #[error("store embeddings have {actual} dimensions, embedder produces {expected}")]
    DimensionMismatch {
        /// Width produced by the embedder.
        expected: usize,
        /// Width declared by the store.
        actual: usize,
    },

    /// A search request carried no query text.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// Requested result count outside the accepted range.
    #[error("limit {value} is outside [{min}, {max}]")]
    LimitOutOfRange {
        /// Requested limit.
        value: usize,
        /// Smallest accepted limit.
        min: usize,
        /// Largest accepted limit.
        max: usize,
    },

    /// Requested distance threshold outside the accepted range.
    #[error("max_distance {value} is outside [{min}, {max}]")]
    DistanceOutOfRange {
        /// Requested threshold.
        value: f64,
        /// Smallest accepted threshold.
        min: f64,
        /// Largest accepted threshold.
        max: f64,
    },

    /// A required article field was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Blank schema or table name.
    #[error("invalid table identifier: {0}")]
    InvalidTableName(String),

    /// A source record had no `id` value.
    #[error("record {record}: missing article id")]
    MissingArticleId {
        /// 1-based record number in the source.
        record: u64,
    },

    /// A source record had an `id` that is not an integer.
    #[error("record {record}: article id {value:?} is not an integer")]
    InvalidArticleId {
        /// 1-based record number in the source.
        record: u64,
        /// The raw id text.
        value: String,
    },

    /// The CSV source could not be read or decoded.
    #[error("failed to read article source: {0}")]
    Source(#[from] csv::Error),

    /// An insert reused an id that is already taken.
    #[error("article {0} already exists")]
    DuplicateArticleId(i64),

    /// No id is left above the current maximum.
    #[error("article id space exhausted")]
    IdSpaceExhausted,

    /// Postgres driver failure.
    #[error("storage error: {0}")]
    Store(#[from] tokio_postgres::Error),

    /// The store refused or lost a write.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Error {
    /// True for errors caused by caller-supplied parameters rather than the
    /// store or the environment.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery
                | Self::LimitOutOfRange { .. }
                | Self::DistanceOutOfRange { .. }
                | Self::EmptyField { .. }
        )
    }
}

/// Library result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
