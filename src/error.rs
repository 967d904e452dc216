//! # Error types
//!
//! One enum per layer, all built with `thiserror`:
//!
//! - [`EmbeddingError`]: the model could not be loaded, inference failed, or the
//!   produced vector has the wrong shape.
//! - [`StoreError`]: SQLite connectivity, queries, and blob decoding in the
//!   column catalog.
//! - [`ColumnMatchError`]: what the ranker and the rebuild path report. It
//!   separates client-caused validation failures from internal failures so the
//!   service facade can map them onto the boundary.

use thiserror::Error;

/// Failure to turn text into a valid embedding vector.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Model weights, config, or tokenizer could not be loaded.
    #[error("embedding model unavailable: {0}")]
    ModelLoad(String),

    /// Tokenization or forward pass failed.
    #[error("embedding inference failed: {0}")]
    Inference(String),

    /// The model returned a vector with the wrong number of components.
    #[error("expected a {expected}-dimensional embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The vector contains NaN or an infinity.
    #[error("embedding component {index} is not finite")]
    NonFinite { index: usize },
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(e: candle_core::Error) -> Self {
        EmbeddingError::Inference(e.to_string())
    }
}

/// Failure inside the column catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to catalog database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("catalog query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("embedding blob codec failed: {0}")]
    Codec(String),

    /// A vector handed to the store (or read back from it) breaks the shape invariant.
    #[error("invalid embedding for column {column_id}: {source}")]
    InvalidEmbedding {
        column_id: i32,
        #[source]
        source: EmbeddingError,
    },

    /// The same description id appears twice in one embedding replacement.
    #[error("column {column_id} was given more than one embedding")]
    DuplicateEmbedding { column_id: i32 },

    #[error("invalid column description: {0}")]
    InvalidDescription(String),
}

/// Errors surfaced by ranking and rebuilding.
#[derive(Debug, Error)]
pub enum ColumnMatchError {
    #[error("input must not be empty")]
    EmptyQuery,

    #[error("top_k must be between {min} and {max}, got {got}")]
    TopKOutOfRange { got: i64, min: usize, max: usize },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl ColumnMatchError {
    /// `true` for errors the caller caused (bad input), `false` for internal failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ColumnMatchError::EmptyQuery | ColumnMatchError::TopKOutOfRange { .. }
        )
    }

    /// Name of the pipeline stage that failed, for diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            ColumnMatchError::EmptyQuery | ColumnMatchError::TopKOutOfRange { .. } => "validation",
            ColumnMatchError::Embedding(_) => "embedding",
            ColumnMatchError::Store(_) => "catalog",
            ColumnMatchError::Task(_) => "worker",
        }
    }
}

impl From<tokio::task::JoinError> for ColumnMatchError {
    fn from(e: tokio::task::JoinError) -> Self {
        ColumnMatchError::Task(e.to_string())
    }
}
