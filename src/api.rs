//! # API Module
//!
//! Request and response payloads for the three boundary operations, plus the
//! single error shape the boundary reports.
//!
//! | Operation           | Request                         | Response                      |
//! |---------------------|---------------------------------|-------------------------------|
//! | `column-candidates` | [`ColumnCandidatesRequest`]     | [`ColumnCandidatesResponse`]  |
//! | `update-embeddings` | none                            | [`UpdateEmbeddingsResponse`]  |
//! | `health`            | none                            | [`HealthResponse`]            |
//!
//! Failures become an [`ApiError`] carrying an HTTP-style status: `400` for
//! validation errors, `500` for everything else.
//!
//! ```rust
//! use colmatch::api::ColumnCandidatesRequest;
//!
//! let req: ColumnCandidatesRequest = serde_json::from_str(r#"{"input": "기부 금액"}"#).unwrap();
//! assert_eq!(req.top_k, 5);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ranker::{Candidate, DEFAULT_TOP_K, RankRequest};

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ColumnCandidatesRequest {
    pub input: String,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

impl ColumnCandidatesRequest {
    /// Check `input` and `top_k` without touching the model or the catalog.
    ///
    /// # Errors
    /// A `400` [`ApiError`] for a blank `input` or `top_k` outside `[1, 20]`.
    pub fn validate(&self) -> Result<RankRequest, ApiError> {
        RankRequest::new(self.input.as_str(), self.top_k)
            .map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CandidateDetail {
    pub column_id: i32,
    pub table_name: String,
    pub column_name: String,
    pub description: String,
    pub similarity: f32,
}

impl From<Candidate> for CandidateDetail {
    fn from(c: Candidate) -> Self {
        Self {
            column_id: c.column_id,
            table_name: c.table_name,
            column_name: c.column_name,
            description: c.description,
            similarity: c.similarity,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnCandidatesResponse {
    /// Column names, best match first.
    pub candidates: Vec<String>,
    pub details: Vec<CandidateDetail>,
    /// The query as received.
    pub input: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdateEmbeddingsResponse {
    pub message: String,
    /// Embeddings written by this rebuild.
    pub count: usize,
    /// Descriptions considered.
    pub total_columns: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub embedding_dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub message: String,
}

/// The one error the boundary reports.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {detail}")]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: 400,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: 500,
            detail: detail.into(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}
