//! # Column match service
//!
//! The facade the boundary layer talks to. It owns the shared
//! [`EmbeddingGenerator`], [`CatalogStore`], and [`CandidateRanker`] and exposes:
//!
//! - [`ColumnMatchService::get_candidates`]: rank columns for a phrase.
//! - [`ColumnMatchService::update_embeddings`]: rebuild every embedding.
//! - [`ColumnMatchService::health`]: probe the embedding model.
//!
//! Model inference and SQLite work run on Tokio's blocking pool. Rebuilds are
//! serialized by a single-flight lock; ranking is unrestricted.
//!
//! Internal failures are logged with the input and the failing stage, then
//! reported as one [`ApiError`] with a readable message.
//!
//! ```no_run
//! use std::sync::Arc;
//! use colmatch::catalog::CatalogStore;
//! use colmatch::embedding::{EmbeddingGenerator, FallbackPolicy};
//! use colmatch::hashing::HashingEmbedder;
//! use colmatch::service::ColumnMatchService;
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = EmbeddingGenerator::new(Arc::new(HashingEmbedder::default()), FallbackPolicy::Propagate)?;
//! let service = ColumnMatchService::new(Arc::new(generator), Arc::new(CatalogStore::open("colmatch.db")?));
//! service.update_embeddings().await?;
//! let found = service.get_candidates("얼마를 기부했나요", 5).await?;
//! println!("{:?}", found.candidates);
//! # Ok(()) }
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::api::{
    ApiError, CandidateDetail, ColumnCandidatesRequest, ColumnCandidatesResponse, HealthResponse,
    HealthStatus, UpdateEmbeddingsResponse,
};
use crate::catalog::CatalogStore;
use crate::embedding::EmbeddingGenerator;
use crate::error::ColumnMatchError;
use crate::ranker::{CandidateRanker, RankRequest, RankStatus};

/// Text embedded by [`ColumnMatchService::health`].
pub const HEALTH_PROBE: &str = "test";

pub const EMPTY_CATALOG_MESSAGE: &str =
    "No embeddings have been generated yet. Run update-embeddings first.";
pub const LOW_CONFIDENCE_MESSAGE: &str =
    "The query could not be embedded; scores come from a zero-vector fallback and are low-confidence.";

/// Outcome of one rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub created: usize,
    pub total: usize,
}

pub struct ColumnMatchService {
    generator: Arc<EmbeddingGenerator>,
    catalog: Arc<CatalogStore>,
    ranker: Arc<CandidateRanker>,
    rebuild_lock: Mutex<()>,
}

impl ColumnMatchService {
    pub fn new(generator: Arc<EmbeddingGenerator>, catalog: Arc<CatalogStore>) -> Self {
        let ranker = Arc::new(CandidateRanker::new(
            Arc::clone(&generator),
            Arc::clone(&catalog),
        ));
        Self {
            generator,
            catalog,
            ranker,
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Boundary entry point taking the request payload.
    pub async fn column_candidates(
        &self,
        request: ColumnCandidatesRequest,
    ) -> Result<ColumnCandidatesResponse, ApiError> {
        self.get_candidates(&request.input, request.top_k).await
    }

    /// Rank catalog columns for `input`.
    ///
    /// # Errors
    /// - `400` for a blank `input` or `top_k` outside `[1, 20]`, before any model work.
    /// - `500` when embedding or the catalog scan fails.
    pub async fn get_candidates(
        &self,
        input: &str,
        top_k: i64,
    ) -> Result<ColumnCandidatesResponse, ApiError> {
        let request = RankRequest::new(input, top_k).map_err(|e| {
            warn!(input, top_k, error = %e, "rejected column candidate request");
            ApiError::bad_request(e.to_string())
        })?;

        let ranker = Arc::clone(&self.ranker);
        let outcome = tokio::task::spawn_blocking(move || ranker.rank_request(&request))
            .await
            .map_err(ColumnMatchError::from)
            .and_then(|r| r);

        let ranking = outcome.map_err(|e| {
            error!(input, top_k, stage = e.stage(), error = ?e, "column candidate extraction failed");
            ApiError::internal(format!("Column candidate extraction failed: {e}"))
        })?;

        let message = match (ranking.status, ranking.low_confidence) {
            (RankStatus::CatalogEmpty, _) => EMPTY_CATALOG_MESSAGE.to_string(),
            (RankStatus::Ranked, true) => LOW_CONFIDENCE_MESSAGE.to_string(),
            (RankStatus::Ranked, false) => String::new(),
        };

        let candidates = ranking
            .candidates
            .iter()
            .map(|c| c.column_name.clone())
            .collect();
        let details = ranking
            .candidates
            .into_iter()
            .map(CandidateDetail::from)
            .collect();

        Ok(ColumnCandidatesResponse {
            candidates,
            details,
            input: input.to_string(),
            message,
        })
    }

    /// Regenerate the embedding for every description and replace the stored set.
    ///
    /// Descriptions whose embedding fails are logged and skipped, so `count` may be
    /// lower than `total_columns`.
    pub async fn update_embeddings(&self) -> Result<UpdateEmbeddingsResponse, ApiError> {
        let _guard = self.rebuild_lock.lock().await;

        let generator = Arc::clone(&self.generator);
        let catalog = Arc::clone(&self.catalog);
        let summary = tokio::task::spawn_blocking(move || rebuild(&generator, &catalog))
            .await
            .map_err(ColumnMatchError::from)
            .and_then(|r| r)
            .map_err(|e| {
                error!(stage = e.stage(), error = ?e, "embedding rebuild failed");
                ApiError::internal(format!("Embedding update failed: {e}"))
            })?;

        let message = if summary.total == 0 {
            "No column descriptions found.".to_string()
        } else {
            format!("{} embeddings were created successfully.", summary.created)
        };

        Ok(UpdateEmbeddingsResponse {
            message,
            count: summary.created,
            total_columns: summary.total,
        })
    }

    /// Embed [`HEALTH_PROBE`] and report whether the model answers.
    pub async fn health(&self) -> HealthResponse {
        let generator = Arc::clone(&self.generator);
        let probe = tokio::task::spawn_blocking(move || {
            generator
                .embed_strict(HEALTH_PROBE)
                .map(|v| v.len())
                .map_err(ColumnMatchError::from)
        })
        .await
        .map_err(ColumnMatchError::from)
        .and_then(|r| r);

        match probe {
            Ok(dimension) => HealthResponse {
                status: HealthStatus::Healthy,
                model_loaded: true,
                embedding_dimension: Some(dimension),
                error: None,
                message: format!(
                    "Embedding model {} is operational.",
                    self.generator.model_id()
                ),
            },
            Err(e) => {
                error!(model = self.generator.model_id(), error = ?e, "health probe failed");
                HealthResponse {
                    status: HealthStatus::Unhealthy,
                    model_loaded: false,
                    embedding_dimension: None,
                    error: Some(e.to_string()),
                    message: "The embedding model is not operational.".to_string(),
                }
            }
        }
    }
}

/// Embed every description (in parallel), skipping failures, then replace the
/// stored set in one transaction.
///
/// A description deleted after the scan is skipped as well, so `created` can
/// trail `total` for that reason too.
pub fn rebuild(
    generator: &EmbeddingGenerator,
    catalog: &CatalogStore,
) -> Result<RebuildSummary, ColumnMatchError> {
    let descriptions = catalog.list_descriptions()?;
    let total = descriptions.len();
    info!(total, model = generator.model_id(), "rebuilding column embeddings");

    let pairs: Vec<(i32, Vec<f32>)> = descriptions
        .par_iter()
        .filter_map(|d| match generator.embed_strict(&d.description) {
            Ok(vector) => Some((d.id, vector)),
            Err(e) => {
                warn!(
                    column_id = d.id,
                    table = %d.table_name,
                    column = %d.column_name,
                    error = %e,
                    "skipping column, embedding failed"
                );
                None
            }
        })
        .collect();

    let created = catalog.replace_current_embeddings(&pairs)?;
    info!(created, total, "column embeddings rebuilt");
    Ok(RebuildSummary { created, total })
}
