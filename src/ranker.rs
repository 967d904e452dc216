//! # Candidate ranker
//!
//! Ranks every embedded column in the catalog against a free-text query:
//!
//! 1. Validate the request ([`RankRequest::new`]) before any model or database work.
//! 2. Embed the query.
//! 3. Scan all `(embedding, description)` pairs.
//! 4. Score each with [`cosine_similarity`].
//! 5. Stable sort by descending score (ties keep scan order) and keep the top `k`.
//!
//! An empty catalog is not an error: the result carries
//! [`RankStatus::CatalogEmpty`] and no candidates.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogStore;
use crate::embedding::EmbeddingGenerator;
use crate::error::ColumnMatchError;
use crate::similarity::cosine_similarity;

/// Smallest accepted `top_k`.
pub const MIN_TOP_K: usize = 1;
/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 20;
/// `top_k` used when the caller does not give one.
pub const DEFAULT_TOP_K: i64 = 5;

/// A `top_k` known to lie in `[MIN_TOP_K, MAX_TOP_K]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopK(usize);

impl TopK {
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<i64> for TopK {
    type Error = ColumnMatchError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < MIN_TOP_K as i64 || value > MAX_TOP_K as i64 {
            return Err(ColumnMatchError::TopKOutOfRange {
                got: value,
                min: MIN_TOP_K,
                max: MAX_TOP_K,
            });
        }
        Ok(TopK(value as usize))
    }
}

/// A validated ranking request.
#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    query: String,
    top_k: TopK,
}

impl RankRequest {
    /// Validate `query` (non-blank) and `top_k` (within `[1, 20]`).
    ///
    /// The query is kept as given; only the emptiness check trims it.
    pub fn new(query: impl Into<String>, top_k: i64) -> Result<Self, ColumnMatchError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ColumnMatchError::EmptyQuery);
        }
        let top_k = TopK::try_from(top_k)?;
        Ok(Self { query, top_k })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn top_k(&self) -> usize {
        self.top_k.get()
    }
}

/// One ranked column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub column_id: i32,
    pub table_name: String,
    pub column_name: String,
    pub description: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankStatus {
    Ranked,
    /// No embeddings exist yet (rebuild never ran, or every item failed).
    CatalogEmpty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub candidates: Vec<Candidate>,
    pub status: RankStatus,
    /// The query vector is the zero-vector fallback, so every score is `0.0`.
    pub low_confidence: bool,
}

/// Scores catalog columns against queries.
pub struct CandidateRanker {
    generator: Arc<EmbeddingGenerator>,
    catalog: Arc<CatalogStore>,
}

impl CandidateRanker {
    pub fn new(generator: Arc<EmbeddingGenerator>, catalog: Arc<CatalogStore>) -> Self {
        Self { generator, catalog }
    }

    /// Validate and rank in one call.
    pub fn rank(&self, query: &str, top_k: i64) -> Result<Ranking, ColumnMatchError> {
        let request = RankRequest::new(query, top_k)?;
        self.rank_request(&request)
    }

    /// Rank an already validated request.
    ///
    /// The result is non-increasing in similarity and holds at most
    /// `min(top_k, number of stored embeddings)` candidates. A stored vector that
    /// fails to decode is logged and left out.
    pub fn rank_request(&self, request: &RankRequest) -> Result<Ranking, ColumnMatchError> {
        info!(query = request.query(), top_k = request.top_k(), "ranking column candidates");

        let query = self.generator.embed(request.query())?;
        debug!(dimension = query.vector.len(), fallback = query.fallback, "query embedded");

        let pairs = self.catalog.list_embeddings()?;
        if pairs.is_empty() {
            info!("no column embeddings stored");
            return Ok(Ranking {
                candidates: Vec::new(),
                status: RankStatus::CatalogEmpty,
                low_confidence: query.fallback,
            });
        }

        let mut candidates = Vec::with_capacity(pairs.len());
        for (embedding, description) in pairs {
            let vector = match embedding.vector() {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(
                        column_id = description.id,
                        column = %description.column_name,
                        error = %e,
                        "skipping unreadable stored embedding"
                    );
                    continue;
                }
            };
            candidates.push(Candidate {
                column_id: description.id,
                table_name: description.table_name,
                column_name: description.column_name,
                description: description.description,
                similarity: cosine_similarity(&query.vector, &vector),
            });
        }

        // `sort_by` is stable, so equal scores keep catalog scan order.
        candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        let scanned = candidates.len();
        candidates.truncate(request.top_k());
        debug!(scanned, kept = candidates.len(), "ranked column candidates");

        Ok(Ranking {
            candidates,
            status: RankStatus::Ranked,
            low_confidence: query.fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::temp_catalog;
    use crate::embedding::testing::PoisonedEmbedder;
    use crate::embedding::{Embedder, FallbackPolicy};
    use crate::hashing::HashingEmbedder;
    use crate::models::NewColumnDescription;
    use crate::seed::default_donation_columns;
    use tempfile::TempDir;

    fn generator(embedder: impl Embedder + 'static, policy: FallbackPolicy) -> Arc<EmbeddingGenerator> {
        Arc::new(EmbeddingGenerator::new(Arc::new(embedder), policy).unwrap())
    }

    /// Catalog seeded with `columns` and embedded with the hashing model.
    fn embedded_catalog(columns: &[NewColumnDescription]) -> (TempDir, Arc<CatalogStore>) {
        let (dir, store) = temp_catalog();
        store.replace_all_descriptions(columns).unwrap();
        let embedder = HashingEmbedder::default();
        let pairs: Vec<_> = store
            .list_descriptions()
            .unwrap()
            .into_iter()
            .map(|d| (d.id, embedder.embed(&d.description).unwrap()))
            .collect();
        store.replace_all_embeddings(&pairs).unwrap();
        (dir, Arc::new(store))
    }

    fn hashing_ranker(catalog: Arc<CatalogStore>) -> CandidateRanker {
        CandidateRanker::new(
            generator(HashingEmbedder::default(), FallbackPolicy::Propagate),
            catalog,
        )
    }

    #[test]
    fn test_top_k_boundaries() {
        assert!(RankRequest::new("q", 0).is_err());
        assert!(RankRequest::new("q", 21).is_err());
        assert!(RankRequest::new("q", -3).is_err());
        assert_eq!(RankRequest::new("q", 1).unwrap().top_k(), 1);
        assert_eq!(RankRequest::new("q", 20).unwrap().top_k(), 20);
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(matches!(RankRequest::new("", 5), Err(ColumnMatchError::EmptyQuery)));
        assert!(matches!(RankRequest::new(" \t\n", 5), Err(ColumnMatchError::EmptyQuery)));
    }

    #[test]
    fn test_validation_happens_before_embedding() {
        // Every text poisons the model; validation must still win.
        let (_dir, catalog) = embedded_catalog(&default_donation_columns());
        let ranker = CandidateRanker::new(
            generator(
                PoisonedEmbedder {
                    inner: HashingEmbedder::default(),
                    poison: "",
                },
                FallbackPolicy::Propagate,
            ),
            catalog,
        );
        assert!(ranker.rank("", 5).unwrap_err().is_validation());
        assert!(ranker.rank("기부", 0).unwrap_err().is_validation());
        assert_eq!(ranker.rank("기부", 5).unwrap_err().stage(), "embedding");
    }

    #[test]
    fn test_empty_catalog_is_not_an_error() {
        let (_dir, store) = temp_catalog();
        let ranker = hashing_ranker(Arc::new(store));
        let ranking = ranker.rank("기부 금액", 5).unwrap();
        assert!(ranking.candidates.is_empty());
        assert_eq!(ranking.status, RankStatus::CatalogEmpty);
    }

    #[test]
    fn test_donation_scenario() {
        let (_dir, catalog) = embedded_catalog(&[NewColumnDescription::new(
            "donations",
            "amount",
            "기부 금액, 후원 금액",
        )]);
        let ranking = hashing_ranker(catalog).rank("얼마를 기부했나요", 5).unwrap();
        assert_eq!(ranking.status, RankStatus::Ranked);
        assert_eq!(ranking.candidates.len(), 1);
        assert_eq!(ranking.candidates[0].column_name, "amount");
        assert_eq!(ranking.candidates[0].table_name, "donations");
        assert!(ranking.candidates[0].similarity > 0.0);
    }

    #[test]
    fn test_order_and_length_invariants() {
        let (_dir, catalog) = embedded_catalog(&default_donation_columns());
        let ranker = hashing_ranker(catalog);
        for query in ["기부자 이름", "목표 금액", "결제 방법", "캠페인", "xyz"] {
            for k in [1, 3, 10, 20] {
                let ranking = ranker.rank(query, k).unwrap();
                assert!(ranking.candidates.len() <= (k as usize).min(10));
                assert!(
                    ranking
                        .candidates
                        .windows(2)
                        .all(|w| w[0].similarity >= w[1].similarity)
                );
                let mut ids: Vec<_> = ranking.candidates.iter().map(|c| c.column_id).collect();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), ranking.candidates.len());
            }
        }
        assert_eq!(ranker.rank("기부", 20).unwrap().candidates.len(), 10);
    }

    #[test]
    fn test_best_match_ranks_first() {
        let (_dir, catalog) = embedded_catalog(&default_donation_columns());
        let ranking = hashing_ranker(catalog).rank("결제 수단", 3).unwrap();
        assert_eq!(ranking.candidates[0].column_name, "payment_method");
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let columns = [
            NewColumnDescription::new("t", "first", "same words"),
            NewColumnDescription::new("t", "second", "same words"),
            NewColumnDescription::new("t", "third", "same words"),
        ];
        let (_dir, catalog) = embedded_catalog(&columns);
        let ranking = hashing_ranker(catalog).rank("same", 3).unwrap();
        let names: Vec<_> = ranking.candidates.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_zero_vector_fallback_is_low_confidence() {
        let (_dir, catalog) = embedded_catalog(&default_donation_columns());
        let ranker = CandidateRanker::new(
            generator(
                PoisonedEmbedder {
                    inner: HashingEmbedder::default(),
                    poison: "boom",
                },
                FallbackPolicy::ZeroVector,
            ),
            catalog,
        );
        let ranking = ranker.rank("boom", 4).unwrap();
        assert!(ranking.low_confidence);
        assert_eq!(ranking.candidates.len(), 4);
        assert!(ranking.candidates.iter().all(|c| c.similarity == 0.0));
        assert_eq!(ranking.candidates[0].column_name, "amount");
    }

    #[test]
    fn test_unreadable_embedding_is_skipped() {
        use crate::schema::column_embeddings;
        use diesel::prelude::*;

        let (_dir, catalog) = embedded_catalog(&default_donation_columns());
        let amount_id = catalog
            .list_descriptions()
            .unwrap()
            .into_iter()
            .find(|d| d.column_name == "amount")
            .unwrap()
            .id;

        let mut conn = SqliteConnection::establish(catalog.database_url()).unwrap();
        diesel::update(column_embeddings::table.filter(column_embeddings::column_id.eq(amount_id)))
            .set(column_embeddings::embedding.eq(vec![1u8, 2, 3]))
            .execute(&mut conn)
            .unwrap();

        let ranking = hashing_ranker(catalog).rank("기부 금액", 20).unwrap();
        assert_eq!(ranking.status, RankStatus::Ranked);
        assert_eq!(ranking.candidates.len(), 9);
        assert!(ranking.candidates.iter().all(|c| c.column_id != amount_id));
    }
}
