use std::sync::Arc;

use tempfile::TempDir;

use colmatch::{
    api::{ColumnCandidatesRequest, HealthStatus},
    catalog::CatalogStore,
    embedding::{EmbeddingGenerator, FallbackPolicy},
    hashing::HashingEmbedder,
    models::NewColumnDescription,
    seed,
    service::{ColumnMatchService, EMPTY_CATALOG_MESSAGE},
};

fn service_with(columns: &[NewColumnDescription]) -> (TempDir, ColumnMatchService) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("catalog.db");
    let catalog = CatalogStore::open(db.to_str().unwrap()).unwrap();
    seed::seed_catalog(&catalog, columns).unwrap();
    let generator =
        EmbeddingGenerator::new(Arc::new(HashingEmbedder::default()), FallbackPolicy::Propagate)
            .unwrap();
    (dir, ColumnMatchService::new(Arc::new(generator), Arc::new(catalog)))
}

#[tokio::test]
async fn donation_catalog_end_to_end() {
    let (_dir, service) = service_with(&seed::default_donation_columns());

    let before = service.get_candidates("얼마를 기부했나요", 5).await.unwrap();
    assert!(before.candidates.is_empty());
    assert_eq!(before.message, EMPTY_CATALOG_MESSAGE);

    let rebuilt = service.update_embeddings().await.unwrap();
    assert_eq!(rebuilt.count, 10);
    assert_eq!(rebuilt.total_columns, 10);
    assert_eq!(service.catalog().count_embeddings().unwrap(), 10);

    let response = service
        .column_candidates(ColumnCandidatesRequest {
            input: "결제 수단".to_string(),
            top_k: 3,
        })
        .await
        .unwrap();
    assert_eq!(response.input, "결제 수단");
    assert_eq!(response.candidates.len(), 3);
    assert_eq!(response.candidates[0], "payment_method");
    assert_eq!(response.details.len(), 3);
    assert!(
        response
            .details
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity)
    );
    assert!(response.details.iter().all(|d| d.table_name == "donations"));
}

#[tokio::test]
async fn single_column_catalog_matches_paraphrase() {
    let (_dir, service) = service_with(&[NewColumnDescription::new(
        "donations",
        "amount",
        "기부 금액, 후원 금액",
    )]);
    service.update_embeddings().await.unwrap();

    let response = service.get_candidates("얼마를 기부했나요", 5).await.unwrap();
    assert_eq!(response.candidates, vec!["amount".to_string()]);
    assert!(response.details[0].similarity > 0.0);
}

#[tokio::test]
async fn invalid_requests_are_client_errors() {
    let (_dir, service) = service_with(&seed::default_donation_columns());
    service.update_embeddings().await.unwrap();

    let err = service.get_candidates("   ", 5).await.unwrap_err();
    assert_eq!(err.status, 400);

    for top_k in [0, 21, -1] {
        let err = service.get_candidates("기부 금액", top_k).await.unwrap_err();
        assert!(err.is_client_error(), "top_k={top_k}");
    }
}

#[tokio::test]
async fn reseeding_drops_stale_embeddings() {
    let (_dir, service) = service_with(&seed::default_donation_columns());
    service.update_embeddings().await.unwrap();

    let columns = seed::default_donation_columns();
    seed::seed_catalog(service.catalog(), &columns[..4]).unwrap();
    assert_eq!(service.catalog().count_embeddings().unwrap(), 0);

    let rebuilt = service.update_embeddings().await.unwrap();
    assert_eq!(rebuilt.count, 4);
    let response = service.get_candidates("기부", 20).await.unwrap();
    assert_eq!(response.candidates.len(), 4);
}

#[tokio::test]
async fn hashing_backend_reports_healthy() {
    let (_dir, service) = service_with(&[]);
    let health = service.health().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.embedding_dimension, Some(384));

    let rebuilt = service.update_embeddings().await.unwrap();
    assert_eq!(rebuilt.count, 0);
    assert_eq!(rebuilt.message, "No column descriptions found.");
}
