//! HTTP backend tests against a mock inference endpoint.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sift_embeddings::{
    BackendError, EmbeddingError, EmbeddingService, EmbeddingServiceConfig, HttpEmbeddingBackend,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "test/model";

fn backend(server: &MockServer) -> HttpEmbeddingBackend {
    HttpEmbeddingBackend::new()
        .with_endpoint(server.uri())
        .with_model(MODEL)
        .with_api_key("hf_test")
}

async fn mount_probe(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/test/model"))
        .and(body_json(json!({
            "inputs": "embedding service liveness probe",
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.5, 0.5, 0.5])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_initialize_sends_bearer_probe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test/model"))
        .and(header("authorization", "Bearer hf_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.1, 0.2, 0.3])))
        .expect(1)
        .mount(&server)
        .await;

    let service = EmbeddingService::new(Arc::new(backend(&server)));
    service.initialize().await.unwrap();

    assert!(service.is_initialized());
    assert_eq!(service.dimension(), Some(3));
}

#[tokio::test]
async fn test_initialize_rejects_non_vector_probe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "model loading"})))
        .mount(&server)
        .await;

    let service = EmbeddingService::new(Arc::new(backend(&server)));
    let err = service.initialize().await.unwrap_err();

    assert!(matches!(err, EmbeddingError::BackendUnavailable(_)));
    assert!(!service.is_initialized());
}

#[tokio::test]
async fn test_initialize_without_key_is_configuration_error() {
    let server = MockServer::start().await;
    let service = EmbeddingService::new(Arc::new(backend(&server).without_api_key()));

    let err = service.initialize().await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Configuration(_)));
}

#[tokio::test]
async fn test_single_embedding_round_trip() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": "hello world",
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1.0, 0.0, 0.0])))
        .mount(&server)
        .await;

    let service = EmbeddingService::new(Arc::new(backend(&server)));
    service.initialize().await.unwrap();

    let embedding = service.generate_embedding("  hello\n\n world ").await.unwrap();
    assert_eq!(embedding, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_error_body_is_carried_upstream() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": "boom",
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(503).set_body_string("model overloaded"))
        .mount(&server)
        .await;

    let service = EmbeddingService::new(Arc::new(backend(&server)));
    service.initialize().await.unwrap();

    let err = service.generate_embedding("boom").await.unwrap_err();
    match err {
        EmbeddingError::Request(BackendError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "model overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": "busy",
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let service = EmbeddingService::new(Arc::new(backend(&server)));
    service.initialize().await.unwrap();

    let err = service.generate_embedding("busy").await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::Request(BackendError::RateLimited {
            retry_after_secs: 7
        })
    ));
}

#[tokio::test]
async fn test_batch_request_sends_array() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": ["a", "b"],
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[1.0, 0.0], [0.0, 1.0]])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": ["c"],
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.5, 0.5]])))
        .expect(1)
        .mount(&server)
        .await;

    let config = EmbeddingServiceConfig::default().with_max_batch_size(2);
    let service = EmbeddingService::with_config(Arc::new(backend(&server)), config);
    service.initialize().await.unwrap();

    let embeddings = service
        .generate_batch_embeddings(&["a", "b", "c"])
        .await
        .unwrap();
    assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn test_batch_count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": ["a", "b"],
            "options": {"wait_for_model": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[1.0, 0.0]])))
        .mount(&server)
        .await;

    let service = EmbeddingService::new(Arc::new(backend(&server)));
    service.initialize().await.unwrap();

    let err = service.generate_batch_embeddings(&["a", "b"]).await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::Request(BackendError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_slow_batch_times_out() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "inputs": ["slow"],
            "options": {"wait_for_model": true}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([[1.0]]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = EmbeddingServiceConfig::default().with_request_timeout(Duration::from_millis(200));
    let service = EmbeddingService::with_config(Arc::new(backend(&server)), config);
    service.initialize().await.unwrap();

    let err = service.generate_batch_embeddings(&["slow"]).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Timeout { .. }));
}
