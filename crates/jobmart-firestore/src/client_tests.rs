//! Tests for Firestore client functionality.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{FirestoreClient, FirestoreConfig, DEFAULT_TRANSACTION_ATTEMPTS};
use crate::error::FirestoreError;
use crate::retry::RetryConfig;
use crate::store::DocumentStore;
use crate::transaction::run_transaction;
use crate::types::{StructuredQuery, ToFirestoreValue, Value};

// =============================================================================
// Test Helpers
// =============================================================================

const DOCS: &str = "/v1/projects/test-project/databases/test-db/documents";

fn test_config(emulator_host: Option<String>) -> FirestoreConfig {
    FirestoreConfig {
        project_id: "test-project".to_string(),
        database_id: "test-db".to_string(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        },
        transaction_attempts: 2,
        emulator_host,
    }
}

async fn emulator_client(server: &MockServer) -> FirestoreClient {
    FirestoreClient::new(test_config(Some(server.address().to_string())))
        .await
        .unwrap()
}

fn job_document(id: &str, salary: i64) -> serde_json::Value {
    json!({
        "name": format!("projects/test-project/databases/test-db/documents/jobs/{}", id),
        "fields": {
            "id": { "stringValue": id },
            "status": { "stringValue": "active" },
            "payment": { "mapValue": { "fields": {
                "maximum": { "integerValue": salary.to_string() }
            }}}
        }
    })
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_http_status_429() {
    let err = FirestoreError::from_http_status(429, "rate limited");
    assert!(matches!(err, FirestoreError::RateLimited(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_5xx() {
    let err = FirestoreError::from_http_status(500, "internal error");
    assert!(matches!(err, FirestoreError::ServerError(500, _)));
    assert!(err.is_retryable());

    let err = FirestoreError::from_http_status(503, "service unavailable");
    assert!(matches!(err, FirestoreError::ServerError(503, _)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_client_errors() {
    let err = FirestoreError::from_http_status(400, "bad request");
    assert!(matches!(err, FirestoreError::RequestFailed(_)));
    assert!(!err.is_retryable());

    let err = FirestoreError::from_http_status(404, "not found");
    assert!(matches!(err, FirestoreError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_http_status_409() {
    let err = FirestoreError::from_http_status(409, "conflict");
    assert!(matches!(err, FirestoreError::AlreadyExists(_)));
    assert!(!err.is_aborted());

    let err = FirestoreError::from_http_status(
        409,
        r#"{"error": {"code": 409, "status": "ABORTED", "message": "Transaction lock timeout"}}"#,
    );
    assert!(err.is_aborted());
    assert!(!err.is_retryable());
    assert_eq!(err.http_status(), Some(409));
}

#[test]
fn test_error_retry_after_ms() {
    assert_eq!(FirestoreError::RateLimited(5000).retry_after_ms(), Some(5000));
    assert_eq!(
        FirestoreError::ServerError(500, "error".into()).retry_after_ms(),
        None
    );
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_validates_empty_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    let result = FirestoreConfig::from_env();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");
    std::env::remove_var("FIREBASE_PROJECT_ID");
}

#[test]
#[serial]
fn test_config_parses_transaction_attempts() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_TRANSACTION_ATTEMPTS", "9");
    assert_eq!(FirestoreConfig::from_env().unwrap().transaction_attempts, 9);

    std::env::set_var("FIRESTORE_TRANSACTION_ATTEMPTS", "0");
    assert_eq!(
        FirestoreConfig::from_env().unwrap().transaction_attempts,
        DEFAULT_TRANSACTION_ATTEMPTS
    );
    std::env::remove_var("FIRESTORE_TRANSACTION_ATTEMPTS");
}

#[test]
#[serial]
fn test_config_emulator_host() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(
        config.base_url(),
        "http://localhost:8080/v1/projects/test/databases/(default)/documents"
    );
    std::env::remove_var("FIRESTORE_EMULATOR_HOST");
}

#[test]
#[serial]
fn test_config_handles_invalid_env_values() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
}

// =============================================================================
// HTTP Tests (emulator mode)
// =============================================================================

#[tokio::test]
async fn test_get_document_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/missing", DOCS)))
        .respond_with(ResponseTemplate::new(404).set_body_string("NOT_FOUND"))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    assert!(client.get_document("jobs", "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_document_parses_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/j1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_document("j1", 300)))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let doc = client.get_document("jobs", "j1").await.unwrap().unwrap();
    assert_eq!(doc.id(), Some("j1"));
    assert_eq!(doc.field("status"), Some(&Value::StringValue("active".into())));
}

#[tokio::test]
async fn test_run_query_skips_read_time_entries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "document": job_document("j1", 300), "readTime": "2024-01-01T00:00:00Z" },
            { "document": job_document("j2", 200), "readTime": "2024-01-01T00:00:00Z" },
            { "readTime": "2024-01-01T00:00:00Z" }
        ])))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let docs = DocumentStore::run_query(&client, StructuredQuery::collection("jobs"))
        .await
        .unwrap();
    let ids: Vec<_> = docs.iter().filter_map(|d| d.id()).collect();
    assert_eq!(ids, vec!["j1", "j2"]);

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["structuredQuery"]["from"][0]["collectionId"], "jobs");
}

#[tokio::test]
async fn test_run_query_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let docs = client
        .run_query("", StructuredQuery::collection("jobs"))
        .await
        .unwrap();
    assert!(docs.is_empty());
}

fn begin_transaction_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path(format!("{}:beginTransaction", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transaction": "dHgx" })))
}

#[tokio::test]
async fn test_transaction_commits_buffered_writes() {
    let server = MockServer::start().await;
    begin_transaction_mock().mount(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/applicants/a1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/test-project/databases/test-db/documents/applicants/a1",
            "fields": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "writeResults": [{}],
            "commitTime": "2024-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn DocumentStore> = Arc::new(emulator_client(&server).await);
    run_transaction::<_, FirestoreError, _, _>(&store, "test", |tx| async move {
        assert!(tx.get("applicants", "a1").await?.is_some());
        tx.array_union("applicants", "a1", "interested", vec!["j1".to_firestore_value()]);
        Ok(())
    })
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    let read = requests
        .iter()
        .find(|r| r.url.path().ends_with("/applicants/a1"))
        .unwrap();
    assert_eq!(read.url.query(), Some("transaction=dHgx"));

    let commit = requests
        .iter()
        .find(|r| r.url.path().ends_with(":commit"))
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&commit.body).unwrap();
    assert_eq!(sent["transaction"], "dHgx");
    let transform = &sent["writes"][0]["transform"];
    assert_eq!(transform["fieldTransforms"][0]["fieldPath"], "interested");
    assert_eq!(
        transform["fieldTransforms"][0]["appendMissingElements"]["values"][0]["stringValue"],
        "j1"
    );
    assert_eq!(sent["writes"][0]["currentDocument"]["exists"], true);
}

#[tokio::test]
async fn test_transaction_surfaces_abort_after_attempts() {
    let server = MockServer::start().await;
    begin_transaction_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCS)))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": { "code": 409, "status": "ABORTED", "message": "Too much contention" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let store: Arc<dyn DocumentStore> = Arc::new(emulator_client(&server).await);
    let err = run_transaction::<(), FirestoreError, _, _>(&store, "test", |tx| async move {
        tx.set("jobs", "j1", HashMap::new());
        Ok(())
    })
    .await
    .unwrap_err();
    assert!(err.is_aborted());
}

#[tokio::test]
async fn test_run_query_unparseable_multibyte_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("x{}", "é".repeat(150))))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let err = DocumentStore::run_query(&client, StructuredQuery::collection("jobs"))
        .await
        .unwrap_err();
    match err {
        FirestoreError::InvalidResponse(msg) => assert!(msg.contains("xéé")),
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}
