//! Firestore REST API client.
//!
//! - Token caching with refresh margin (or the emulator's fixed token)
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter for idempotent reads
//! - Read-write transactions (`beginTransaction` / `commit` / `rollback`)
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_documents_returned, record_request};
use crate::retry::RetryConfig;
use crate::token_cache::{Credentials, TokenCache};
use crate::types::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse, Document,
    ReadWrite, RollbackRequest, RunQueryRequest, RunQueryResponse, StructuredQuery,
    TransactionOptions, Value, Write,
};

/// Default number of attempts for a read-write transaction.
pub const DEFAULT_TRANSACTION_ATTEMPTS: u32 = 5;

/// Characters of an unparseable response body quoted in errors.
const ERROR_BODY_PREFIX_CHARS: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration for reads
    pub retry: RetryConfig,
    /// Attempts per transaction before an ABORTED commit is surfaced
    pub transaction_attempts: u32,
    /// `host:port` of a Firestore emulator; bypasses service-account auth
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let transaction_attempts: u32 = std::env::var("FIRESTORE_TRANSACTION_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_TRANSACTION_ATTEMPTS);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            transaction_attempts,
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
        })
    }

    /// `.../documents` root for this database.
    pub fn base_url(&self) -> String {
        match &self.emulator_host {
            Some(host) => format!(
                "http://{}/v1/projects/{}/databases/{}/documents",
                host, self.project_id, self.database_id
            ),
            None => format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
                self.project_id, self.database_id
            ),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let credentials = if config.emulator_host.is_some() {
            debug!("Using Firestore emulator at {:?}", config.emulator_host);
            Credentials::Emulator
        } else {
            Credentials::ServiceAccount(TokenCache::new(Self::create_auth_provider()?))
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("jobmart-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            config,
            credentials: Arc::new(credentials),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Full resource name, as used in writes.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Get a document.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);
        self.with_retry("get_document", || {
            self.fetch_document("get_document", collection, doc_id, &url)
        })
        .await
    }

    /// Get a document as part of a read-write transaction.
    pub async fn get_document_in_transaction(
        &self,
        transaction: &str,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = format!(
            "{}?transaction={}",
            self.document_path(collection, doc_id),
            urlencoding::encode(transaction)
        );
        self.fetch_document("get_document_in_transaction", collection, doc_id, &url)
            .await
    }

    async fn fetch_document(
        &self,
        operation: &str,
        collection: &str,
        doc_id: &str,
        url: &str,
    ) -> FirestoreResult<Option<Document>> {
        self.execute_request(operation, collection, Some(doc_id), async {
            let response = self.send(url, |token| self.http.get(url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, url, response).await),
            }
        })
        .await
    }

    /// Create a document; fails with `AlreadyExists` if the id is taken.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Run a structured query.
    ///
    /// `parent_path` is the document containing the queried collection, or
    /// empty for a top-level collection.
    pub async fn run_query(
        &self,
        parent_path: &str,
        query: StructuredQuery,
    ) -> FirestoreResult<Vec<Document>> {
        let url = if parent_path.is_empty() {
            format!("{}:runQuery", self.base_url)
        } else {
            format!("{}/{}:runQuery", self.base_url, parent_path)
        };
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        let docs = self
            .with_retry("run_query", || {
                self.execute_request("run_query", &collection, None, async {
                    let response = self
                        .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                        .await?;
                    let status = response.status();
                    if status != StatusCode::OK {
                        return Err(Self::handle_error_response(status, &url, response).await);
                    }

                    let body = response.text().await.unwrap_or_default();
                    // one RunQueryResponse per result, plus a trailing read-time entry
                    let responses: Vec<RunQueryResponse> =
                        serde_json::from_str(&body).map_err(|e| {
                            FirestoreError::invalid_response(format!(
                                "Failed to parse runQuery response: {} (body prefix: {})",
                                e,
                                body_prefix(&body, ERROR_BODY_PREFIX_CHARS)
                            ))
                        })?;
                    Ok(responses
                        .into_iter()
                        .filter_map(|r| r.document)
                        .collect::<Vec<_>>())
                })
            })
            .await?;

        record_documents_returned(&collection, docs.len());
        Ok(docs)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Start a read-write transaction, returning its opaque id.
    pub async fn begin_transaction(&self) -> FirestoreResult<String> {
        let url = format!("{}:beginTransaction", self.base_url);
        let request = BeginTransactionRequest {
            options: TransactionOptions {
                read_write: Some(ReadWrite {}),
            },
        };

        self.execute_request("begin_transaction", "transaction", None, async {
            let response = self
                .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let begun: BeginTransactionResponse = response.json().await?;
                    Ok(begun.transaction)
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Atomically apply `writes`, inside `transaction` when given.
    ///
    /// Contention on a transactional commit surfaces as `Aborted`.
    pub async fn commit(&self, transaction: Option<&str>, writes: Vec<Write>) -> FirestoreResult<()> {
        let url = format!("{}:commit", self.base_url);
        let request = CommitRequest {
            writes,
            transaction: transaction.map(str::to_string),
        };

        self.execute_request("commit", "transaction", None, async {
            let response = self
                .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let committed: CommitResponse = response.json().await?;
                    debug!(
                        writes = committed.write_results.map(|w| w.len()).unwrap_or(0),
                        "Committed Firestore writes"
                    );
                    Ok(())
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Release a transaction without applying it.
    pub async fn rollback(&self, transaction: &str) -> FirestoreResult<()> {
        let url = format!("{}:rollback", self.base_url);
        let request = RollbackRequest {
            transaction: transaction.to_string(),
        };

        self.execute_request("rollback", "transaction", None, async {
            let response = self
                .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(()),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Execute with retry.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Send an authorized request, refreshing the token once if Firestore
    /// reports it expired.
    async fn send<F>(&self, url: &str, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.credentials.token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                format!("{} failed: {}", url, body),
            ));
        }

        self.credentials.invalidate().await;
        let token = self.credentials.token().await?;
        Ok(build(&token).send().await?)
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

/// First `max_chars` characters of `body`, cut on a char boundary.
fn body_prefix(body: &str, max_chars: usize) -> &str {
    body.char_indices()
        .nth(max_chars)
        .map_or(body, |(i, _)| &body[..i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_validates_project_id() {
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("FIREBASE_PROJECT_ID");
        let result = FirestoreConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::set_var("GCP_PROJECT_ID", "test-project");
        std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("FIRESTORE_TRANSACTION_ATTEMPTS");
        std::env::remove_var("FIRESTORE_EMULATOR_HOST");
        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.transaction_attempts, DEFAULT_TRANSACTION_ATTEMPTS);
        assert!(config.emulator_host.is_none());
        assert!(config.base_url().starts_with("https://firestore.googleapis.com/"));
    }

    #[test]
    fn test_body_prefix_respects_char_boundaries() {
        let body = format!("x{}", "é".repeat(300));
        let prefix = body_prefix(&body, ERROR_BODY_PREFIX_CHARS);
        assert_eq!(prefix.chars().count(), ERROR_BODY_PREFIX_CHARS);
        assert!(body.starts_with(prefix));
        assert_eq!(body_prefix("short", 200), "short");
        assert_eq!(body_prefix("ééé", 2), "éé");
    }
}
