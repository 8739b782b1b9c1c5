//! The document store seam.
//!
//! Repositories hold an `Arc<dyn DocumentStore>` injected at construction.
//! [`FirestoreClient`] is the production implementation; `MemoryStore`
//! (feature `memory`) backs tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::client::{FirestoreClient, DEFAULT_TRANSACTION_ATTEMPTS};
use crate::error::FirestoreResult;
use crate::types::{Document, StructuredQuery, Value, Write};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read; `None` when the document does not exist.
    async fn get_document(&self, collection: &str, doc_id: &str)
        -> FirestoreResult<Option<Document>>;

    /// Create a document under a caller-chosen id.
    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document>;

    /// Run a structured query against a top-level collection.
    async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>>;

    async fn begin_transaction(&self) -> FirestoreResult<String>;

    async fn get_document_in_transaction(
        &self,
        transaction: &str,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>>;

    /// Apply writes atomically; `Aborted` when a transaction lost a race.
    async fn commit(&self, transaction: Option<&str>, writes: Vec<Write>) -> FirestoreResult<()>;

    async fn rollback(&self, transaction: &str) -> FirestoreResult<()>;

    /// Resource name used to address a document in writes.
    fn full_document_name(&self, collection: &str, doc_id: &str) -> String;

    /// How many times a transaction body may run before `Aborted` is surfaced.
    fn transaction_attempts(&self) -> u32 {
        DEFAULT_TRANSACTION_ATTEMPTS
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        FirestoreClient::get_document(self, collection, doc_id).await
    }

    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        FirestoreClient::create_document(self, collection, doc_id, fields).await
    }

    async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        FirestoreClient::run_query(self, "", query).await
    }

    async fn begin_transaction(&self) -> FirestoreResult<String> {
        FirestoreClient::begin_transaction(self).await
    }

    async fn get_document_in_transaction(
        &self,
        transaction: &str,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        FirestoreClient::get_document_in_transaction(self, transaction, collection, doc_id).await
    }

    async fn commit(&self, transaction: Option<&str>, writes: Vec<Write>) -> FirestoreResult<()> {
        FirestoreClient::commit(self, transaction, writes).await
    }

    async fn rollback(&self, transaction: &str) -> FirestoreResult<()> {
        FirestoreClient::rollback(self, transaction).await
    }

    fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        FirestoreClient::full_document_name(self, collection, doc_id)
    }

    fn transaction_attempts(&self) -> u32 {
        self.config().transaction_attempts
    }
}
