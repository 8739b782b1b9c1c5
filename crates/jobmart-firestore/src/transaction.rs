//! Read-write transactions over a [`DocumentStore`].
//!
//! A transaction body reads through its [`Transaction`] handle and buffers
//! writes on it. The runtime commits the buffer atomically; when the commit is
//! rejected as ABORTED (a document read by the body changed underneath it) the
//! whole body runs again in a fresh transaction, up to
//! [`DocumentStore::transaction_attempts`] times. A read rejected as ABORTED
//! (lock contention) reruns the body the same way, whatever error the body
//! turned it into.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info_span, warn, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_transaction_abort;
use crate::store::DocumentStore;
use crate::types::{
    ArrayValue, Document, DocumentMask, DocumentTransform, FieldTransform, Precondition, Value,
    Write,
};

/// Base delay between aborted attempts (milliseconds).
const ABORT_BASE_DELAY_MS: u64 = 50;

/// Handle passed to a transaction body.
///
/// Reads go to the store immediately; writes are buffered until the body
/// returns `Ok`.
#[derive(Clone)]
pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    id: String,
    writes: Arc<Mutex<Vec<Write>>>,
    /// Message of the first read the store rejected as ABORTED.
    aborted_read: Arc<Mutex<Option<String>>>,
}

impl Transaction {
    fn new(store: Arc<dyn DocumentStore>, id: String) -> Self {
        Self {
            store,
            id,
            writes: Arc::new(Mutex::new(Vec::new())),
            aborted_read: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read a document; the commit fails if it changes before then.
    pub async fn get(&self, collection: &str, doc_id: &str) -> FirestoreResult<Option<Document>> {
        let result = self
            .store
            .get_document_in_transaction(&self.id, collection, doc_id)
            .await;
        if let Err(FirestoreError::Aborted(msg)) = &result {
            self.aborted_read
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_or_insert_with(|| msg.clone());
        }
        result
    }

    /// Overwrite the whole document.
    pub fn set(&self, collection: &str, doc_id: &str, fields: HashMap<String, Value>) {
        let name = self.store.full_document_name(collection, doc_id);
        self.push(Write {
            update: Some(Document::named(name, fields)),
            ..Default::default()
        });
    }

    /// Replace only the fields named in `field_paths`; the document must exist.
    pub fn update(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        field_paths: Vec<String>,
    ) {
        let name = self.store.full_document_name(collection, doc_id);
        self.push(Write {
            update: Some(Document::named(name, fields)),
            update_mask: Some(DocumentMask { field_paths }),
            current_document: Some(Precondition::exists()),
            ..Default::default()
        });
    }

    /// Add each value to the array at `field_path` unless already present.
    pub fn array_union(&self, collection: &str, doc_id: &str, field_path: &str, values: Vec<Value>) {
        self.transform(collection, doc_id, FieldTransform {
            field_path: field_path.to_string(),
            append_missing_elements: Some(ArrayValue { values: Some(values) }),
            remove_all_from_array: None,
        });
    }

    /// Remove every occurrence of each value from the array at `field_path`.
    pub fn array_remove(&self, collection: &str, doc_id: &str, field_path: &str, values: Vec<Value>) {
        self.transform(collection, doc_id, FieldTransform {
            field_path: field_path.to_string(),
            append_missing_elements: None,
            remove_all_from_array: Some(ArrayValue { values: Some(values) }),
        });
    }

    fn transform(&self, collection: &str, doc_id: &str, field_transform: FieldTransform) {
        let document = self.store.full_document_name(collection, doc_id);
        self.push(Write {
            transform: Some(DocumentTransform {
                document,
                field_transforms: vec![field_transform],
            }),
            current_document: Some(Precondition::exists()),
            ..Default::default()
        });
    }

    fn push(&self, write: Write) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);
    }

    fn take_aborted_read(&self) -> Option<String> {
        self.aborted_read
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_writes(&self) -> Vec<Write> {
        std::mem::take(&mut *self.writes.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Run `body` inside a read-write transaction and commit its writes.
///
/// An error from the body rolls the transaction back and is returned as is,
/// unless one of the body's reads was ABORTED: then, like an ABORTED commit,
/// the body reruns. Other commit failures are returned.
pub async fn run_transaction<T, E, F, Fut>(
    store: &Arc<dyn DocumentStore>,
    operation: &str,
    body: F,
) -> Result<T, E>
where
    F: Fn(Transaction) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<FirestoreError>,
{
    let attempts = store.transaction_attempts().max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let span = info_span!("firestore_transaction", operation = %operation, attempt = attempt);

        let outcome: FirestoreResult<Result<T, E>> = async {
            let tx = Transaction::new(Arc::clone(store), store.begin_transaction().await?);

            let value = match body(tx.clone()).await {
                Ok(value) => value,
                Err(e) => {
                    if let Err(rollback_err) = store.rollback(tx.id()).await {
                        warn!(error = %rollback_err, "Transaction rollback failed");
                    }
                    return match tx.take_aborted_read() {
                        Some(msg) => Err(FirestoreError::Aborted(msg)),
                        None => Ok(Err(e)),
                    };
                }
            };

            store
                .commit(Some(tx.id()), tx.take_writes())
                .await
                .map(|()| Ok(value))
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(result) => return result,
            Err(e) if e.is_aborted() && attempt < attempts => {
                record_transaction_abort(operation);
                debug!(
                    operation = %operation,
                    attempt = attempt,
                    "Transaction aborted by concurrent write, retrying"
                );
                let delay = Duration::from_millis(ABORT_BASE_DELAY_MS * attempt as u64);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_aborted() {
                    record_transaction_abort(operation);
                    warn!(
                        operation = %operation,
                        attempts = attempts,
                        "Transaction still contended after all attempts"
                    );
                }
                return Err(e.into());
            }
        }
    }
}
