//! In-process [`DocumentStore`] for tests and local runs.
//!
//! Evaluates the subset of structured queries the repositories issue
//! (conjunctions of field filters, single-field ordering, offset and limit)
//! and implements optimistic transactions the way Firestore reports them:
//! a commit whose transaction read a document that has since changed fails
//! with `Aborted`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FirestoreError, FirestoreResult};
use crate::field_path;
use crate::store::DocumentStore;
use crate::types::{Document, FieldOp, FieldTransform, Filter, StructuredQuery, Value, Write};

const PROJECT_ID: &str = "memory";

#[derive(Debug, Clone)]
struct Stored {
    fields: HashMap<String, Value>,
    version: u64,
}

/// Document read inside a transaction, with the version it saw (0 = absent).
#[derive(Debug, Clone)]
struct ReadMark {
    collection: String,
    doc_id: String,
    version: u64,
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, BTreeMap<String, Stored>>,
    transactions: HashMap<String, Vec<ReadMark>>,
    next_transaction: u64,
    clock: u64,
    writes: u64,
    failing_queries: u32,
    aborting_reads: u32,
}

impl State {
    fn version_of(&self, collection: &str, doc_id: &str) -> u64 {
        self.collections
            .get(collection)
            .and_then(|c| c.get(doc_id))
            .map(|d| d.version)
            .unwrap_or(0)
    }

    fn document(&self, collection: &str, doc_id: &str) -> Option<Document> {
        let stored = self.collections.get(collection)?.get(doc_id)?;
        Some(to_document(collection, doc_id, stored))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed or overwrite a document outside any transaction.
    pub fn insert(&self, collection: &str, doc_id: &str, fields: HashMap<String, Value>) {
        let mut state = self.lock();
        state.clock += 1;
        let version = state.clock;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), Stored { fields, version });
    }

    /// Current fields of a document.
    pub fn fields(&self, collection: &str, doc_id: &str) -> Option<HashMap<String, Value>> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|c| c.get(doc_id))
            .map(|d| d.fields.clone())
    }

    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Documents written through `create_document` or `commit`.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    pub fn open_transactions(&self) -> usize {
        self.lock().transactions.len()
    }

    /// Make the next `n` queries fail with a server error.
    pub fn fail_next_queries(&self, n: u32) {
        self.lock().failing_queries = n;
    }

    /// Make the next `n` transactional reads fail as ABORTED, as under lock contention.
    pub fn abort_next_reads(&self, n: u32) {
        self.lock().aborting_reads = n;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        Ok(self.lock().document(collection, doc_id))
    }

    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let mut state = self.lock();
        if state.version_of(collection, doc_id) != 0 {
            return Err(FirestoreError::AlreadyExists(format!(
                "{}/{}",
                collection, doc_id
            )));
        }
        state.clock += 1;
        state.writes += 1;
        let stored = Stored {
            fields,
            version: state.clock,
        };
        let doc = to_document(collection, doc_id, &stored);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), stored);
        Ok(doc)
    }

    async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let mut state = self.lock();
        if state.failing_queries > 0 {
            state.failing_queries -= 1;
            return Err(FirestoreError::ServerError(503, "injected query failure".into()));
        }

        let collection = match query.from.as_slice() {
            [selector] => selector.collection_id.as_str(),
            _ => {
                return Err(FirestoreError::request_failed(
                    "query must select exactly one collection",
                ))
            }
        };
        let Some(docs) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&String, &Stored)> = Vec::new();
        for (id, stored) in docs {
            let keep = match &query.r#where {
                Some(filter) => matches(filter, &stored.fields)?,
                None => true,
            };
            if keep {
                hits.push((id, stored));
            }
        }

        if let Some(orders) = &query.order_by {
            // documents without the ordered field are excluded
            hits.retain(|(_, d)| orders.iter().all(|o| lookup(&d.fields, &o.field.field_path).is_some()));
            hits.sort_by(|(_, a), (_, b)| {
                for order in orders {
                    let path = &order.field.field_path;
                    let ord = match (lookup(&a.fields, path), lookup(&b.fields, path)) {
                        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                        _ => Ordering::Equal,
                    };
                    let ord = if order.direction == "DESCENDING" { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(id, stored)| to_document(collection, id, stored))
            .collect())
    }

    async fn begin_transaction(&self) -> FirestoreResult<String> {
        let mut state = self.lock();
        state.next_transaction += 1;
        let id = format!("tx-{}", state.next_transaction);
        state.transactions.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn get_document_in_transaction(
        &self,
        transaction: &str,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let mut state = self.lock();
        if state.aborting_reads > 0 {
            state.aborting_reads -= 1;
            return Err(FirestoreError::Aborted(format!(
                "transaction {} aborted on read of {}/{}",
                transaction, collection, doc_id
            )));
        }
        let mark = ReadMark {
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
            version: state.version_of(collection, doc_id),
        };
        state
            .transactions
            .get_mut(transaction)
            .ok_or_else(|| FirestoreError::request_failed(format!("unknown transaction {}", transaction)))?
            .push(mark);
        Ok(state.document(collection, doc_id))
    }

    async fn commit(&self, transaction: Option<&str>, writes: Vec<Write>) -> FirestoreResult<()> {
        let mut state = self.lock();

        if let Some(tx) = transaction {
            let reads = state.transactions.remove(tx).ok_or_else(|| {
                FirestoreError::request_failed(format!("unknown transaction {}", tx))
            })?;
            if let Some(stale) = reads
                .iter()
                .find(|r| state.version_of(&r.collection, &r.doc_id) != r.version)
            {
                return Err(FirestoreError::Aborted(format!(
                    "ABORTED: {}/{} changed during transaction",
                    stale.collection, stale.doc_id
                )));
            }
        }

        // stage every write before touching the state so a failure applies nothing
        let mut staged: Vec<((String, String), HashMap<String, Value>)> = Vec::new();
        for write in &writes {
            let name = write
                .document_name()
                .ok_or_else(|| FirestoreError::request_failed("write without a document"))?;
            let key = parse_name(name)?;

            let current = staged
                .iter()
                .rev()
                .find(|(k, _)| *k == key)
                .map(|(_, f)| Some(f.clone()))
                .unwrap_or_else(|| {
                    state
                        .collections
                        .get(&key.0)
                        .and_then(|c| c.get(&key.1))
                        .map(|d| d.fields.clone())
                });

            let requires_existing = write
                .current_document
                .as_ref()
                .and_then(|p| p.exists)
                .unwrap_or(false);
            if requires_existing && current.is_none() {
                return Err(FirestoreError::not_found(format!(
                    "No document to update: {}",
                    name
                )));
            }

            staged.push((key, apply_write(write, current.unwrap_or_default())));
        }

        state.clock += 1;
        let version = state.clock;
        state.writes += staged.len() as u64;
        for ((collection, doc_id), fields) in staged {
            state
                .collections
                .entry(collection)
                .or_default()
                .insert(doc_id, Stored { fields, version });
        }
        Ok(())
    }

    async fn rollback(&self, transaction: &str) -> FirestoreResult<()> {
        self.lock().transactions.remove(transaction);
        Ok(())
    }

    fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            PROJECT_ID, collection, doc_id
        )
    }
}

fn to_document(collection: &str, doc_id: &str, stored: &Stored) -> Document {
    Document {
        name: Some(format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            PROJECT_ID, collection, doc_id
        )),
        fields: Some(stored.fields.clone()),
        create_time: None,
        update_time: Some(stored.version.to_string()),
    }
}

/// `(collection path, doc id)` from a full resource name.
fn parse_name(name: &str) -> FirestoreResult<(String, String)> {
    name.split_once("/documents/")
        .and_then(|(_, path)| path.rsplit_once('/'))
        .map(|(collection, id)| (collection.to_string(), id.to_string()))
        .ok_or_else(|| FirestoreError::request_failed(format!("bad document name {}", name)))
}

fn apply_write(write: &Write, mut fields: HashMap<String, Value>) -> HashMap<String, Value> {
    if let Some(update) = &write.update {
        let incoming = update.fields.clone().unwrap_or_default();
        match &write.update_mask {
            Some(mask) => {
                for path in &mask.field_paths {
                    let segments = field_path::split(path);
                    assign(&mut fields, &segments, lookup(&incoming, path).cloned());
                }
            }
            None => fields = incoming,
        }
    }

    if let Some(transform) = &write.transform {
        for ft in &transform.field_transforms {
            apply_transform(&mut fields, ft);
        }
    }
    fields
}

fn apply_transform(fields: &mut HashMap<String, Value>, ft: &FieldTransform) {
    let mut items: Vec<Value> = lookup(fields, &ft.field_path)
        .map(|v| v.as_array().to_vec())
        .unwrap_or_default();

    if let Some(add) = ft.append_missing_elements.as_ref().and_then(|a| a.values.as_ref()) {
        for value in add {
            if !items.iter().any(|v| values_equal(v, value)) {
                items.push(value.clone());
            }
        }
    }
    if let Some(remove) = ft.remove_all_from_array.as_ref().and_then(|a| a.values.as_ref()) {
        items.retain(|v| !remove.iter().any(|r| values_equal(v, r)));
    }

    let segments = field_path::split(&ft.field_path);
    assign(fields, &segments, Some(Value::array(items)));
}

fn lookup<'a>(fields: &'a HashMap<String, Value>, path: &str) -> Option<&'a Value> {
    let segments = field_path::split(path);
    let (first, rest) = segments.split_first()?;
    let mut value = fields.get(first)?;
    for segment in rest {
        value = value.as_map()?.get(segment)?;
    }
    Some(value)
}

fn assign(fields: &mut HashMap<String, Value>, segments: &[String], value: Option<Value>) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        match value {
            Some(v) => {
                fields.insert(first.clone(), v);
            }
            None => {
                fields.remove(first);
            }
        }
        return;
    }

    let mut child = fields
        .get(first)
        .and_then(Value::as_map)
        .cloned()
        .unwrap_or_default();
    assign(&mut child, rest, value);
    fields.insert(first.clone(), Value::map(child));
}

fn matches(filter: &Filter, fields: &HashMap<String, Value>) -> FirestoreResult<bool> {
    if let Some(composite) = &filter.composite_filter {
        let mut results = Vec::with_capacity(composite.filters.len());
        for inner in &composite.filters {
            results.push(matches(inner, fields)?);
        }
        return match composite.op.as_str() {
            "AND" => Ok(results.iter().all(|r| *r)),
            "OR" => Ok(results.iter().any(|r| *r)),
            op => Err(FirestoreError::request_failed(format!("unsupported composite op {}", op))),
        };
    }

    let Some(ff) = &filter.field_filter else {
        return Ok(true);
    };
    let op = FieldOp::parse(&ff.op)
        .ok_or_else(|| FirestoreError::request_failed(format!("unsupported field op {}", ff.op)))?;
    let Some(actual) = lookup(fields, &ff.field.field_path) else {
        return Ok(false);
    };
    let target = &ff.value;

    Ok(match op {
        FieldOp::Equal => values_equal(actual, target),
        FieldOp::NotEqual => !values_equal(actual, target),
        FieldOp::LessThan => compare(actual, target) == Some(Ordering::Less),
        FieldOp::LessThanOrEqual => {
            matches!(compare(actual, target), Some(Ordering::Less | Ordering::Equal))
        }
        FieldOp::GreaterThan => compare(actual, target) == Some(Ordering::Greater),
        FieldOp::GreaterThanOrEqual => {
            matches!(compare(actual, target), Some(Ordering::Greater | Ordering::Equal))
        }
        FieldOp::In => target.as_array().iter().any(|t| values_equal(actual, t)),
        FieldOp::NotIn => !target.as_array().iter().any(|t| values_equal(actual, t)),
        FieldOp::ArrayContains => actual.as_array().iter().any(|a| values_equal(a, target)),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal) || a == b
}

/// Ordering between values of comparable types; `None` across types.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::IntegerValue(x), Value::IntegerValue(y)) => {
            Some(x.parse::<i64>().ok()?.cmp(&y.parse::<i64>().ok()?))
        }
        (Value::IntegerValue(_) | Value::DoubleValue(_), Value::IntegerValue(_) | Value::DoubleValue(_)) => {
            as_f64(a)?.partial_cmp(&as_f64(b)?)
        }
        (Value::StringValue(x), Value::StringValue(y)) => Some(x.cmp(y)),
        (Value::BooleanValue(x), Value::BooleanValue(y)) => Some(x.cmp(y)),
        (Value::TimestampValue(x), Value::TimestampValue(y)) => {
            let x = DateTime::parse_from_rfc3339(x).ok()?.with_timezone(&Utc);
            let y = DateTime::parse_from_rfc3339(y).ok()?.with_timezone(&Utc);
            Some(x.cmp(&y))
        }
        (Value::NullValue(()), Value::NullValue(())) => Some(Ordering::Equal),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::IntegerValue(s) => s.parse::<i64>().ok().map(|i| i as f64),
        Value::DoubleValue(f) => Some(*f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToFirestoreValue;

    fn job(salary: i64, region: &str) -> HashMap<String, Value> {
        HashMap::from([
            ("status".to_string(), "active".to_firestore_value()),
            (
                "payment".to_string(),
                Value::map(HashMap::from([(
                    "maximum".to_string(),
                    salary.to_firestore_value(),
                )])),
            ),
            ("region".to_string(), region.to_firestore_value()),
        ])
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        store.insert("jobs", "a", job(100, "north"));
        store.insert("jobs", "b", job(300, "north"));
        store.insert("jobs", "c", job(200, "south"));
        store.insert("jobs", "d", job(50, "north"));

        let query = StructuredQuery::collection("jobs")
            .filter(Filter::and(vec![
                Filter::field("region", FieldOp::Equal, "north".to_firestore_value()),
                Filter::field(
                    "payment.maximum",
                    FieldOp::GreaterThanOrEqual,
                    100i64.to_firestore_value(),
                ),
            ]))
            .order_by("payment.maximum", "DESCENDING");

        let docs = store.run_query(query).await.unwrap();
        let ids: Vec<_> = docs.iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_missing_field_never_matches() {
        let store = MemoryStore::new();
        store.insert("jobs", "a", HashMap::new());
        let query = StructuredQuery::collection("jobs").filter(Filter::field(
            "flag",
            FieldOp::Equal,
            false.to_firestore_value(),
        ));
        assert!(store.run_query(query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_query_failure() {
        let store = MemoryStore::new();
        store.fail_next_queries(1);
        let first = store.run_query(StructuredQuery::collection("jobs")).await;
        assert!(matches!(first, Err(FirestoreError::ServerError(503, _))));
        assert!(store.run_query(StructuredQuery::collection("jobs")).await.is_ok());
    }

    #[tokio::test]
    async fn test_array_transforms_have_set_semantics() {
        let store = MemoryStore::new();
        store.insert("applicants", "a1", HashMap::new());
        let name = store.full_document_name("applicants", "a1");
        let transform = |append: bool| Write {
            transform: Some(crate::types::DocumentTransform {
                document: name.clone(),
                field_transforms: vec![FieldTransform {
                    field_path: "interested".into(),
                    append_missing_elements: append
                        .then(|| crate::types::ArrayValue { values: Some(vec!["j1".to_firestore_value()]) }),
                    remove_all_from_array: (!append)
                        .then(|| crate::types::ArrayValue { values: Some(vec!["j1".to_firestore_value()]) }),
                }],
            }),
            ..Default::default()
        };

        store.commit(None, vec![transform(true)]).await.unwrap();
        store.commit(None, vec![transform(true)]).await.unwrap();
        let fields = store.fields("applicants", "a1").unwrap();
        assert_eq!(fields["interested"].as_array().len(), 1);

        store.commit(None, vec![transform(false)]).await.unwrap();
        store.commit(None, vec![transform(false)]).await.unwrap();
        let fields = store.fields("applicants", "a1").unwrap();
        assert!(fields["interested"].as_array().is_empty());
    }

    #[tokio::test]
    async fn test_exists_precondition_on_missing_document() {
        let store = MemoryStore::new();
        let write = Write {
            update: Some(Document::named(
                store.full_document_name("jobs", "ghost"),
                HashMap::from([("status".to_string(), "deleted".to_firestore_value())]),
            )),
            update_mask: Some(crate::types::DocumentMask {
                field_paths: vec!["status".into()],
            }),
            current_document: Some(crate::types::Precondition::exists()),
            ..Default::default()
        };
        let err = store.commit(None, vec![write]).await.unwrap_err();
        assert!(matches!(err, FirestoreError::NotFound(_)));
        assert_eq!(store.len("jobs"), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_masked_update_on_quoted_path() {
        let mut fields = HashMap::new();
        let incoming = HashMap::from([(
            "requirements".to_string(),
            Value::map(HashMap::from([("driving-c".to_string(), true.to_firestore_value())])),
        )]);
        let write = Write {
            update: Some(Document::new(incoming)),
            update_mask: Some(crate::types::DocumentMask {
                field_paths: vec!["requirements.`driving-c`".into()],
            }),
            ..Default::default()
        };
        fields = apply_write(&write, fields);
        assert_eq!(
            lookup(&fields, "requirements.`driving-c`"),
            Some(&Value::BooleanValue(true))
        );
    }
}
