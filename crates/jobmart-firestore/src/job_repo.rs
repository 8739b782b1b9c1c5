//! Job listings and job lifecycle.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use jobmart_models::{
    Job, JobDraft, JobDuration, JobId, JobPage, JobQuery, JobStatus, Location, PayFrequency,
    Payment, Region, RegionFilter, RequirementCatalogue, SortBy, SortOrder,
};

use crate::eligibility::{active_filter, eligibility_filters};
use crate::error::{FirestoreError, FirestoreResult};
use crate::repo_error::{RepoError, RepoResult};
use crate::store::DocumentStore;
use crate::transaction::run_transaction;
use crate::types::{Document, FieldOp, Filter, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

/// Top-level collection holding job postings.
pub const JOBS: &str = "jobs";

/// Most values Firestore accepts in one `IN` filter.
pub const ID_IN_LIMIT: usize = 30;

/// Stored field names and paths.
pub mod fields {
    pub const ID: &str = "id";
    pub const STATUS: &str = "status";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const LOCATION: &str = "location";
    pub const PAYMENT: &str = "payment";
    pub const REQUIREMENTS: &str = "requirements";
    pub const EXPIRY: &str = "expiry";
    pub const DURATION: &str = "duration";
    pub const UPDATED_AT: &str = "updated_at";

    /// Salary sort and range key.
    pub const SALARY: &str = "payment.maximum";
    pub const REGION: &str = "location.region";
}

/// Repository for job documents.
#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn DocumentStore>,
    catalogue: Arc<RequirementCatalogue>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>, catalogue: Arc<RequirementCatalogue>) -> Self {
        Self { store, catalogue }
    }

    pub fn catalogue(&self) -> &RequirementCatalogue {
        &self.catalogue
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Active jobs matching `query`, ordered by salary.
    ///
    /// The store returns the whole filtered set; `total_count` is its size and
    /// the page is sliced from it by `page_size`/`page_index`.
    pub async fn fetch_page(&self, query: &JobQuery) -> RepoResult<JobPage> {
        self.run_listing(query, vec![active_filter()]).await
    }

    /// [`fetch_page`](Self::fetch_page) without salary bounds.
    pub async fn fetch_page_with(
        &self,
        region: RegionFilter,
        sort_by: SortBy,
        order: SortOrder,
        page_size: u32,
        page_index: u32,
    ) -> RepoResult<JobPage> {
        let query = JobQuery::unbounded(region, sort_by, order, page_size, page_index)?;
        self.fetch_page(&query).await
    }

    /// Active jobs that demand nothing outside `skills`.
    ///
    /// Skills unknown to the catalogue are ignored.
    pub async fn fetch_eligible<I>(&self, skills: I, query: &JobQuery) -> RepoResult<JobPage>
    where
        I: IntoIterator<Item = String>,
    {
        let (known, unknown) = self.catalogue.partition_skills(skills);
        if !unknown.is_empty() {
            warn!(unknown = ?unknown, "Ignoring skills missing from the requirement catalogue");
        }
        let excluded = self.catalogue.excluded(known.iter().map(String::as_str));
        debug!(excluded = excluded.len(), "Built eligibility predicates");
        self.run_listing(query, eligibility_filters(&excluded)).await
    }

    async fn run_listing(&self, query: &JobQuery, mut filters: Vec<Filter>) -> RepoResult<JobPage> {
        query.sort_by().ensure_supported()?;

        filters.push(Filter::field(
            fields::SALARY,
            FieldOp::GreaterThanOrEqual,
            query.min_limit().to_firestore_value(),
        ));
        filters.push(Filter::field(
            fields::SALARY,
            FieldOp::LessThanOrEqual,
            query.max_limit().to_firestore_value(),
        ));
        if let RegionFilter::Only(region) = query.region() {
            filters.push(Filter::field(
                fields::REGION,
                FieldOp::Equal,
                region.as_str().to_firestore_value(),
            ));
        }

        let structured = StructuredQuery::collection(JOBS)
            .filter(Filter::and(filters))
            .order_by(fields::SALARY, query.order().firestore_direction());

        let docs = self.store.run_query(structured).await?;
        let jobs = docs
            .iter()
            .map(document_to_job)
            .collect::<FirestoreResult<Vec<_>>>()?;

        let page = JobPage::paginate(jobs, query.page_size(), query.page_index());
        debug!(
            total = page.total_count(),
            returned = page.jobs().len(),
            "Fetched job page"
        );
        Ok(page)
    }

    /// Resolve ids to active jobs, best effort.
    ///
    /// Unknown, deleted and expired ids are dropped. Ids are queried in
    /// chunks of [`ID_IN_LIMIT`]; a chunk that fails is logged and dropped
    /// while the others still resolve. Results follow the order of `ids`.
    pub async fn fetch_id_list(&self, ids: &[JobId]) -> Vec<Job> {
        let mut seen = HashSet::new();
        let unique: Vec<&JobId> = ids
            .iter()
            .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
            .collect();
        if unique.is_empty() {
            return Vec::new();
        }

        let chunks = unique.chunks(ID_IN_LIMIT).collect::<Vec<_>>();
        let results = join_all(chunks.iter().map(|chunk| self.fetch_id_chunk(chunk))).await;

        let mut resolved: HashMap<String, Job> = HashMap::new();
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(jobs) => resolved.extend(jobs.into_iter().map(|j| (j.id.as_str().to_string(), j))),
                Err(e) => warn!(
                    chunk_size = chunk.len(),
                    error = %e,
                    "Dropping job ids that failed to resolve"
                ),
            }
        }

        unique
            .into_iter()
            .filter_map(|id| resolved.remove(id.as_str()))
            .collect()
    }

    async fn fetch_id_chunk(&self, chunk: &[&JobId]) -> RepoResult<Vec<Job>> {
        let ids = Value::array(chunk.iter().map(|id| id.as_str().to_firestore_value()).collect());
        let query = StructuredQuery::collection(JOBS).filter(Filter::and(vec![
            active_filter(),
            Filter::field(fields::ID, FieldOp::In, ids),
        ]));

        let docs = self.store.run_query(query).await?;
        Ok(docs
            .iter()
            .map(document_to_job)
            .collect::<FirestoreResult<Vec<_>>>()?)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Store a new active job under a fresh id.
    pub async fn create(&self, draft: JobDraft) -> RepoResult<Job> {
        let draft = draft.prepare(&self.catalogue)?;
        let job = Job::from_draft(JobId::new(), JobStatus::Active, draft);

        self.store
            .create_document(JOBS, job.id.as_str(), job_to_fields(&job))
            .await?;
        info!(job_id = %job.id, "Created job");
        Ok(job)
    }

    /// Overwrite an existing job's content. Its status is kept.
    pub async fn replace(&self, id: &JobId, draft: JobDraft) -> RepoResult<Job> {
        ensure_id(id)?;
        let draft = draft.prepare(&self.catalogue)?;

        let job = run_transaction(&self.store, "replace_job", |tx| {
            let id = id.clone();
            let draft = draft.clone();
            async move {
                let existing = tx
                    .get(JOBS, id.as_str())
                    .await?
                    .ok_or_else(|| RepoError::InvalidId(id.to_string()))?;

                let job = Job::from_draft(id, document_status(&existing)?, draft);
                tx.set(JOBS, job.id.as_str(), job_to_fields(&job));
                Ok::<_, RepoError>(job)
            }
        })
        .await?;

        info!(job_id = %job.id, "Replaced job");
        Ok(job)
    }

    /// Soft-delete: `Active -> Deleted`.
    pub async fn mark_deleted(&self, id: &JobId) -> RepoResult<()> {
        self.set_status(id, JobStatus::Deleted).await.map(|_| ())
    }

    /// Undo a soft delete: `Deleted -> Active`.
    pub async fn restore(&self, id: &JobId) -> RepoResult<()> {
        self.set_status(id, JobStatus::Active).await.map(|_| ())
    }

    /// Move a job to `to`, checked against the status transition table.
    ///
    /// Only the status field is written.
    pub async fn set_status(&self, id: &JobId, to: JobStatus) -> RepoResult<JobStatus> {
        ensure_id(id)?;

        let (from, to) = run_transaction(&self.store, "set_job_status", |tx| {
            let id = id.clone();
            async move {
                let existing = tx
                    .get(JOBS, id.as_str())
                    .await?
                    .ok_or_else(|| RepoError::InvalidId(id.to_string()))?;

                let from = document_status(&existing)?;
                let to = from.transition(to)?;
                if from != to {
                    let fields = HashMap::from([
                        (fields::STATUS.to_string(), to.as_str().to_firestore_value()),
                        (fields::UPDATED_AT.to_string(), Utc::now().to_firestore_value()),
                    ]);
                    tx.update(
                        JOBS,
                        id.as_str(),
                        fields,
                        vec![fields::STATUS.to_string(), fields::UPDATED_AT.to_string()],
                    );
                }
                Ok::<_, RepoError>((from, to))
            }
        })
        .await?;

        info!(job_id = %id, from = %from, to = %to, "Job status changed");
        Ok(to)
    }

    /// Point read; `None` for an empty or unknown id.
    pub async fn fetch_one(&self, id: &JobId) -> RepoResult<Option<Job>> {
        if id.is_empty() {
            return Ok(None);
        }
        match self.store.get_document(JOBS, id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_job(&doc)?)),
            None => Ok(None),
        }
    }
}

fn ensure_id(id: &JobId) -> RepoResult<()> {
    if id.is_empty() {
        return Err(RepoError::invalid_argument("job id cannot be empty"));
    }
    Ok(())
}

// =============================================================================
// Conversion Helpers
// =============================================================================

pub(crate) fn job_to_fields(job: &Job) -> HashMap<String, Value> {
    let mut location = HashMap::new();
    location.insert("address".to_string(), job.location.address.to_firestore_value());
    if let Some(ref postal_code) = job.location.postal_code {
        location.insert("postal_code".to_string(), postal_code.to_firestore_value());
    }
    location.insert("latitude".to_string(), job.location.latitude.to_firestore_value());
    location.insert("longitude".to_string(), job.location.longitude.to_firestore_value());
    if let Some(ref region) = job.location.region {
        location.insert("region".to_string(), region.as_str().to_firestore_value());
    }

    let mut payment = HashMap::new();
    payment.insert("minimum".to_string(), job.payment.minimum.to_firestore_value());
    payment.insert("maximum".to_string(), job.payment.maximum.to_firestore_value());
    payment.insert("frequency".to_string(), job.payment.frequency.as_str().to_firestore_value());

    let mut fields = HashMap::new();
    fields.insert(fields::ID.to_string(), job.id.as_str().to_firestore_value());
    fields.insert(fields::STATUS.to_string(), job.status.as_str().to_firestore_value());
    fields.insert(fields::TITLE.to_string(), job.title.to_firestore_value());
    fields.insert(fields::DESCRIPTION.to_string(), job.description.to_firestore_value());
    fields.insert(fields::LOCATION.to_string(), Value::map(location));
    fields.insert(fields::PAYMENT.to_string(), Value::map(payment));
    fields.insert(fields::REQUIREMENTS.to_string(), job.requirements.to_firestore_value());
    fields.insert(fields::EXPIRY.to_string(), job.expiry.to_firestore_value());
    if let Some(duration) = job.duration {
        fields.insert(fields::DURATION.to_string(), duration.as_str().to_firestore_value());
    }
    fields.insert(fields::UPDATED_AT.to_string(), Utc::now().to_firestore_value());
    fields
}

fn document_status(doc: &Document) -> FirestoreResult<JobStatus> {
    match doc.field(fields::STATUS).and_then(String::from_firestore_value) {
        Some(raw) => raw.parse().map_err(|_| {
            FirestoreError::invalid_response(format!("unknown job status '{}'", raw))
        }),
        None => Ok(JobStatus::default()),
    }
}

pub(crate) fn document_to_job(doc: &Document) -> FirestoreResult<Job> {
    let fields = doc.fields.as_ref().ok_or_else(|| {
        FirestoreError::InvalidResponse("Document has no fields".to_string())
    })?;

    let get_string = |map: &HashMap<String, Value>, key: &str| -> Option<String> {
        map.get(key).and_then(String::from_firestore_value)
    };

    let id = get_string(fields, fields::ID)
        .or_else(|| doc.id().map(str::to_string))
        .ok_or_else(|| FirestoreError::invalid_response("job document without id"))?;

    let empty = HashMap::new();
    let location = fields
        .get(fields::LOCATION)
        .and_then(Value::as_map)
        .unwrap_or(&empty);
    let payment = fields
        .get(fields::PAYMENT)
        .and_then(Value::as_map)
        .unwrap_or(&empty);
    let number = |map: &HashMap<String, Value>, key: &str| -> f64 {
        map.get(key).and_then(f64::from_firestore_value).unwrap_or(0.0)
    };
    let integer = |map: &HashMap<String, Value>, key: &str| -> i64 {
        map.get(key).and_then(i64::from_firestore_value).unwrap_or(0)
    };

    let expiry = fields
        .get(fields::EXPIRY)
        .and_then(chrono::DateTime::from_firestore_value)
        .ok_or_else(|| {
            FirestoreError::invalid_response(format!("job {} has no valid expiry", id))
        })?;

    Ok(Job {
        id: JobId::from_string(id),
        status: document_status(doc)?,
        title: get_string(fields, fields::TITLE).unwrap_or_default(),
        description: get_string(fields, fields::DESCRIPTION).unwrap_or_default(),
        location: Location {
            address: get_string(location, "address").unwrap_or_default(),
            postal_code: get_string(location, "postal_code"),
            latitude: number(location, "latitude"),
            longitude: number(location, "longitude"),
            region: get_string(location, "region").and_then(|r| Region::new(r).ok()),
        },
        payment: Payment {
            minimum: integer(payment, "minimum"),
            maximum: integer(payment, "maximum"),
            frequency: get_string(payment, "frequency")
                .and_then(|f| f.parse::<PayFrequency>().ok())
                .unwrap_or_default(),
        },
        requirements: fields
            .get(fields::REQUIREMENTS)
            .and_then(BTreeMap::<String, bool>::from_firestore_value)
            .unwrap_or_default(),
        expiry,
        duration: get_string(fields, fields::DURATION).and_then(|d| d.parse::<JobDuration>().ok()),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::TimeZone;

    pub(crate) fn draft(title: &str, max_salary: i64, demands: &[&str]) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            description: "Shift work".to_string(),
            location: Location {
                address: "12 Main Street".to_string(),
                postal_code: Some("10100".to_string()),
                latitude: 6.9,
                longitude: 79.8,
                region: Some(Region::new("western").unwrap()),
            },
            payment: Payment {
                minimum: max_salary / 2,
                maximum: max_salary,
                frequency: PayFrequency::Monthly,
            },
            requirements: demands.iter().map(|id| (id.to_string(), true)).collect(),
            expiry: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            duration: Some(JobDuration::LongTerm),
        }
    }

    fn repo() -> (Arc<MemoryStore>, JobRepository) {
        let memory = Arc::new(MemoryStore::new());
        let catalogue = RequirementCatalogue::from_json(
            r#"[{"id": "o-level"}, {"id": "driving-c"}]"#,
        )
        .unwrap();
        let repo = JobRepository::new(memory.clone(), Arc::new(catalogue));
        (memory, repo)
    }

    #[test]
    fn test_fields_round_trip() {
        let job = Job::from_draft(JobId::from("j1"), JobStatus::Active, draft("Driver", 500, &["driving-c"]));
        let doc = Document::new(job_to_fields(&job));
        assert_eq!(document_to_job(&doc).unwrap(), job);
    }

    #[test]
    fn test_missing_duration_is_omitted() {
        let mut d = draft("Driver", 500, &[]);
        d.duration = None;
        let job = Job::from_draft(JobId::from("j1"), JobStatus::Active, d);
        let fields = job_to_fields(&job);
        assert!(!fields.contains_key(fields::DURATION));
        assert_eq!(document_to_job(&Document::new(fields)).unwrap().duration, None);
    }

    #[test]
    fn test_document_without_expiry_is_rejected() {
        let job = Job::from_draft(JobId::from("j1"), JobStatus::Active, draft("Driver", 500, &[]));
        let mut fields = job_to_fields(&job);
        fields.remove(fields::EXPIRY);
        assert!(document_to_job(&Document::new(fields)).is_err());
    }

    #[tokio::test]
    async fn test_create_fills_requirements_and_assigns_id() {
        let (memory, repo) = repo();
        let job = repo.create(draft("Driver", 500, &["driving-c"])).await.unwrap();

        assert!(!job.id.is_empty());
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.requirements.get("o-level"), Some(&false));
        assert!(job.demands("driving-c"));
        assert!(!job.demands("o-level"));
        assert_eq!(memory.len(JOBS), 1);
        assert_eq!(repo.fetch_one(&job.id).await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_requirement() {
        let (memory, repo) = repo();
        let err = repo.create(draft("Driver", 500, &["juggling"])).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_keeps_status() {
        let (_, repo) = repo();
        let job = repo.create(draft("Driver", 500, &[])).await.unwrap();
        repo.mark_deleted(&job.id).await.unwrap();

        let replaced = repo.replace(&job.id, draft("Senior driver", 900, &[])).await.unwrap();
        assert_eq!(replaced.status, JobStatus::Deleted);
        let stored = repo.fetch_one(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Senior driver");
        assert_eq!(stored.payment.maximum, 900);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (_, repo) = repo();
        let job = repo.create(draft("Driver", 500, &[])).await.unwrap();

        repo.mark_deleted(&job.id).await.unwrap();
        assert_eq!(repo.fetch_one(&job.id).await.unwrap().unwrap().status, JobStatus::Deleted);

        // deleting twice is a no-op
        repo.mark_deleted(&job.id).await.unwrap();

        repo.restore(&job.id).await.unwrap();
        assert!(repo.fetch_one(&job.id).await.unwrap().unwrap().is_active());

        let err = repo.set_status(&job.id, JobStatus::Expired).await.unwrap_err();
        assert!(matches!(err, RepoError::NotImplemented(_)));
    }

    #[tokio::test]
    async fn test_mark_deleted_writes_status_and_stamp_only() {
        let (memory, repo) = repo();
        let job = repo.create(draft("Driver", 500, &[])).await.unwrap();
        let before = memory.fields(JOBS, job.id.as_str()).unwrap();
        repo.mark_deleted(&job.id).await.unwrap();

        let fields = memory.fields(JOBS, job.id.as_str()).unwrap();
        // updated_at is restamped; it may tie with create's stamp
        let changed: Vec<&str> = fields
            .iter()
            .filter(|(k, v)| k.as_str() != fields::UPDATED_AT && before.get(*k) != Some(*v))
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(changed, vec![fields::STATUS]);
        assert!(fields.contains_key(fields::UPDATED_AT));
        assert_eq!(fields.len(), before.len());
        assert_eq!(
            String::from_firestore_value(&fields[fields::STATUS]).as_deref(),
            Some("deleted")
        );
        assert_eq!(
            String::from_firestore_value(&fields[fields::TITLE]).as_deref(),
            Some("Driver")
        );
    }

    #[tokio::test]
    async fn test_fetch_one_empty_id() {
        let (_, repo) = repo();
        assert_eq!(repo.fetch_one(&JobId::from("")).await.unwrap(), None);
        assert_eq!(repo.fetch_one(&JobId::from("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_page_filters_and_orders_by_salary() {
        let (_, repo) = repo();
        for (title, salary) in [("a", 100), ("b", 400), ("c", 250), ("d", 50)] {
            repo.create(draft(title, salary, &[])).await.unwrap();
        }
        let gone = repo.create(draft("e", 300, &[])).await.unwrap();
        repo.mark_deleted(&gone.id).await.unwrap();

        let query = JobQuery::builder()
            .min_limit(100)
            .max_limit(300)
            .sort_by(SortBy::Salary)
            .build()
            .unwrap();
        let page = repo.fetch_page(&query).await.unwrap();
        let titles: Vec<_> = page.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a"]);
        assert_eq!(page.total_count(), 2);

        let ascending = repo
            .fetch_page_with(RegionFilter::Entire, SortBy::Salary, SortOrder::Ascending, 2, 1)
            .await
            .unwrap();
        let titles: Vec<_> = ascending.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "b"]);
        assert_eq!(ascending.total_count(), 4);
        assert_eq!((ascending.range().min(), ascending.range().max()), (3, 4));
    }

    #[tokio::test]
    async fn test_region_filter() {
        let (_, repo) = repo();
        repo.create(draft("west", 100, &[])).await.unwrap();
        let mut south = draft("south", 100, &[]);
        south.location.region = Some(Region::new("southern").unwrap());
        repo.create(south).await.unwrap();

        let page = repo
            .fetch_page_with(
                RegionFilter::Only(Region::new("southern").unwrap()),
                SortBy::Salary,
                SortOrder::Descending,
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(page.jobs().len(), 1);
        assert_eq!(page.jobs()[0].title, "south");
    }

    #[tokio::test]
    async fn test_unsupported_sort_never_reaches_store() {
        let (memory, repo) = repo();
        memory.fail_next_queries(1);
        let err = repo
            .fetch_page_with(RegionFilter::Entire, SortBy::Distance, SortOrder::Descending, 20, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UnsupportedFilter(_)));
        // the injected failure is still pending
        assert!(repo
            .fetch_page_with(RegionFilter::Entire, SortBy::Salary, SortOrder::Descending, 20, 0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_fetch_id_list_keeps_order_and_drops_inactive() {
        let (_, repo) = repo();
        let a = repo.create(draft("a", 100, &[])).await.unwrap();
        let b = repo.create(draft("b", 200, &[])).await.unwrap();
        let c = repo.create(draft("c", 300, &[])).await.unwrap();
        repo.mark_deleted(&b.id).await.unwrap();

        let ids = vec![c.id.clone(), JobId::from("unknown"), b.id.clone(), a.id.clone(), c.id.clone()];
        let jobs = repo.fetch_id_list(&ids).await;
        let titles: Vec<_> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_fetch_id_list_empty_input_skips_store() {
        let (memory, repo) = repo();
        memory.fail_next_queries(1);
        assert!(repo.fetch_id_list(&[]).await.is_empty());
        assert!(repo.fetch_id_list(&[JobId::from("")]).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_id_list_drops_failed_chunk() {
        let (memory, repo) = repo();
        let mut ids = Vec::new();
        for i in 0..=ID_IN_LIMIT {
            ids.push(repo.create(draft(&format!("job{}", i), 100, &[])).await.unwrap().id);
        }
        assert_eq!(repo.fetch_id_list(&ids).await.len(), ids.len());

        memory.fail_next_queries(1);
        let partial = repo.fetch_id_list(&ids).await;
        assert!(!partial.is_empty());
        assert!(partial.len() < ids.len());
    }
}
