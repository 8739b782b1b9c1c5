//! Applicant accounts: skills and the interested-job list.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use jobmart_models::{ApplicantAccount, JobId, JobPage, JobQuery, Membership, MAX_PAGE_SIZE};

use crate::job_repo::JobRepository;
use crate::repo_error::{RepoError, RepoResult};
use crate::store::DocumentStore;
use crate::transaction::run_transaction;
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue};

/// Top-level collection holding applicant accounts.
pub const APPLICANTS: &str = "applicants";

pub mod fields {
    pub const SKILLS: &str = "skills";
    pub const INTERESTED: &str = "interested";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Repository for applicant account documents.
#[derive(Clone)]
pub struct ApplicantRepository {
    store: Arc<dyn DocumentStore>,
    jobs: JobRepository,
}

impl ApplicantRepository {
    pub fn new(store: Arc<dyn DocumentStore>, jobs: JobRepository) -> Self {
        Self { store, jobs }
    }

    pub async fn get(&self, applicant_id: &str) -> RepoResult<Option<ApplicantAccount>> {
        if applicant_id.trim().is_empty() {
            return Ok(None);
        }
        let doc = self.store.get_document(APPLICANTS, applicant_id).await?;
        Ok(doc.map(|d| document_to_applicant(applicant_id, &d)))
    }

    /// Replace the applicant's skills. Every skill must be in the catalogue.
    pub async fn set_skills(
        &self,
        applicant_id: &str,
        skills: Vec<String>,
    ) -> RepoResult<BTreeSet<String>> {
        ensure_applicant_id(applicant_id)?;
        let (known, unknown) = self.jobs.catalogue().partition_skills(skills);
        if !unknown.is_empty() {
            return Err(RepoError::invalid_argument(format!(
                "unknown skills: {}",
                unknown.join(", ")
            )));
        }

        run_transaction(&self.store, "set_skills", |tx| {
            let known = known.clone();
            async move {
                if tx.get(APPLICANTS, applicant_id).await?.is_none() {
                    return Err(RepoError::InvalidApplicantId(applicant_id.to_string()));
                }
                let update = HashMap::from([
                    (fields::SKILLS.to_string(), known.to_firestore_value()),
                    (fields::UPDATED_AT.to_string(), Utc::now().to_firestore_value()),
                ]);
                tx.update(
                    APPLICANTS,
                    applicant_id,
                    update,
                    vec![fields::SKILLS.to_string(), fields::UPDATED_AT.to_string()],
                );
                Ok(())
            }
        })
        .await?;

        info!(applicant_id = %applicant_id, skills = known.len(), "Updated applicant skills");
        Ok(known)
    }

    /// Add `job_id` to, or remove it from, the applicant's interested list.
    ///
    /// Both directions are idempotent. The job itself is not checked; a
    /// stale id is filtered out when the list is resolved.
    pub async fn toggle_interest(
        &self,
        applicant_id: &str,
        job_id: &JobId,
        membership: Membership,
    ) -> RepoResult<()> {
        ensure_applicant_id(applicant_id)?;
        if job_id.is_empty() {
            return Err(RepoError::invalid_argument("job id cannot be empty"));
        }

        run_transaction(&self.store, "toggle_interest", |tx| async move {
            if tx.get(APPLICANTS, applicant_id).await?.is_none() {
                return Err(RepoError::InvalidId(applicant_id.to_string()));
            }
            let values = vec![job_id.as_str().to_firestore_value()];
            match membership {
                Membership::Interested => {
                    tx.array_union(APPLICANTS, applicant_id, fields::INTERESTED, values)
                }
                Membership::NotInterested => {
                    tx.array_remove(APPLICANTS, applicant_id, fields::INTERESTED, values)
                }
            }
            Ok(())
        })
        .await?;

        info!(
            applicant_id = %applicant_id,
            job_id = %job_id,
            membership = ?membership,
            "Updated interested list"
        );
        Ok(())
    }

    /// Resolve the applicant's interested list into a page of live jobs.
    ///
    /// Ids that no longer resolve, or whose lookup failed, are left out.
    pub async fn fetch_interested_page(
        &self,
        applicant_id: &str,
        page_size: u32,
        page_index: u32,
    ) -> RepoResult<JobPage> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(RepoError::invalid_argument(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let doc = self.require_account(applicant_id).await?;

        let ids: Vec<JobId> = doc
            .field(fields::INTERESTED)
            .map(|v| {
                v.as_array()
                    .iter()
                    .filter_map(String::from_firestore_value)
                    .map(JobId::from)
                    .collect()
            })
            .unwrap_or_default();

        let jobs = self.jobs.fetch_id_list(&ids).await;
        if jobs.len() < ids.len() {
            warn!(
                applicant_id = %applicant_id,
                listed = ids.len(),
                resolved = jobs.len(),
                "Some interested jobs did not resolve"
            );
        }
        Ok(JobPage::paginate(jobs, page_size, page_index))
    }

    /// Jobs the applicant is eligible for, given their stored skills.
    pub async fn fetch_eligible_page(
        &self,
        applicant_id: &str,
        query: &JobQuery,
    ) -> RepoResult<JobPage> {
        let doc = self.require_account(applicant_id).await?;
        let account = document_to_applicant(applicant_id, &doc);
        self.jobs.fetch_eligible(account.skills, query).await
    }

    async fn require_account(&self, applicant_id: &str) -> RepoResult<Document> {
        if applicant_id.trim().is_empty() {
            return Err(RepoError::InvalidApplicantId(applicant_id.to_string()));
        }
        self.store
            .get_document(APPLICANTS, applicant_id)
            .await?
            .ok_or_else(|| RepoError::InvalidApplicantId(applicant_id.to_string()))
    }
}

fn ensure_applicant_id(applicant_id: &str) -> RepoResult<()> {
    if applicant_id.trim().is_empty() {
        return Err(RepoError::invalid_argument("applicant id cannot be empty"));
    }
    Ok(())
}

fn document_to_applicant(applicant_id: &str, doc: &Document) -> ApplicantAccount {
    ApplicantAccount {
        id: applicant_id.to_string(),
        skills: doc
            .field(fields::SKILLS)
            .and_then(BTreeSet::<String>::from_firestore_value)
            .unwrap_or_default(),
        interested: doc
            .field(fields::INTERESTED)
            .and_then(BTreeSet::<String>::from_firestore_value)
            .unwrap_or_default()
            .into_iter()
            .map(JobId::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_repo::tests::draft;
    use crate::memory::MemoryStore;
    use jobmart_models::{RequirementCatalogue, SortBy};

    struct Fixture {
        memory: Arc<MemoryStore>,
        jobs: JobRepository,
        applicants: ApplicantRepository,
    }

    fn fixture() -> Fixture {
        let memory = Arc::new(MemoryStore::new());
        let catalogue = Arc::new(
            RequirementCatalogue::from_json(r#"[{"id": "o-level"}, {"id": "driving-c"}]"#).unwrap(),
        );
        let jobs = JobRepository::new(memory.clone(), catalogue);
        let applicants = ApplicantRepository::new(memory.clone(), jobs.clone());
        memory.insert("applicants", "a1", HashMap::new());
        Fixture {
            memory,
            jobs,
            applicants,
        }
    }

    fn interested(memory: &MemoryStore) -> Vec<String> {
        memory
            .fields(APPLICANTS, "a1")
            .and_then(|f| f.get(fields::INTERESTED).cloned())
            .map(|v| {
                v.as_array()
                    .iter()
                    .filter_map(String::from_firestore_value)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_toggle_adds_and_removes() {
        let f = fixture();
        let job = JobId::from("j1");

        f.applicants.toggle_interest("a1", &job, Membership::Interested).await.unwrap();
        f.applicants.toggle_interest("a1", &job, Membership::Interested).await.unwrap();
        assert_eq!(interested(&f.memory), vec!["j1".to_string()]);

        f.applicants.toggle_interest("a1", &job, Membership::NotInterested).await.unwrap();
        f.applicants.toggle_interest("a1", &job, Membership::NotInterested).await.unwrap();
        assert!(interested(&f.memory).is_empty());
    }

    #[tokio::test]
    async fn test_toggle_unknown_applicant() {
        let f = fixture();
        let writes = f.memory.write_count();
        let err = f
            .applicants
            .toggle_interest("ghost", &JobId::from("j1"), Membership::Interested)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidId(_)));
        assert_eq!(f.memory.write_count(), writes);
    }

    #[tokio::test]
    async fn test_toggle_rejects_empty_ids() {
        let f = fixture();
        let err = f
            .applicants
            .toggle_interest("a1", &JobId::from(" "), Membership::Interested)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn test_interested_page_resolves_live_jobs() {
        let f = fixture();
        let live = f.jobs.create(draft("live", 100, &[])).await.unwrap();
        let gone = f.jobs.create(draft("gone", 100, &[])).await.unwrap();
        f.jobs.mark_deleted(&gone.id).await.unwrap();

        for id in [&live.id, &gone.id, &JobId::from("missing")] {
            f.applicants.toggle_interest("a1", id, Membership::Interested).await.unwrap();
        }

        let page = f.applicants.fetch_interested_page("a1", 20, 0).await.unwrap();
        assert_eq!(page.jobs().len(), 1);
        assert_eq!(page.jobs()[0].id, live.id);
        assert_eq!(page.total_count(), 1);
        assert_eq!((page.range().min(), page.range().max()), (1, 1));
    }

    #[tokio::test]
    async fn test_interested_page_empty_list() {
        let f = fixture();
        let page = f.applicants.fetch_interested_page("a1", 20, 0).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count(), 0);
    }

    #[tokio::test]
    async fn test_interested_page_unknown_applicant() {
        let f = fixture();
        let err = f.applicants.fetch_interested_page("ghost", 20, 0).await.unwrap_err();
        assert!(matches!(err, RepoError::InvalidApplicantId(_)));
    }

    #[tokio::test]
    async fn test_interested_page_survives_failed_lookup() {
        let f = fixture();
        let live = f.jobs.create(draft("live", 100, &[])).await.unwrap();
        f.applicants.toggle_interest("a1", &live.id, Membership::Interested).await.unwrap();

        f.memory.fail_next_queries(1);
        let page = f.applicants.fetch_interested_page("a1", 20, 0).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_set_skills_and_eligible_page() {
        let f = fixture();
        f.jobs.create(draft("desk", 100, &["o-level"])).await.unwrap();
        f.jobs.create(draft("truck", 200, &["driving-c"])).await.unwrap();
        f.jobs.create(draft("any", 50, &[])).await.unwrap();

        let skills = f.applicants.set_skills("a1", vec!["o-level".into()]).await.unwrap();
        assert_eq!(skills, BTreeSet::from(["o-level".to_string()]));
        let account = f.applicants.get("a1").await.unwrap().unwrap();
        assert!(account.skills.contains("o-level"));

        let query = JobQuery::builder().min_limit(0).sort_by(SortBy::Salary).build().unwrap();
        let page = f.applicants.fetch_eligible_page("a1", &query).await.unwrap();
        let titles: Vec<_> = page.jobs().iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["desk", "any"]);
    }

    #[tokio::test]
    async fn test_set_skills_rejects_unknown() {
        let f = fixture();
        let err = f.applicants.set_skills("a1", vec!["juggling".into()]).await.unwrap_err();
        assert!(err.is_bad_request());
        let err = f.applicants.set_skills("ghost", vec![]).await.unwrap_err();
        assert!(matches!(err, RepoError::InvalidApplicantId(_)));
    }
}
