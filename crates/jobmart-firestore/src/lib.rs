//! Firestore REST API client and the job listing repositories built on it.
//!
//! This crate provides:
//! - A `DocumentStore` seam with a Firestore REST implementation
//! - Read-write transactions with retry on contention
//! - Store-side eligibility predicates for requirement matching
//! - Repositories for jobs and applicant accounts
//! - Service account authentication via gcp_auth

pub mod applicant_repo;
pub mod client;
pub mod eligibility;
pub mod error;
pub mod field_path;
pub mod job_repo;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod metrics;
pub mod repo_error;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use applicant_repo::ApplicantRepository;
pub use client::{FirestoreClient, FirestoreConfig};
pub use eligibility::{eligibility_filters, filters_for_skills};
pub use error::{FirestoreError, FirestoreResult};
pub use job_repo::JobRepository;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use repo_error::{with_deadline, RepoError, RepoResult};
pub use store::DocumentStore;
pub use transaction::{run_transaction, Transaction};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
