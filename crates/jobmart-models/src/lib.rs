//! Shared data models for the JobMart backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job postings, their status machine and validation
//! - Listing queries (salary bounds, region, sort, pagination)
//! - Result pages with count/range metadata
//! - The requirement catalogue and eligibility set arithmetic
//! - Applicant accounts and interested-list membership

pub mod applicant;
pub mod error;
pub mod job;
pub mod job_status;
pub mod page;
pub mod query;
pub mod requirement;

// Re-export common types
pub use applicant::{ApplicantAccount, Membership};
pub use error::{ModelError, ModelResult};
pub use job::{Job, JobDraft, JobDuration, JobId, Location, PayFrequency, Payment};
pub use job_status::JobStatus;
pub use page::{IntRange, JobPage};
pub use query::{
    JobQuery, JobQueryBuilder, JobQueryParams, Region, RegionFilter, SortBy, SortOrder,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use requirement::{Requirement, RequirementCatalogue};
