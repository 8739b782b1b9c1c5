//! Errors surfaced by the job and applicant repositories.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use jobmart_models::ModelError;

use crate::error::FirestoreError;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    /// Malformed or missing input; rejected before any store call.
    #[error(transparent)]
    Validation(ModelError),

    /// The document a mutation targets does not exist.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// The applicant account document does not exist.
    #[error("Invalid applicant id: {0}")]
    InvalidApplicantId(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Store error: {0}")]
    Store(#[from] FirestoreError),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

impl RepoError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::Validation(ModelError::invalid(msg))
    }

    /// Errors the caller caused and can fix by changing the request.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            RepoError::Validation(_)
                | RepoError::InvalidId(_)
                | RepoError::InvalidApplicantId(_)
                | RepoError::UnsupportedFilter(_)
                | RepoError::NotImplemented(_)
        )
    }
}

impl From<ModelError> for RepoError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedFilter(what) => RepoError::UnsupportedFilter(what),
            e @ ModelError::NotImplemented { .. } => RepoError::NotImplemented(e.to_string()),
            e => RepoError::Validation(e),
        }
    }
}

/// Await `fut` for at most `deadline`, turning expiry into `RepoError::Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(deadline_ms = deadline.as_millis() as u64, "Store call exceeded its deadline");
            Err(RepoError::Timeout(deadline))
        }
    }
}
