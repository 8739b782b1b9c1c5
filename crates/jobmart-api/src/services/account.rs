//! Role checks for the two kinds of account.
//!
//! Authorization is existence-only: a caller acts as a business when
//! `businesses/{uid}` exists and as an applicant when `applicants/{uid}` does.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use jobmart_firestore::applicant_repo::APPLICANTS;
use jobmart_firestore::{with_deadline, DocumentStore, RepoError};

use crate::error::{ApiError, ApiResult};

pub const BUSINESSES: &str = "businesses";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Business,
    Applicant,
}

impl Role {
    fn collection(self) -> &'static str {
        match self {
            Role::Business => BUSINESSES,
            Role::Applicant => APPLICANTS,
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Whether `uid` has an account document for `role`.
    pub async fn has_role(&self, uid: &str, role: Role) -> ApiResult<bool> {
        let lookup = async {
            let doc = self.store.get_document(role.collection(), uid).await?;
            Ok::<_, RepoError>(doc.is_some())
        };
        Ok(with_deadline(self.timeout, lookup).await?)
    }

    /// Fail with 403 unless `uid` has an account document for `role`.
    pub async fn require(&self, uid: &str, role: Role) -> ApiResult<()> {
        if self.has_role(uid, role).await? {
            Ok(())
        } else {
            debug!(uid = %uid, role = ?role, "Caller lacks account for role");
            Err(ApiError::forbidden(match role {
                Role::Business => "A business account is required",
                Role::Applicant => "An applicant account is required",
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobmart_firestore::MemoryStore;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_roles_follow_account_documents() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert(BUSINESSES, "b1", HashMap::new());
        memory.insert(APPLICANTS, "a1", HashMap::new());
        let accounts = AccountService::new(memory, Duration::from_secs(1));

        assert!(accounts.require("b1", Role::Business).await.is_ok());
        assert!(accounts.require("a1", Role::Applicant).await.is_ok());
        assert!(matches!(
            accounts.require("a1", Role::Business).await,
            Err(ApiError::Forbidden(_))
        ));
    }
}
