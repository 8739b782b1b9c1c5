//! Applicant account models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::JobId;

/// Applicant account as far as the listing engine is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ApplicantAccount {
    pub id: String,
    /// Requirement ids the applicant holds.
    #[serde(default)]
    pub skills: BTreeSet<String>,
    /// Job ids the applicant marked as interesting (unordered, duplicate-free).
    #[serde(default)]
    pub interested: BTreeSet<JobId>,
}

impl ApplicantAccount {
    pub fn is_interested_in(&self, job_id: &JobId) -> bool {
        self.interested.contains(job_id)
    }
}

/// Desired membership of a job in an applicant's interested list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Interested,
    NotInterested,
}

impl Membership {
    /// Translate the legacy toggle flag, which names the state being left:
    /// `true` (currently interested) removes, `false` adds.
    pub fn from_currently_interested(currently_interested: bool) -> Self {
        if currently_interested {
            Membership::NotInterested
        } else {
            Membership::Interested
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_flag_polarity() {
        assert_eq!(Membership::from_currently_interested(true), Membership::NotInterested);
        assert_eq!(Membership::from_currently_interested(false), Membership::Interested);
    }

    #[test]
    fn test_membership_json() {
        let parsed: Membership = serde_json::from_str("\"not_interested\"").unwrap();
        assert_eq!(parsed, Membership::NotInterested);
    }
}
