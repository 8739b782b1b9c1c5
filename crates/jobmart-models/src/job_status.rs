//! Job posting status and its transition table.
//!
//! Postings move between `Active` and `Deleted`. `Expired` is declared so that
//! stored documents carrying it still parse, but nothing may move a posting
//! into it yet.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Posting status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Visible in listings
    #[default]
    Active,
    /// Soft-deleted by its owner
    Deleted,
    /// Past its expiry date (terminal)
    Expired,
}

/// Allowed `(from, to)` pairs. Same-state moves are always accepted.
const TRANSITIONS: &[(JobStatus, JobStatus)] = &[
    (JobStatus::Active, JobStatus::Deleted),
    (JobStatus::Deleted, JobStatus::Active),
];

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Deleted => "deleted",
            JobStatus::Expired => "expired",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Expired)
    }

    /// Validate a move to `to` against the transition table.
    ///
    /// Moves into `Expired` fail with `NotImplemented`; any other move not in
    /// the table fails with `InvalidTransition`.
    pub fn transition(self, to: JobStatus) -> ModelResult<JobStatus> {
        if self == to {
            return Ok(to);
        }
        if to == JobStatus::Expired {
            return Err(ModelError::NotImplemented { from: self, to });
        }
        if TRANSITIONS.contains(&(self, to)) {
            Ok(to)
        } else {
            Err(ModelError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(JobStatus::Active),
            "deleted" => Ok(JobStatus::Deleted),
            "expired" => Ok(JobStatus::Expired),
            other => Err(ModelError::invalid(format!("unknown job status '{}'", other))),
        }
    }
}
