//! Job posting models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{ModelError, ModelResult};
use crate::query::Region;
use crate::requirement::RequirementCatalogue;
use crate::JobStatus;

/// Store-assigned identifier of a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Allocate a fresh document id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How often the quoted payment is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    Hourly,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl PayFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayFrequency::Hourly => "hourly",
            PayFrequency::Weekly => "weekly",
            PayFrequency::Monthly => "monthly",
            PayFrequency::Yearly => "yearly",
        }
    }
}

impl FromStr for PayFrequency {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(ModelError::invalid(format!("unknown pay frequency '{}'", other))),
        }
    }
}

/// Expected length of the engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobDuration {
    OneDay,
    OneWeek,
    OneMonth,
    LongTerm,
}

impl JobDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobDuration::OneDay => "one_day",
            JobDuration::OneWeek => "one_week",
            JobDuration::OneMonth => "one_month",
            JobDuration::LongTerm => "long_term",
        }
    }
}

impl FromStr for JobDuration {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one_day" => Ok(Self::OneDay),
            "one_week" => Ok(Self::OneWeek),
            "one_month" => Ok(Self::OneMonth),
            "long_term" => Ok(Self::LongTerm),
            other => Err(ModelError::invalid(format!("unknown job duration '{}'", other))),
        }
    }
}

/// Where the work happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Location {
    #[validate(custom(function = "non_blank"))]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// Region used by listing filters. Postings without one only show up
    /// in whole-region listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

/// Salary range, currency-less.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_payment_range"))]
pub struct Payment {
    pub minimum: i64,
    pub maximum: i64,
    #[serde(default)]
    pub frequency: PayFrequency,
}

fn validate_payment_range(payment: &Payment) -> Result<(), ValidationError> {
    if payment.minimum < 0 {
        return Err(ValidationError::new("payment_negative"));
    }
    if payment.minimum > payment.maximum {
        return Err(ValidationError::new("payment_min_exceeds_max"));
    }
    Ok(())
}

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Job content as submitted by a business, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct JobDraft {
    #[validate(custom(function = "non_blank"))]
    pub title: String,

    #[validate(custom(function = "non_blank"))]
    pub description: String,

    #[validate(nested)]
    pub location: Location,

    #[validate(nested)]
    pub payment: Payment,

    /// requirement-id -> whether the job demands it
    #[serde(default)]
    pub requirements: BTreeMap<String, bool>,

    pub expiry: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<JobDuration>,
}

impl JobDraft {
    /// Validate content and complete the requirement map against the catalogue.
    ///
    /// Every catalogue id missing from the map is filled in as `false`, so
    /// equality predicates on `requirements.<id>` match every stored posting.
    pub fn prepare(mut self, catalogue: &RequirementCatalogue) -> ModelResult<Self> {
        self.validate()
            .map_err(|e| ModelError::invalid(format!("invalid job: {}", e)))?;
        catalogue.normalize(&mut self.requirements)?;
        Ok(self)
    }
}

/// A stored job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,

    #[serde(default)]
    pub status: JobStatus,

    pub title: String,
    pub description: String,
    pub location: Location,
    pub payment: Payment,

    #[serde(default)]
    pub requirements: BTreeMap<String, bool>,

    pub expiry: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<JobDuration>,
}

impl Job {
    /// Stamp an id and status onto draft content.
    pub fn from_draft(id: JobId, status: JobStatus, draft: JobDraft) -> Self {
        Self {
            id,
            status,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            payment: draft.payment,
            requirements: draft.requirements,
            expiry: draft.expiry,
            duration: draft.duration,
        }
    }

    /// True if the posting demands the given requirement.
    pub fn demands(&self, requirement_id: &str) -> bool {
        self.requirements.get(requirement_id).copied().unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.status == JobStatus::Active
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_draft() -> JobDraft {
        JobDraft {
            title: "Delivery driver".to_string(),
            description: "Deliver parcels around town".to_string(),
            location: Location {
                address: "12 Main Street".to_string(),
                postal_code: Some("10100".to_string()),
                latitude: 6.93,
                longitude: 79.85,
                region: Some(Region::new("western").unwrap()),
            },
            payment: Payment {
                minimum: 40_000,
                maximum: 60_000,
                frequency: PayFrequency::Monthly,
            },
            requirements: BTreeMap::from([("driving-c".to_string(), true)]),
            expiry: Utc::now() + chrono::Duration::days(30),
            duration: Some(JobDuration::LongTerm),
        }
    }

    #[test]
    fn test_job_id_is_unique_and_non_empty() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert!(JobId::from("  ").is_empty());
    }

    #[test]
    fn test_prepare_fills_missing_requirements() {
        let catalogue = RequirementCatalogue::builtin().unwrap();
        let draft = sample_draft().prepare(&catalogue).unwrap();
        assert_eq!(draft.requirements.len(), catalogue.len());
        assert_eq!(draft.requirements.get("driving-c"), Some(&true));
        assert_eq!(draft.requirements.get("o-level"), Some(&false));
    }

    #[test]
    fn test_prepare_rejects_blank_title() {
        let mut draft = sample_draft();
        draft.title = "   ".to_string();
        let err = draft.prepare(&RequirementCatalogue::builtin().unwrap()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_prepare_rejects_inverted_payment() {
        let mut draft = sample_draft();
        draft.payment.minimum = 70_000;
        assert!(draft.prepare(&RequirementCatalogue::builtin().unwrap()).is_err());
    }

    #[test]
    fn test_prepare_rejects_unknown_requirement() {
        let mut draft = sample_draft();
        draft.requirements.insert("pilot-licence".to_string(), true);
        let err = draft.prepare(&RequirementCatalogue::builtin().unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument(_)));
    }

    #[test]
    fn test_draft_with_unknown_region_does_not_parse() {
        let mut json = serde_json::to_value(sample_draft()).unwrap();
        json["location"]["region"] = "atlantis".into();
        let err = serde_json::from_value::<JobDraft>(json.clone()).unwrap_err();
        assert!(err.to_string().contains("unknown region"));

        json["location"]["region"] = "Southern".into();
        let draft: JobDraft = serde_json::from_value(json).unwrap();
        assert_eq!(draft.location.region, Some(Region::Southern));
    }

    #[test]
    fn test_duration_is_optional_in_json() {
        let mut job = Job::from_draft(JobId::from("j1"), JobStatus::Active, sample_draft());
        job.duration = None;
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("duration").is_none());

        let back: Job = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, None);
        assert!(back.demands("driving-c"));
        assert!(!back.demands("o-level"));
    }
}
