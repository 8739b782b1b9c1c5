//! Requirement catalogue.
//!
//! The catalogue is a fixed table of skill identifiers with localized display
//! names. It is loaded once at startup and only read afterwards.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ModelError, ModelResult};

/// Locale used when a requested translation is missing.
pub const FALLBACK_LOCALE: &str = "en";

const BUILTIN_CATALOGUE: &str = include_str!("../data/requirements.json");

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Requirement {
    pub id: String,
    /// locale -> display name
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

/// Read-only table of every requirement a job can demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RequirementCatalogue {
    entries: BTreeMap<String, Requirement>,
}

impl RequirementCatalogue {
    /// Catalogue shipped with the binary.
    pub fn builtin() -> ModelResult<Self> {
        Self::from_json(BUILTIN_CATALOGUE)
    }

    /// Parse a JSON array of entries.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let entries: Vec<Requirement> = serde_json::from_str(json)
            .map_err(|e| ModelError::invalid(format!("requirement catalogue: {}", e)))?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<Requirement>) -> ModelResult<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.id.trim().is_empty() {
                return Err(ModelError::invalid("requirement id cannot be empty"));
            }
            if map.contains_key(&entry.id) {
                return Err(ModelError::invalid(format!(
                    "duplicate requirement id '{}'",
                    entry.id
                )));
            }
            map.insert(entry.id.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.values()
    }

    /// Display name in `locale`, falling back to English, then to the id.
    pub fn display_name<'a>(&'a self, id: &'a str, locale: &str) -> Option<&'a str> {
        let entry = self.entries.get(id)?;
        entry
            .names
            .get(locale)
            .or_else(|| entry.names.get(FALLBACK_LOCALE))
            .map(String::as_str)
            .or(Some(entry.id.as_str()))
    }

    /// Requirements the applicant lacks: `R \ S`.
    ///
    /// Skills outside the catalogue have no effect on the result.
    pub fn excluded<'a, I>(&self, skills: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let held: BTreeSet<&str> = skills.into_iter().collect();
        self.entries
            .keys()
            .filter(|id| !held.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Complete a job's requirement map: unknown ids are rejected, omitted
    /// catalogue ids are set to `false`.
    pub fn normalize(&self, requirements: &mut BTreeMap<String, bool>) -> ModelResult<()> {
        if let Some(unknown) = requirements.keys().find(|id| !self.contains(id)) {
            return Err(ModelError::invalid(format!(
                "unknown requirement '{}'",
                unknown
            )));
        }
        for id in self.entries.keys() {
            requirements.entry(id.clone()).or_insert(false);
        }
        Ok(())
    }

    /// Keep only skills the catalogue knows, returning the rejected ones.
    pub fn partition_skills<I>(&self, skills: I) -> (BTreeSet<String>, Vec<String>)
    where
        I: IntoIterator<Item = String>,
    {
        let mut known = BTreeSet::new();
        let mut unknown = Vec::new();
        for skill in skills {
            if self.contains(&skill) {
                known.insert(skill);
            } else {
                unknown.push(skill);
            }
        }
        (known, unknown)
    }
}
