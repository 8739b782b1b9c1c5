//! Result pages for listing queries.

use schemars::JsonSchema;
use serde::Serialize;

use crate::error::{ModelError, ModelResult};
use crate::Job;

/// Inclusive integer interval with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct IntRange {
    min: usize,
    max: usize,
}

impl IntRange {
    /// The `[0, 0]` range of an empty page.
    pub const EMPTY: IntRange = IntRange { min: 0, max: 0 };

    pub fn new(min: usize, max: usize) -> ModelResult<Self> {
        if min > max {
            return Err(ModelError::invalid(format!(
                "range minimum {} exceeds maximum {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// One page of jobs plus coarse count/range metadata.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct JobPage {
    jobs: Vec<Job>,
    total_count: usize,
    range: IntRange,
}

impl JobPage {
    /// Build a page, rejecting metadata that contradicts the jobs it holds.
    pub fn new(jobs: Vec<Job>, total_count: usize, range: IntRange) -> ModelResult<Self> {
        if total_count < jobs.len() {
            return Err(ModelError::invalid(format!(
                "total_count {} is smaller than the {} jobs on the page",
                total_count,
                jobs.len()
            )));
        }
        if range.max() > total_count {
            return Err(ModelError::invalid(format!(
                "range maximum {} exceeds total_count {}",
                range.max(),
                total_count
            )));
        }
        Ok(Self {
            jobs,
            total_count,
            range,
        })
    }

    pub fn empty() -> Self {
        Self {
            jobs: Vec::new(),
            total_count: 0,
            range: IntRange::EMPTY,
        }
    }

    /// Slice a fully materialized, already ordered result set.
    ///
    /// `total_count` is the size of the whole set. The range is the 1-based
    /// position of the returned slice, `[0, 0]` when the slice is empty.
    pub fn paginate(all: Vec<Job>, page_size: u32, page_index: u32) -> Self {
        let total_count = all.len();
        let offset = (page_size as usize).saturating_mul(page_index as usize);

        if offset >= total_count || page_size == 0 {
            return Self {
                jobs: Vec::new(),
                total_count,
                range: IntRange::EMPTY,
            };
        }

        let jobs: Vec<Job> = all
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();
        let range = IntRange {
            min: offset + 1,
            max: offset + jobs.len(),
        };

        Self {
            jobs,
            total_count,
            range,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn range(&self) -> IntRange {
        self.range
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
