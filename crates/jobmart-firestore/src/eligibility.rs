//! Eligibility predicates.
//!
//! A job is eligible for an applicant when it demands no requirement the
//! applicant lacks. With catalogue `R` and skills `S`, every id in `R \ S`
//! becomes `requirements.<id> == false`; the conjunction is evaluated by the
//! store, so building it costs `O(|R|)` regardless of how many jobs exist.

use std::collections::BTreeSet;

use jobmart_models::{JobStatus, RequirementCatalogue};

use crate::field_path;
use crate::job_repo::fields::{REQUIREMENTS, STATUS};
use crate::types::{FieldOp, Filter, ToFirestoreValue};

/// Store predicates selecting active jobs that demand none of `excluded`.
pub fn eligibility_filters(excluded: &BTreeSet<String>) -> Vec<Filter> {
    let mut filters = Vec::with_capacity(excluded.len() + 1);
    filters.push(active_filter());
    filters.extend(excluded.iter().map(|id| {
        Filter::field(
            field_path::join([REQUIREMENTS, id.as_str()]),
            FieldOp::Equal,
            false.to_firestore_value(),
        )
    }));
    filters
}

/// `R \ S` followed by [`eligibility_filters`].
pub fn filters_for_skills<'a, I>(catalogue: &RequirementCatalogue, skills: I) -> Vec<Filter>
where
    I: IntoIterator<Item = &'a str>,
{
    eligibility_filters(&catalogue.excluded(skills))
}

pub(crate) fn active_filter() -> Filter {
    Filter::field(
        STATUS,
        FieldOp::Equal,
        JobStatus::Active.as_str().to_firestore_value(),
    )
}
