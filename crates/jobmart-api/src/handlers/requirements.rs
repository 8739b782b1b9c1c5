//! Requirement catalogue handler.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use jobmart_models::requirement::FALLBACK_LOCALE;

use crate::security::normalize_locale;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RequirementsQuery {
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequirementView {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RequirementsResponse {
    pub locale: String,
    pub requirements: Vec<RequirementView>,
}

/// Every requirement a job can demand, named in the requested locale.
pub async fn list_requirements(
    State(state): State<AppState>,
    Query(query): Query<RequirementsQuery>,
) -> Json<RequirementsResponse> {
    let locale = query
        .locale
        .as_deref()
        .map(normalize_locale)
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| FALLBACK_LOCALE.to_string());

    let requirements = state
        .catalogue
        .ids()
        .map(|id| RequirementView {
            id: id.to_string(),
            name: state
                .catalogue
                .display_name(id, &locale)
                .unwrap_or(id)
                .to_string(),
        })
        .collect();

    Json(RequirementsResponse {
        locale,
        requirements,
    })
}
