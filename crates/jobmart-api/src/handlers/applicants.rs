//! Applicant handlers: profile, skills and the interested list.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use jobmart_models::{ApplicantAccount, JobId, JobPage, Membership, DEFAULT_PAGE_SIZE};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_document_id;
use crate::services::Role;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InterestedPageQuery {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub page_index: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Body of `PUT /applicant/interested/:job_id`.
///
/// `membership` names the desired end state. Older clients send
/// `currently_interested` instead, which names the state being left.
#[derive(Debug, Default, Deserialize)]
pub struct ToggleInterestRequest {
    #[serde(default)]
    pub membership: Option<Membership>,
    #[serde(default)]
    pub currently_interested: Option<bool>,
}

impl ToggleInterestRequest {
    fn membership(&self) -> ApiResult<Membership> {
        match (self.membership, self.currently_interested) {
            (Some(m), _) => Ok(m),
            (None, Some(flag)) => Ok(Membership::from_currently_interested(flag)),
            (None, None) => Err(ApiError::bad_request("membership is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetSkillsRequest {
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub skills: BTreeSet<String>,
}

/// The calling applicant's account.
pub async fn get_applicant(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApplicantAccount>> {
    state
        .bounded(state.applicants.get(&user.uid))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::forbidden("An applicant account is required"))
}

/// One page of the jobs the caller marked as interesting.
pub async fn get_interested(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InterestedPageQuery>,
) -> ApiResult<Json<JobPage>> {
    state.accounts.require(&user.uid, Role::Applicant).await?;
    let page = state
        .bounded(state.applicants.fetch_interested_page(
            &user.uid,
            query.page_size,
            query.page_index,
        ))
        .await?;
    Ok(Json(page))
}

/// Add a job to, or remove it from, the caller's interested list.
pub async fn toggle_interest(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
    Json(request): Json<ToggleInterestRequest>,
) -> ApiResult<StatusCode> {
    if !is_valid_document_id(&job_id) {
        return Err(ApiError::bad_request("Invalid job ID format"));
    }
    let membership = request.membership()?;
    state.accounts.require(&user.uid, Role::Applicant).await?;

    state
        .bounded(state.applicants.toggle_interest(
            &user.uid,
            &JobId::from_string(job_id),
            membership,
        ))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the caller's skill set.
pub async fn set_skills(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SetSkillsRequest>,
) -> ApiResult<Json<SkillsResponse>> {
    state.accounts.require(&user.uid, Role::Applicant).await?;
    let skills = state
        .bounded(state.applicants.set_skills(&user.uid, request.skills))
        .await?;
    Ok(Json(SkillsResponse { skills }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_request_membership() {
        let parse = |json: &str| {
            serde_json::from_str::<ToggleInterestRequest>(json)
                .unwrap()
                .membership()
        };

        assert_eq!(
            parse(r#"{"membership": "not_interested"}"#).unwrap(),
            Membership::NotInterested
        );
        assert_eq!(
            parse(r#"{"currently_interested": false}"#).unwrap(),
            Membership::Interested
        );
        assert_eq!(
            parse(r#"{"membership": "interested", "currently_interested": true}"#).unwrap(),
            Membership::Interested
        );
        assert!(matches!(parse("{}"), Err(ApiError::BadRequest(_))));
    }
}
