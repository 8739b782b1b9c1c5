//! Job listing and job lifecycle handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use jobmart_models::{Job, JobDraft, JobId, JobPage, JobQuery, JobQueryParams};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_document_id;
use crate::services::Role;
use crate::state::AppState;

/// Parse and validate a job id taken from the path.
fn job_id(raw: String) -> ApiResult<JobId> {
    if !is_valid_document_id(&raw) {
        return Err(ApiError::bad_request("Invalid job ID format"));
    }
    Ok(JobId::from_string(raw))
}

/// List active jobs.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobQueryParams>,
) -> ApiResult<Json<JobPage>> {
    let query = JobQuery::from_params(&params)?;
    let page = state.bounded(state.jobs.fetch_page(&query)).await?;
    Ok(Json(page))
}

/// List active jobs the calling applicant is qualified for.
pub async fn eligible_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<JobQueryParams>,
) -> ApiResult<Json<JobPage>> {
    state.accounts.require(&user.uid, Role::Applicant).await?;
    let query = JobQuery::from_params(&params)?;
    let page = state
        .bounded(state.applicants.fetch_eligible_page(&user.uid, &query))
        .await?;
    Ok(Json(page))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let id = job_id(id)?;
    state
        .bounded(state.jobs.fetch_one(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// Post a new job as the calling business.
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<JobDraft>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    state.accounts.require(&user.uid, Role::Business).await?;
    let job = state.bounded(state.jobs.create(draft)).await?;
    info!(uid = %user.uid, job_id = %job.id, "Business posted job");
    Ok((StatusCode::CREATED, Json(job)))
}

/// Overwrite a job's content.
pub async fn replace_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(draft): Json<JobDraft>,
) -> ApiResult<Json<Job>> {
    let id = job_id(id)?;
    state.accounts.require(&user.uid, Role::Business).await?;
    let job = state.bounded(state.jobs.replace(&id, draft)).await?;
    Ok(Json(job))
}

/// Soft-delete a job.
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = job_id(id)?;
    state.accounts.require(&user.uid, Role::Business).await?;
    state.bounded(state.jobs.mark_deleted(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = job_id(id)?;
    state.accounts.require(&user.uid, Role::Business).await?;
    state.bounded(state.jobs.restore(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
