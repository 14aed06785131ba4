use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::dedupe;
use crate::dto::{JobOut, JobPayload};
use crate::entities::job;
use crate::error::AppError;
use crate::fields;
use crate::store;
use crate::upsert;
use crate::urlnorm;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobListResponse {
    pub success: bool,
    pub jobs: Vec<JobOut>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub success: bool,
    pub job: JobOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveJobResponse {
    pub success: bool,
    pub job: JobOut,
    pub message: String,
    pub created: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobByUrlResponse {
    pub success: bool,
    pub job: Option<JobOut>,
    #[serde(rename = "hasApplication")]
    pub has_application: bool,
    #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

async fn full_job(state: &AppState, id: &str) -> Result<JobOut, AppError> {
    store::get_job_with_children(&state.db, id)
        .await?
        .map(JobOut::from)
        .ok_or_else(|| AppError::NotFound("Job".to_string()))
}

/// List all jobs, newest saved first, with children attached
#[utoipa::path(
    get,
    path = "/jobs",
    responses((status = 200, description = "All jobs", body = JobListResponse))
)]
#[tracing::instrument(skip(state))]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<JobListResponse>, AppError> {
    let jobs: Vec<JobOut> = store::list_jobs_with_children(&state.db)
        .await?
        .into_iter()
        .map(JobOut::from)
        .collect();
    let count = jobs.len();
    Ok(Json(JobListResponse {
        success: true,
        jobs,
        count,
    }))
}

/// Save a job: create it, or refresh the stored row whose source URL
/// duplicates the incoming one
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = JobPayload,
    responses((status = 200, description = "Job saved or updated", body = SaveJobResponse))
)]
#[tracing::instrument(skip(state, payload), fields(source_url = ?payload.source_url))]
pub async fn save_job(
    State(state): State<AppState>,
    Json(payload): Json<JobPayload>,
) -> Result<Json<SaveJobResponse>, AppError> {
    let outcome = upsert::save_job(&state.db, payload).await?;
    let message = if outcome.created {
        "Job saved successfully"
    } else {
        "Job updated (duplicate prevented)"
    };
    tracing::info!(job_id = %outcome.job.id, created = outcome.created, "job saved");

    let job = full_job(&state, &outcome.job.id).await?;
    Ok(Json(SaveJobResponse {
        success: true,
        job,
        message: message.to_string(),
        created: outcome.created,
    }))
}

/// Fetch one job with its children
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    responses(
        (status = 200, description = "The job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let job = full_job(&state, &id).await?;
    Ok(Json(JobResponse {
        success: true,
        job,
        message: None,
    }))
}

/// Full update of a job by id; missing title/company fall back to the
/// sentinel strings
#[utoipa::path(
    put,
    path = "/jobs/{id}",
    request_body = JobPayload,
    responses(
        (status = 200, description = "Updated job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<JobPayload>,
) -> Result<Json<JobResponse>, AppError> {
    let existing = store::get_job(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

    let prepared = fields::prepare(
        payload.location.as_ref(),
        payload.requirements.as_ref(),
        payload.tags.as_ref(),
    );
    let now = Utc::now();

    let mut active: job::ActiveModel = existing.into();
    active.title = Set(payload
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Title Not Found".to_string()));
    active.company = Set(payload
        .company
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "Company Not Found".to_string()));
    active.location = Set(prepared.location);
    active.description = Set(payload.description);
    active.salary_lower_bound = Set(payload.salary_lower_bound);
    active.salary_upper_bound = Set(payload.salary_upper_bound);
    active.salary_currency = Set(payload.salary_currency);
    active.requirements = Set(prepared.requirements);
    active.application_url = Set(payload.application_url);
    active.normalized_source_url = Set(urlnorm::normalize(payload.source_url.as_deref()));
    active.source_url = Set(payload.source_url);
    active.posted_date = Set(payload.posted_date);
    active.extracted_at = Set(Some(now));
    active.excluded = Set(payload.excluded == Some(true));
    active.tags = Set(prepared.tags);
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    let job = full_job(&state, &id).await?;
    Ok(Json(JobResponse {
        success: true,
        job,
        message: Some("Job updated successfully".to_string()),
    }))
}

/// Delete a job; applications and interview rounds go with it,
/// communications are detached
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    if !store::delete_job(&state.db, &id).await? {
        return Err(AppError::NotFound("Job".to_string()));
    }
    Ok(Json(DeletedResponse {
        success: true,
        message: "Job deleted successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TagsPayload {
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub tags: Option<Value>,
}

/// Replace a job's tag list
#[utoipa::path(
    put,
    path = "/jobs/{id}/tags",
    request_body = TagsPayload,
    responses(
        (status = 200, description = "Updated job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TagsPayload>,
) -> Result<Json<JobResponse>, AppError> {
    let existing = store::get_job(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

    let tags = payload.tags.unwrap_or_else(|| Value::Array(Vec::new()));
    let mut active: job::ActiveModel = existing.into();
    active.tags = Set(Some(tags.to_string()));
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    let job = full_job(&state, &id).await?;
    Ok(Json(JobResponse {
        success: true,
        job,
        message: Some("Tags updated successfully".to_string()),
    }))
}

enum Decision {
    Accept,
    Reject,
}

/// Set or clear the accepted/rejected timestamps. Setting one side always
/// clears the other; clearing only touches its own side.
async fn apply_decision(
    state: &AppState,
    id: &str,
    decision: Decision,
    set: bool,
) -> Result<Json<JobResponse>, AppError> {
    let existing = store::get_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

    let now = Utc::now();
    let mut active: job::ActiveModel = existing.into();
    match (&decision, set) {
        (Decision::Accept, true) => {
            active.accepted_at = Set(Some(now));
            active.rejected_at = Set(None);
        }
        (Decision::Accept, false) => active.accepted_at = Set(None),
        (Decision::Reject, true) => {
            active.rejected_at = Set(Some(now));
            active.accepted_at = Set(None);
        }
        (Decision::Reject, false) => active.rejected_at = Set(None),
    }
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    let message = match (decision, set) {
        (Decision::Accept, true) => "Job marked as accepted",
        (Decision::Accept, false) => "Accepted status cleared",
        (Decision::Reject, true) => "Job marked as rejected",
        (Decision::Reject, false) => "Rejected status cleared",
    };

    let job = full_job(state, id).await?;
    Ok(Json(JobResponse {
        success: true,
        job,
        message: Some(message.to_string()),
    }))
}

/// Mark a job accepted (clears any rejection)
#[utoipa::path(
    post,
    path = "/jobs/{id}/accept",
    responses(
        (status = 200, description = "Updated job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn accept_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    apply_decision(&state, &id, Decision::Accept, true).await
}

/// Clear the accepted timestamp
#[utoipa::path(
    delete,
    path = "/jobs/{id}/accept",
    responses(
        (status = 200, description = "Updated job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn clear_accept(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    apply_decision(&state, &id, Decision::Accept, false).await
}

/// Mark a job rejected (clears any acceptance)
#[utoipa::path(
    post,
    path = "/jobs/{id}/reject",
    responses(
        (status = 200, description = "Updated job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn reject_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    apply_decision(&state, &id, Decision::Reject, true).await
}

/// Clear the rejected timestamp
#[utoipa::path(
    delete,
    path = "/jobs/{id}/reject",
    responses(
        (status = 200, description = "Updated job", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn clear_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    apply_decision(&state, &id, Decision::Reject, false).await
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ByUrlQuery {
    pub url: Option<String>,
}

/// Duplicate-aware lookup by source URL; reports whether the matching job
/// already has an application
#[utoipa::path(
    get,
    path = "/jobs/by-url",
    params(("url" = Option<String>, Query, description = "Source URL to look up")),
    responses(
        (status = 200, description = "Match result", body = JobByUrlResponse),
        (status = 400, description = "Missing url parameter")
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn find_by_url(
    State(state): State<AppState>,
    Query(query): Query<ByUrlQuery>,
) -> Result<Json<JobByUrlResponse>, AppError> {
    let url = query
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("URL parameter is required".to_string()))?;

    if urlnorm::normalize(Some(&url)).is_none() {
        return Ok(Json(JobByUrlResponse {
            success: true,
            job: None,
            has_application: false,
            job_id: None,
        }));
    }

    let candidates = store::jobs_with_source_url(&state.db).await?;
    let Some(matching) = dedupe::find_duplicate(Some(&url), &candidates) else {
        return Ok(Json(JobByUrlResponse {
            success: true,
            job: None,
            has_application: false,
            job_id: None,
        }));
    };
    let job_id = matching.id.clone();

    let has_application = store::application_for_job(&state.db, &job_id)
        .await?
        .is_some();
    let job = full_job(&state, &job_id).await?;

    Ok(Json(JobByUrlResponse {
        success: true,
        job: Some(job),
        has_application,
        job_id: Some(job_id),
    }))
}
