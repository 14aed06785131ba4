use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::ApplicationOut;
use crate::entities::{application, Application};
use crate::error::AppError;
use crate::store::{self, parse_datetime};
use crate::AppState;

/// The canonical application lifecycle. Storage keeps the plain string so
/// rows written by older versions still load; this enum gates what the API
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Started,
    Submitted,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Started => "started",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Accepted => "accepted",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "started" => Ok(ApplicationStatus::Started),
            "submitted" => Ok(ApplicationStatus::Submitted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "accepted" => Ok(ApplicationStatus::Accepted),
            other => Err(AppError::Validation(format!(
                "Invalid application status '{}'. Expected one of: started, submitted, rejected, accepted",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationResponse {
    pub success: bool,
    pub application: ApplicationOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationDeletedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationPayload {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Start an application for a job. A job can have at most one; attempting a
/// second returns 400 with the existing record attached
#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 200, description = "Application started", body = ApplicationResponse),
        (status = 400, description = "Missing job_id or application already exists"),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn create_application(
    State(state): State<AppState>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let job_id = payload
        .job_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;

    let status = match payload.status.as_deref() {
        Some(raw) => ApplicationStatus::from_str(raw)?,
        None => ApplicationStatus::Started,
    };

    if store::get_job(&state.db, &job_id).await?.is_none() {
        return Err(AppError::NotFound("Job".to_string()));
    }

    if let Some(existing) = store::application_for_job(&state.db, &job_id).await? {
        let attached = serde_json::to_value(ApplicationOut::from(existing))
            .map_err(|e| AppError::Internal(e.to_string()))?;
        return Err(AppError::Conflict {
            message: "Application already exists for this job".to_string(),
            application: attached,
        });
    }

    let now = Utc::now();
    let created = application::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        job_id: Set(job_id),
        status: Set(status.as_str().to_string()),
        started_at: Set(now),
        submitted_at: Set(None),
        notes: Set(payload.notes),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(ApplicationResponse {
        success: true,
        application: ApplicationOut::from(created),
        message: Some("Application started successfully".to_string()),
    }))
}

/// Fetch the application belonging to a job
#[utoipa::path(
    get,
    path = "/applications/job/{job_id}",
    responses(
        (status = 200, description = "The application", body = ApplicationResponse),
        (status = 404, description = "No application for this job")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_application_for_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let application = store::application_for_job(&state.db, &job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application".to_string()))?;
    Ok(Json(ApplicationResponse {
        success: true,
        application: ApplicationOut::from(application),
        message: None,
    }))
}

/// Fetch an application by id
#[utoipa::path(
    get,
    path = "/applications/{id}",
    responses(
        (status = 200, description = "The application", body = ApplicationResponse),
        (status = 404, description = "No such application")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let application = Application::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Application".to_string()))?;
    Ok(Json(ApplicationResponse {
        success: true,
        application: ApplicationOut::from(application),
        message: None,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateApplicationPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Update an application's status, submission timestamp and notes
#[utoipa::path(
    put,
    path = "/applications/{id}",
    request_body = UpdateApplicationPayload,
    responses(
        (status = 200, description = "Updated application", body = ApplicationResponse),
        (status = 404, description = "No such application")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateApplicationPayload>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let existing = Application::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Application".to_string()))?;

    let mut active: application::ActiveModel = existing.into();
    if let Some(raw) = payload.status.as_deref() {
        let status = ApplicationStatus::from_str(raw)?;
        active.status = Set(status.as_str().to_string());
    }
    active.submitted_at = Set(payload.submitted_at.as_deref().and_then(parse_datetime));
    active.notes = Set(payload.notes);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(ApplicationResponse {
        success: true,
        application: ApplicationOut::from(updated),
        message: Some("Application updated successfully".to_string()),
    }))
}

/// Delete an application without touching its job
#[utoipa::path(
    delete,
    path = "/applications/{id}",
    responses(
        (status = 200, description = "Deleted", body = ApplicationDeletedResponse),
        (status = 404, description = "No such application")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationDeletedResponse>, AppError> {
    let result = Application::delete_by_id(&id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Application".to_string()));
    }
    Ok(Json(ApplicationDeletedResponse {
        success: true,
        message: "Application deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_statuses_parse() {
        for (raw, expected) in [
            ("started", ApplicationStatus::Started),
            ("submitted", ApplicationStatus::Submitted),
            ("rejected", ApplicationStatus::Rejected),
            ("accepted", ApplicationStatus::Accepted),
        ] {
            assert_eq!(ApplicationStatus::from_str(raw).unwrap(), expected);
            assert_eq!(ApplicationStatus::from_str(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(ApplicationStatus::from_str("ghosted").is_err());
        assert!(ApplicationStatus::from_str("Started").is_err());
    }
}
