use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{double_option, CommunicationOut};
use crate::entities::{communication, Communication};
use crate::error::AppError;
use crate::store::{self, parse_datetime};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CommunicationListResponse {
    pub success: bool,
    pub communications: Vec<CommunicationOut>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommunicationResponse {
    pub success: bool,
    pub communication: CommunicationOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

/// List communications, newest received first, optionally for one job
#[utoipa::path(
    get,
    path = "/communications",
    params(("jobId" = Option<String>, Query, description = "Restrict to one job")),
    responses((status = 200, description = "Communications", body = CommunicationListResponse))
)]
#[tracing::instrument(skip(state, query))]
pub async fn list_communications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<CommunicationListResponse>, AppError> {
    let communications: Vec<CommunicationOut> =
        store::list_communications(&state.db, query.job_id.as_deref())
            .await?
            .into_iter()
            .map(CommunicationOut::from)
            .collect();
    let count = communications.len();
    Ok(Json(CommunicationListResponse {
        success: true,
        communications,
        count,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommunicationPayload {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub received_at: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Record a communication, optionally already linked to a job
#[utoipa::path(
    post,
    path = "/communications",
    request_body = CreateCommunicationPayload,
    responses((status = 200, description = "Created communication", body = CommunicationResponse))
)]
#[tracing::instrument(skip(state, payload))]
pub async fn create_communication(
    State(state): State<AppState>,
    Json(payload): Json<CreateCommunicationPayload>,
) -> Result<Json<CommunicationResponse>, AppError> {
    let now = Utc::now();
    let created = communication::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        job_id: Set(payload.job_id),
        subject: Set(payload.subject),
        from: Set(payload.from),
        to: Set(payload.to),
        body: Set(payload.body.unwrap_or_default()),
        body_text: Set(payload.body_text),
        received_at: Set(payload.received_at.as_deref().and_then(parse_datetime)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(CommunicationResponse {
        success: true,
        communication: CommunicationOut::from(created),
        message: None,
    }))
}

/// Partial update. Absent fields stay untouched; an explicit null clears,
/// which is how a communication is unassigned from a job.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCommunicationPayload {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub subject: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub from: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub to: Option<Option<String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub body_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub received_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub job_id: Option<Option<String>>,
}

/// Edit a communication or (re)assign it to a job
#[utoipa::path(
    put,
    path = "/communications/{id}",
    request_body = UpdateCommunicationPayload,
    responses(
        (status = 200, description = "Updated communication", body = CommunicationResponse),
        (status = 404, description = "No such communication")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update_communication(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCommunicationPayload>,
) -> Result<Json<CommunicationResponse>, AppError> {
    let existing = Communication::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Communication".to_string()))?;

    let mut active: communication::ActiveModel = existing.into();
    if let Some(subject) = payload.subject {
        active.subject = Set(subject);
    }
    if let Some(from) = payload.from {
        active.from = Set(from);
    }
    if let Some(to) = payload.to {
        active.to = Set(to);
    }
    if let Some(body) = payload.body {
        active.body = Set(body);
    }
    if let Some(body_text) = payload.body_text {
        active.body_text = Set(body_text);
    }
    if let Some(received_at) = payload.received_at {
        active.received_at = Set(received_at.as_deref().and_then(parse_datetime));
    }
    if let Some(job_id) = payload.job_id {
        active.job_id = Set(job_id);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(CommunicationResponse {
        success: true,
        communication: CommunicationOut::from(updated),
        message: Some("Communication updated successfully".to_string()),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommunicationDeletedResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a communication
#[utoipa::path(
    delete,
    path = "/communications/{id}",
    responses(
        (status = 200, description = "Deleted", body = CommunicationDeletedResponse),
        (status = 404, description = "No such communication")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_communication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommunicationDeletedResponse>, AppError> {
    let result = Communication::delete_by_id(&id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Communication".to_string()));
    }
    Ok(Json(CommunicationDeletedResponse {
        success: true,
        message: "Communication deleted successfully".to_string(),
    }))
}
