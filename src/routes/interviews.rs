use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{double_option, InterviewOut};
use crate::entities::{interview_round, InterviewRound};
use crate::error::AppError;
use crate::store::{self, parse_datetime};
use crate::AppState;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9.-]").unwrap());

#[derive(Debug, Serialize, ToSchema)]
pub struct InterviewListResponse {
    pub success: bool,
    pub interviews: Vec<InterviewOut>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InterviewResponse {
    pub success: bool,
    pub interview: InterviewOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// List a job's interview rounds, ordered by round then newest schedule
#[utoipa::path(
    get,
    path = "/jobs/{id}/interviews",
    responses((status = 200, description = "Interview rounds", body = InterviewListResponse))
)]
#[tracing::instrument(skip(state))]
pub async fn list_interviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InterviewListResponse>, AppError> {
    let interviews = store::interviews_for_job(&state.db, &id)
        .await?
        .into_iter()
        .map(InterviewOut::from)
        .collect();
    Ok(Json(InterviewListResponse {
        success: true,
        interviews,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInterviewPayload {
    #[serde(default)]
    pub round_number: Option<i32>,
    #[serde(default)]
    pub interviewer_name: Option<String>,
    #[serde(default)]
    pub interviewer_email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Create an interview round; the round number defaults to max + 1 per job
#[utoipa::path(
    post,
    path = "/jobs/{id}/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 200, description = "Created round", body = InterviewResponse),
        (status = 404, description = "No such job")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn create_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<Json<InterviewResponse>, AppError> {
    if store::get_job(&state.db, &id).await?.is_none() {
        return Err(AppError::NotFound("Job".to_string()));
    }

    let round_number = match payload.round_number {
        Some(n) if n > 0 => n,
        _ => store::next_round_number(&state.db, &id).await?,
    };

    let now = Utc::now();
    let created = interview_round::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        job_id: Set(id),
        round_number: Set(round_number),
        interviewer_name: Set(payload.interviewer_name),
        interviewer_email: Set(payload.interviewer_email),
        notes: Set(payload.notes),
        recording_url: Set(payload.recording_url),
        scheduled_at: Set(payload.scheduled_at.as_deref().and_then(parse_datetime)),
        completed_at: Set(payload.completed_at.as_deref().and_then(parse_datetime)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(InterviewResponse {
        success: true,
        interview: InterviewOut::from(created),
        message: None,
    }))
}

/// Fetch one interview round
#[utoipa::path(
    get,
    path = "/interviews/{id}",
    responses(
        (status = 200, description = "The round", body = InterviewResponse),
        (status = 404, description = "No such interview round")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InterviewResponse>, AppError> {
    let interview = InterviewRound::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Interview round".to_string()))?;
    Ok(Json(InterviewResponse {
        success: true,
        interview: InterviewOut::from(interview),
        message: None,
    }))
}

/// Partial update; absent fields stay untouched, explicit nulls clear.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateInterviewPayload {
    #[serde(default)]
    pub round_number: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub interviewer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub interviewer_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub recording_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub scheduled_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub completed_at: Option<Option<String>>,
}

/// Update an interview round
#[utoipa::path(
    put,
    path = "/interviews/{id}",
    request_body = UpdateInterviewPayload,
    responses(
        (status = 200, description = "Updated round", body = InterviewResponse),
        (status = 404, description = "No such interview round")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<Json<InterviewResponse>, AppError> {
    let existing = InterviewRound::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Interview round".to_string()))?;

    let mut active: interview_round::ActiveModel = existing.into();
    if let Some(round_number) = payload.round_number {
        active.round_number = Set(round_number);
    }
    if let Some(name) = payload.interviewer_name {
        active.interviewer_name = Set(name);
    }
    if let Some(email) = payload.interviewer_email {
        active.interviewer_email = Set(email);
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(notes);
    }
    if let Some(recording_url) = payload.recording_url {
        active.recording_url = Set(recording_url);
    }
    if let Some(scheduled_at) = payload.scheduled_at {
        active.scheduled_at = Set(scheduled_at.as_deref().and_then(parse_datetime));
    }
    if let Some(completed_at) = payload.completed_at {
        active.completed_at = Set(completed_at.as_deref().and_then(parse_datetime));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(InterviewResponse {
        success: true,
        interview: InterviewOut::from(updated),
        message: None,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InterviewDeletedResponse {
    pub success: bool,
    pub message: String,
}

/// Delete an interview round
#[utoipa::path(
    delete,
    path = "/interviews/{id}",
    responses(
        (status = 200, description = "Deleted", body = InterviewDeletedResponse),
        (status = 404, description = "No such interview round")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InterviewDeletedResponse>, AppError> {
    let result = InterviewRound::delete_by_id(&id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Interview round".to_string()));
    }
    Ok(Json(InterviewDeletedResponse {
        success: true,
        message: "Interview round deleted successfully".to_string(),
    }))
}

/// Upload a recording for an interview round. The whole file is buffered,
/// bounded by the body limit configured on this route, then written in one go
/// and the round's `recording_url` is pointed at the served path.
#[utoipa::path(
    post,
    path = "/interviews/{id}/upload",
    responses(
        (status = 200, description = "File stored and recording_url set"),
        (status = 400, description = "No file provided"),
        (status = 404, description = "No such interview round")
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() == Some("recording") {
            let name = field.file_name().unwrap_or("recording").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()))?;
            file = Some((name, data.to_vec()));
            break;
        }
    }
    let (original_name, data) =
        file.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let interview = InterviewRound::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Interview round".to_string()))?;

    let sanitized = UNSAFE_FILENAME_CHARS.replace_all(&original_name, "_");
    let filename = format!("{}-{}-{}", id, Utc::now().timestamp_millis(), sanitized);

    let recordings_dir = state.uploads_dir.join("recordings");
    tokio::fs::create_dir_all(&recordings_dir)
        .await
        .map_err(|e| AppError::Internal(format!("could not create uploads dir: {}", e)))?;
    tokio::fs::write(recordings_dir.join(&filename), &data)
        .await
        .map_err(|e| AppError::Internal(format!("could not store recording: {}", e)))?;

    let recording_url = format!("/uploads/recordings/{}", filename);
    let mut active: interview_round::ActiveModel = interview.into();
    active.recording_url = Set(Some(recording_url.clone()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    tracing::info!(interview_id = %updated.id, bytes = data.len(), "stored interview recording");

    Ok(Json(json!({
        "success": true,
        "recording_url": recording_url,
        "interview": {
            "id": updated.id,
            "recording_url": updated.recording_url,
        },
    })))
}
