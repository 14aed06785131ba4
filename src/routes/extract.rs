//! LLM-backed extraction endpoints. These are the only handlers that talk to
//! Ollama; everything downstream of the extraction reuses the same upsert
//! and store paths as the plain CRUD surface.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{CommunicationOut, JobOut, JobPayload};
use crate::entities::communication;
use crate::error::AppError;
use crate::ollama;
use crate::store::{self, parse_datetime};
use crate::upsert;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractJobPayload {
    /// Raw page text, or `{ "text": ..., "html": ... }` from the extension.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub content: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

fn content_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("html"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Extract a job posting from page content and save it through the
/// duplicate-aware upsert. If the save fails the extraction is still
/// returned, flagged with `saved: false`
#[utoipa::path(
    post,
    path = "/extract/job",
    request_body = ExtractJobPayload,
    responses(
        (status = 200, description = "Extraction result, saved or not"),
        (status = 400, description = "Missing content, url or title"),
        (status = 500, description = "LLM failure")
    )
)]
#[tracing::instrument(skip(state, payload), fields(url = ?payload.url))]
pub async fn extract_job(
    State(state): State<AppState>,
    Json(payload): Json<ExtractJobPayload>,
) -> Result<Json<Value>, AppError> {
    let content = payload
        .content
        .ok_or_else(|| AppError::Validation("Content is required".to_string()))?;
    let url = payload
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("URL is required".to_string()))?;
    let title = payload
        .title
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;
    let model = payload.model.as_deref().unwrap_or(ollama::DEFAULT_MODEL);

    let mut job_info = state
        .ollama
        .extract_job_info(&content_text(&content), &url, &title, model)
        .await?;

    if let Value::Object(map) = &mut job_info {
        map.insert("sourceUrl".to_string(), Value::String(url));
        map.insert(
            "extractedAt".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }

    let job_payload: JobPayload = serde_json::from_value(job_info.clone())
        .map_err(|e| AppError::LlmInvalidJson(e.to_string()))?;

    match upsert::save_job(&state.db, job_payload).await {
        Ok(outcome) => {
            let job_id = outcome.job.id.clone();
            let saved = store::get_job_with_children(&state.db, &job_id)
                .await?
                .map(JobOut::from);
            Ok(Json(json!({
                "success": true,
                "jobInfo": saved,
                "saved": true,
                "updated": !outcome.created,
                "jobId": job_id,
            })))
        }
        Err(save_error) => {
            tracing::error!("extracted job could not be saved: {}", save_error);
            // Partial failure: hand the extraction back instead of losing it.
            Ok(Json(json!({
                "success": true,
                "jobInfo": job_info,
                "saved": false,
                "error": format!("Extracted successfully but failed to save: {}", save_error),
            })))
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractEmailPayload {
    #[serde(rename = "emailContent", default)]
    #[schema(value_type = Option<Object>)]
    pub email_content: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractEmailResponse {
    pub success: bool,
    pub communication: CommunicationOut,
    #[schema(value_type = Object)]
    pub extracted: Value,
}

/// Parse a captured email via the LLM and store it as an unassigned
/// communication
#[utoipa::path(
    post,
    path = "/extract/email",
    request_body = ExtractEmailPayload,
    responses(
        (status = 200, description = "Stored communication", body = ExtractEmailResponse),
        (status = 400, description = "Missing email content"),
        (status = 500, description = "LLM failure")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn extract_email(
    State(state): State<AppState>,
    Json(payload): Json<ExtractEmailPayload>,
) -> Result<Json<ExtractEmailResponse>, AppError> {
    let raw_content = payload
        .email_content
        .as_ref()
        .map(content_text)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Email content is required".to_string()))?;
    let model = payload.model.as_deref().unwrap_or(ollama::DEFAULT_MODEL);

    let extracted = state.ollama.extract_email_info(&raw_content, model).await?;

    let field = |key: &str| -> Option<String> {
        extracted
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let now = Utc::now();
    let created = communication::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        // Assigned to a job manually later.
        job_id: Set(None),
        subject: Set(field("subject")),
        from: Set(field("from")),
        to: Set(field("to")),
        body: Set(field("body").unwrap_or(raw_content)),
        body_text: Set(field("body_text")),
        received_at: Set(field("received_at")
            .as_deref()
            .and_then(parse_datetime)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(ExtractEmailResponse {
        success: true,
        communication: CommunicationOut::from(created),
        extracted,
    }))
}

/// Installed Ollama models
#[utoipa::path(
    get,
    path = "/extract/models",
    responses(
        (status = 200, description = "Model list"),
        (status = 500, description = "Ollama unreachable")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let models = state.ollama.list_models().await?;
    Ok(Json(json!({
        "success": true,
        "models": models,
    })))
}
