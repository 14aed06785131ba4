use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::dto::ProfileOut;
use crate::error::AppError;
use crate::ollama;
use crate::store;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Option<ProfileOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Fetch the profile; `profile` is null until one has been saved
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "The profile, or null", body = ProfileResponse))
)]
#[tracing::instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = store::get_profile(&state.db).await?.map(ProfileOut::from);
    Ok(Json(ProfileResponse {
        success: true,
        profile,
        message: None,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveLinkedinPayload {
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Raw page text, or `{ "text": ... }` from the extension.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub page_content: Option<Value>,
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

/// Extract a resume from a LinkedIn profile page via the LLM and upsert the
/// singleton profile
#[utoipa::path(
    post,
    path = "/profile",
    request_body = SaveLinkedinPayload,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Missing or invalid LinkedIn input"),
        (status = 500, description = "LLM failure")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn save_linkedin_profile(
    State(state): State<AppState>,
    Json(payload): Json<SaveLinkedinPayload>,
) -> Result<Json<ProfileResponse>, AppError> {
    let linkedin_url = payload
        .linkedin_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("LinkedIn URL is required".to_string()))?;
    if !linkedin_url.contains("linkedin.com/in/") {
        return Err(AppError::Validation(
            "Invalid LinkedIn profile URL".to_string(),
        ));
    }
    let page_content = payload.page_content.ok_or_else(|| {
        AppError::Validation(
            "Page content is required. Please use the browser extension to extract the LinkedIn profile page.".to_string(),
        )
    })?;

    let model = payload.model.as_deref().unwrap_or(ollama::DEFAULT_MODEL);
    let resume_data = state
        .ollama
        .extract_linkedin_profile(&linkedin_url, &content_text(&page_content), model)
        .await?;

    let saved = store::upsert_profile(&state.db, &linkedin_url, &resume_data).await?;
    Ok(Json(ProfileResponse {
        success: true,
        profile: Some(ProfileOut::from(saved)),
        message: Some("Profile saved successfully".to_string()),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateResumePayload {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub resume_data: Option<Value>,
}

/// Replace the stored resume blob
#[utoipa::path(
    put,
    path = "/profile",
    request_body = UpdateResumePayload,
    responses(
        (status = 200, description = "Resume updated", body = ProfileResponse),
        (status = 400, description = "Missing resume data"),
        (status = 404, description = "No profile yet")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update_resume(
    State(state): State<AppState>,
    Json(payload): Json<UpdateResumePayload>,
) -> Result<Json<ProfileResponse>, AppError> {
    let resume_data = payload
        .resume_data
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::Validation("Resume data is required".to_string()))?;

    let updated = store::update_resume(&state.db, &resume_data)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        profile: Some(ProfileOut::from(updated)),
        message: Some("Resume updated successfully".to_string()),
    }))
}
