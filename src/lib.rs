use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::env;
use std::path::PathBuf;
// Conditionally import SwaggerUi only when needed (not test)
#[cfg(not(test))]
use utoipa_swagger_ui::SwaggerUi;
// Conditionally import CORS only when needed (not test)
#[cfg(not(test))]
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;

pub mod db;
pub mod dedupe;
pub mod dto;
pub mod entities;
pub mod error;
pub mod fields;
pub mod ollama;
pub mod routes;
pub mod store;
pub mod upsert;
pub mod urlnorm;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub ollama: ollama::OllamaClient,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: DatabaseConnection, ollama: ollama::OllamaClient) -> Self {
        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public/uploads"));
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        Self {
            db,
            ollama,
            uploads_dir,
            max_upload_bytes,
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "JobTrail API",
        version = "0.1.0",
        description = "Personal job-search tracker: jobs, applications, communications, interviews and LLM extraction"
    ),
    paths(
        health_check,
        routes::jobs::list_jobs,
        routes::jobs::save_job,
        routes::jobs::find_by_url,
        routes::jobs::get_job,
        routes::jobs::update_job,
        routes::jobs::delete_job,
        routes::jobs::update_tags,
        routes::jobs::accept_job,
        routes::jobs::clear_accept,
        routes::jobs::reject_job,
        routes::jobs::clear_reject,
        routes::applications::create_application,
        routes::applications::get_application_for_job,
        routes::applications::get_application,
        routes::applications::update_application,
        routes::applications::delete_application,
        routes::communications::list_communications,
        routes::communications::create_communication,
        routes::communications::update_communication,
        routes::communications::delete_communication,
        routes::interviews::list_interviews,
        routes::interviews::create_interview,
        routes::interviews::get_interview,
        routes::interviews::update_interview,
        routes::interviews::delete_interview,
        routes::interviews::upload_recording,
        routes::extract::extract_job,
        routes::extract::extract_email,
        routes::extract::list_models,
        routes::profile::get_profile,
        routes::profile::save_linkedin_profile,
        routes::profile::update_resume
    ),
    components(schemas(
        dto::JobPayload,
        dto::JobOut,
        dto::ApplicationOut,
        dto::CommunicationOut,
        dto::InterviewOut,
        dto::ProfileOut,
        routes::jobs::JobListResponse,
        routes::jobs::JobResponse,
        routes::jobs::SaveJobResponse,
        routes::jobs::JobByUrlResponse,
        routes::jobs::DeletedResponse,
        routes::jobs::TagsPayload,
        routes::applications::CreateApplicationPayload,
        routes::applications::UpdateApplicationPayload,
        routes::applications::ApplicationResponse,
        routes::applications::ApplicationDeletedResponse,
        routes::communications::CreateCommunicationPayload,
        routes::communications::UpdateCommunicationPayload,
        routes::communications::CommunicationListResponse,
        routes::communications::CommunicationResponse,
        routes::communications::CommunicationDeletedResponse,
        routes::interviews::CreateInterviewPayload,
        routes::interviews::UpdateInterviewPayload,
        routes::interviews::InterviewListResponse,
        routes::interviews::InterviewResponse,
        routes::interviews::InterviewDeletedResponse,
        routes::extract::ExtractJobPayload,
        routes::extract::ExtractEmailPayload,
        routes::extract::ExtractEmailResponse,
        routes::profile::ProfileResponse,
        routes::profile::SaveLinkedinPayload,
        routes::profile::UpdateResumePayload
    ))
)]
struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let api_doc = ApiDoc::openapi();

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/jobs", get(routes::jobs::list_jobs).post(routes::jobs::save_job))
        // Static segment, must not be swallowed by /jobs/{id}.
        .route("/jobs/by-url", get(routes::jobs::find_by_url))
        .route(
            "/jobs/{id}",
            get(routes::jobs::get_job)
                .put(routes::jobs::update_job)
                .delete(routes::jobs::delete_job),
        )
        .route("/jobs/{id}/tags", put(routes::jobs::update_tags))
        .route(
            "/jobs/{id}/accept",
            post(routes::jobs::accept_job).delete(routes::jobs::clear_accept),
        )
        .route(
            "/jobs/{id}/reject",
            post(routes::jobs::reject_job).delete(routes::jobs::clear_reject),
        )
        .route(
            "/jobs/{id}/interviews",
            get(routes::interviews::list_interviews).post(routes::interviews::create_interview),
        )
        .route("/applications", post(routes::applications::create_application))
        .route(
            "/applications/job/{job_id}",
            get(routes::applications::get_application_for_job),
        )
        .route(
            "/applications/{id}",
            get(routes::applications::get_application)
                .put(routes::applications::update_application)
                .delete(routes::applications::delete_application),
        )
        .route(
            "/communications",
            get(routes::communications::list_communications)
                .post(routes::communications::create_communication),
        )
        .route(
            "/communications/{id}",
            put(routes::communications::update_communication)
                .delete(routes::communications::delete_communication),
        )
        .route(
            "/interviews/{id}",
            get(routes::interviews::get_interview)
                .put(routes::interviews::update_interview)
                .delete(routes::interviews::delete_interview),
        )
        .route(
            "/interviews/{id}/upload",
            post(routes::interviews::upload_recording)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/extract/job", post(routes::extract::extract_job))
        .route("/extract/email", post(routes::extract::extract_email))
        .route("/extract/models", get(routes::extract::list_models))
        .route(
            "/profile",
            get(routes::profile::get_profile)
                .post(routes::profile::save_linkedin_profile)
                .put(routes::profile::update_resume),
        )
        .nest_service("/uploads", ServeDir::new(&state.uploads_dir))
        .with_state(state);

    // Swagger UI only outside test builds, like the rest of the outer layers
    #[cfg(not(test))]
    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc);
    #[cfg(test)]
    let docs_router = {
        let _ = api_doc;
        Router::new()
    };

    #[allow(unused_mut)]
    let mut app = Router::new().merge(api_routes).merge(docs_router);

    // The extension and local frontend call from arbitrary origins.
    #[cfg(not(test))]
    {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app
}
