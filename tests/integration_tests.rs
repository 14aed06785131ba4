use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jobtrail::dto::JobPayload;
use jobtrail::entities::job;
use jobtrail::ollama::OllamaClient;
use jobtrail::upsert;
use jobtrail::{create_app, AppState};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set, SqlErr,
};
use serde_json::{json, Value};
use std::sync::Once;
use std::time::Duration;
use tower::ServiceExt;

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

async fn test_db() -> DatabaseConnection {
    setup();
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).min_connections(1);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Fresh app on its own in-memory database. One connection so every
/// query sees the same database.
async fn test_app() -> Router {
    let db = test_db().await;

    // Points at a closed port; handlers under test never reach the LLM.
    let ollama = OllamaClient::new("http://127.0.0.1:1".to_string(), Duration::from_secs(1))
        .unwrap();
    create_app(AppState::new(db, ollama))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Seed one job and return its id.
async fn seed_job(app: &Router, source_url: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/jobs",
            json!({ "title": "Engineer", "company": "Acme", "sourceUrl": source_url }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["job"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_application_lifecycle() {
    let app = test_app().await;
    let job_id = seed_job(&app, "https://example.com/app-flow").await;

    let (status, body) = send(
        &app,
        json_request("POST", "/applications", json!({ "job_id": job_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["status"], "started");
    assert_eq!(body["message"], "Application started successfully");
    let app_id = body["application"]["id"].as_str().unwrap().to_string();

    // One application per job.
    let (status, dup) = send(
        &app,
        json_request("POST", "/applications", json!({ "job_id": job_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(dup["success"], false);
    assert_eq!(dup["application"]["id"], app_id.as_str());

    let (status, fetched) = send(&app, get_request(&format!("/applications/job/{}", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["application"]["id"], app_id.as_str());

    let (status, updated) = send(
        &app,
        json_request(
            "PUT",
            &format!("/applications/{}", app_id),
            json!({
                "status": "submitted",
                "submitted_at": "2026-08-20T10:00:00Z",
                "notes": "sent via referral"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["application"]["status"], "submitted");
    assert!(updated["application"]["submitted_at"].is_string());
    assert_eq!(updated["application"]["notes"], "sent via referral");

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/applications/{}", app_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get_request(&format!("/applications/{}", app_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_application_validation() {
    let app = test_app().await;

    // job_id is mandatory.
    let (status, body) = send(&app, json_request("POST", "/applications", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("job_id"));

    // Unknown job.
    let (status, _) = send(
        &app,
        json_request("POST", "/applications", json!({ "job_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unknown status.
    let job_id = seed_job(&app, "https://example.com/app-status").await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/applications",
            json!({ "job_id": job_id, "status": "ghosted" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("ghosted"));
}

#[tokio::test]
async fn test_communications_crud_and_filter() {
    let app = test_app().await;
    let job_id = seed_job(&app, "https://example.com/comms").await;

    let (status, linked) = send(
        &app,
        json_request(
            "POST",
            "/communications",
            json!({
                "subject": "Interview invite",
                "from": "recruiter@acme.example",
                "body": "Hi, are you free Tuesday?",
                "job_id": job_id
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let linked_id = linked["communication"]["id"].as_str().unwrap().to_string();

    let (_, unlinked) = send(
        &app,
        json_request(
            "POST",
            "/communications",
            json!({ "subject": "Newsletter", "body": "unrelated" }),
        ),
    )
    .await;
    assert!(unlinked["communication"]["job_id"].is_null());

    let (_, all) = send(&app, get_request("/communications")).await;
    assert_eq!(all["count"], 2);

    let (_, filtered) = send(
        &app,
        get_request(&format!("/communications?jobId={}", job_id)),
    )
    .await;
    assert_eq!(filtered["count"], 1);
    assert_eq!(filtered["communications"][0]["id"], linked_id.as_str());

    // Explicit null detaches from the job; absent fields stay put.
    let (status, detached) = send(
        &app,
        json_request(
            "PUT",
            &format!("/communications/{}", linked_id),
            json!({ "job_id": null }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(detached["communication"]["job_id"].is_null());
    assert_eq!(detached["communication"]["subject"], "Interview invite");

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/communications/{}", linked_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, remaining) = send(&app, get_request("/communications")).await;
    assert_eq!(remaining["count"], 1);
}

#[tokio::test]
async fn test_communications_listed_newest_received_first() {
    let app = test_app().await;

    // Older message goes in first, so insertion order and received
    // order disagree.
    let (_, older) = send(
        &app,
        json_request(
            "POST",
            "/communications",
            json!({
                "subject": "First contact",
                "body": "b",
                "received_at": "2026-02-01T00:00:00Z"
            }),
        ),
    )
    .await;
    let (_, newer) = send(
        &app,
        json_request(
            "POST",
            "/communications",
            json!({
                "subject": "Follow-up",
                "body": "b",
                "received_at": "2026-07-01T00:00:00Z"
            }),
        ),
    )
    .await;

    let (status, listing) = send(&app, get_request("/communications")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 2);
    assert_eq!(
        listing["communications"][0]["id"],
        newer["communication"]["id"]
    );
    assert_eq!(
        listing["communications"][1]["id"],
        older["communication"]["id"]
    );
}

#[tokio::test]
async fn test_interview_rounds_auto_increment() {
    let app = test_app().await;
    let job_id = seed_job(&app, "https://example.com/interviews").await;

    let (status, first) = send(
        &app,
        json_request("POST", &format!("/jobs/{}/interviews", job_id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["interview"]["round_number"], 1);

    let (_, second) = send(
        &app,
        json_request(
            "POST",
            &format!("/jobs/{}/interviews", job_id),
            json!({ "interviewer_name": "Dana" }),
        ),
    )
    .await;
    assert_eq!(second["interview"]["round_number"], 2);

    // An explicit positive round number is kept as-is.
    let (_, fifth) = send(
        &app,
        json_request(
            "POST",
            &format!("/jobs/{}/interviews", job_id),
            json!({ "round_number": 5 }),
        ),
    )
    .await;
    assert_eq!(fifth["interview"]["round_number"], 5);

    // And the next default continues from the maximum.
    let (_, sixth) = send(
        &app,
        json_request("POST", &format!("/jobs/{}/interviews", job_id), json!({})),
    )
    .await;
    assert_eq!(sixth["interview"]["round_number"], 6);

    let (_, listing) = send(&app, get_request(&format!("/jobs/{}/interviews", job_id))).await;
    assert_eq!(listing["interviews"].as_array().unwrap().len(), 4);
    assert_eq!(listing["interviews"][0]["round_number"], 1);
}

#[tokio::test]
async fn test_interview_update_and_delete() {
    let app = test_app().await;
    let job_id = seed_job(&app, "https://example.com/interview-crud").await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            &format!("/jobs/{}/interviews", job_id),
            json!({ "interviewer_name": "Sam" }),
        ),
    )
    .await;
    let id = created["interview"]["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        json_request(
            "PUT",
            &format!("/interviews/{}", id),
            json!({ "notes": "went well", "completed_at": "2026-08-21T15:30:00Z" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["interview"]["notes"], "went well");
    assert_eq!(updated["interview"]["interviewer_name"], "Sam");
    assert!(updated["interview"]["completed_at"].is_string());

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/interviews/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get_request(&format!("/interviews/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_interviews_for_missing_job() {
    let app = test_app().await;
    let (status, _) = send(
        &app,
        json_request("POST", "/jobs/nope/interviews", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_job_cascades_and_detaches() {
    let app = test_app().await;
    let job_id = seed_job(&app, "https://example.com/cascade").await;

    send(
        &app,
        json_request("POST", "/applications", json!({ "job_id": job_id })),
    )
    .await;
    let (_, interview) = send(
        &app,
        json_request("POST", &format!("/jobs/{}/interviews", job_id), json!({})),
    )
    .await;
    let interview_id = interview["interview"]["id"].as_str().unwrap().to_string();
    send(
        &app,
        json_request(
            "POST",
            "/communications",
            json!({ "subject": "kept", "body": "b", "job_id": job_id }),
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/jobs/{}", job_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Application and interview rounds go with the job.
    let (status, _) = send(&app, get_request(&format!("/applications/job/{}", job_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get_request(&format!("/interviews/{}", interview_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Communications survive, detached.
    let (_, comms) = send(&app, get_request("/communications")).await;
    assert_eq!(comms["count"], 1);
    assert!(comms["communications"][0]["job_id"].is_null());
}

#[tokio::test]
async fn test_profile_empty_then_resume_update_404() {
    let app = test_app().await;

    let (status, body) = send(&app, get_request("/profile")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["profile"].is_null());

    // No profile row yet, nothing to attach a resume to.
    let (status, _) = send(
        &app,
        json_request("PUT", "/profile", json!({ "resume_data": { "name": "Me" } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Missing resume_data is a validation error regardless.
    let (status, _) = send(&app, json_request("PUT", "/profile", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_linkedin_validation() {
    let app = test_app().await;

    let (status, _) = send(&app, json_request("POST", "/profile", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/profile",
            json!({ "linkedin_url": "https://example.com/not-linkedin" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("LinkedIn"));
}

#[tokio::test]
async fn test_extract_job_validation() {
    let app = test_app().await;

    let (status, body) = send(&app, json_request("POST", "/extract/job", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Content"));

    let (status, body) = send(
        &app,
        json_request("POST", "/extract/job", json!({ "content": "some posting" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("URL"));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/extract/job",
            json!({ "content": "some posting", "url": "https://example.com/j" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Title"));
}

#[tokio::test]
async fn test_extract_email_requires_content() {
    let app = test_app().await;
    let (status, body) = send(&app, json_request("POST", "/extract/email", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Email content"));
}

#[tokio::test]
async fn test_extract_models_unreachable_is_500() {
    let app = test_app().await;
    let (status, body) = send(&app, get_request("/extract/models")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_normalized_source_url_unique_index_backstops_saves() {
    let db = test_db().await;

    let payload: JobPayload = serde_json::from_value(json!({
        "title": "Engineer",
        "company": "Acme",
        "sourceUrl": "https://ex.com/jobs/1?ref=x"
    }))
    .unwrap();
    let outcome = upsert::save_job(&db, payload).await.unwrap();
    assert!(outcome.created);
    assert_eq!(
        outcome.job.normalized_source_url.as_deref(),
        Some("https://ex.com/jobs/1")
    );

    // A second row with the same normalized URL is rejected by the
    // database itself, even when it bypasses duplicate resolution.
    let now = Utc::now();
    let err = job::ActiveModel {
        id: Set("other-id".to_string()),
        title: Set("Engineer".to_string()),
        company: Set("Acme".to_string()),
        location: Set(None),
        description: Set(None),
        salary_lower_bound: Set(None),
        salary_upper_bound: Set(None),
        salary_currency: Set(None),
        requirements: Set(None),
        application_url: Set(None),
        source_url: Set(Some("https://ex.com/jobs/1".to_string())),
        normalized_source_url: Set(Some("https://ex.com/jobs/1".to_string())),
        posted_date: Set(None),
        extracted_at: Set(None),
        saved_at: Set(now),
        excluded: Set(false),
        tags: Set(None),
        accepted_at: Set(None),
        rejected_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .unwrap_err();
    assert!(matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    ));

    // Saving a query-string variant still resolves to the first row.
    let variant: JobPayload = serde_json::from_value(json!({
        "title": "Engineer (refreshed)",
        "company": "Acme",
        "sourceUrl": "https://ex.com/jobs/1?utm_source=feed"
    }))
    .unwrap();
    let second = upsert::save_job(&db, variant).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.job.id, outcome.job.id);
}
