use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use jobtrail::ollama::OllamaClient;
use jobtrail::{create_app, AppState};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

/// Fresh app on its own in-memory database. One connection so every
/// query sees the same database.
async fn test_app() -> Router {
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).min_connections(1);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

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

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;
    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_save_job_creates_and_lists() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({
                "title": "Staff Engineer",
                "company": "Acme",
                "sourceUrl": "https://example.com/jobs/123",
                "tags": ["rust", "remote"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["created"], true);
    assert_eq!(body["job"]["title"], "Staff Engineer");
    assert_eq!(body["job"]["tags"], json!(["rust", "remote"]));

    let (status, body) = send(&app, get_request("/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["jobs"][0]["company"], "Acme");
}

#[tokio::test]
async fn test_save_job_duplicate_updates_in_place() {
    let app = test_app().await;

    let (_, first) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({
                "title": "Backend Engineer",
                "company": "Acme",
                "sourceUrl": "https://example.com/jobs/456",
                "extractedAt": "2026-08-01T00:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(first["created"], true);
    let first_id = first["job"]["id"].as_str().unwrap().to_string();
    let first_saved_at = first["job"]["savedAt"].clone();
    let first_extracted_at = first["job"]["extractedAt"].as_str().unwrap().to_string();

    // Same posting, tracking query and different case. Must update, not insert.
    let (status, second) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({
                "title": "Backend Engineer (updated)",
                "company": "Acme",
                "sourceUrl": "https://EXAMPLE.com/jobs/456?utm_source=newsletter"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(second["job"]["id"], first_id.as_str());
    assert_eq!(second["job"]["savedAt"], first_saved_at);
    assert_eq!(second["job"]["title"], "Backend Engineer (updated)");

    // The update stamps a fresh extraction time; RFC 3339 with a fixed
    // layout compares chronologically as a string.
    let second_extracted_at = second["job"]["extractedAt"].as_str().unwrap();
    assert!(second_extracted_at > first_extracted_at.as_str());

    let (_, listing) = send(&app, get_request("/jobs")).await;
    assert_eq!(listing["count"], 1);
}

#[tokio::test]
async fn test_jobs_listed_newest_saved_first() {
    let app = test_app().await;

    // Insert the older job first so a correct listing cannot be
    // mistaken for insertion order.
    let (_, older) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({
                "title": "Older",
                "company": "Acme",
                "sourceUrl": "https://example.com/jobs/old",
                "savedAt": "2026-01-01T00:00:00Z"
            }),
        ),
    )
    .await;
    let (_, newer) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({
                "title": "Newer",
                "company": "Acme",
                "sourceUrl": "https://example.com/jobs/new",
                "savedAt": "2026-06-01T00:00:00Z"
            }),
        ),
    )
    .await;

    let (status, listing) = send(&app, get_request("/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 2);
    assert_eq!(listing["jobs"][0]["id"], newer["job"]["id"]);
    assert_eq!(listing["jobs"][1]["id"], older["job"]["id"]);
}

#[tokio::test]
async fn test_save_job_defaults_missing_title_and_company() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/jobs", json!({ "sourceUrl": "https://example.com/x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["title"], "Title Not Found");
    assert_eq!(body["job"]["company"], "Company Not Found");
}

#[tokio::test]
async fn test_get_missing_job_is_404() {
    let app = test_app().await;
    let (status, body) = send(&app, get_request("/jobs/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_delete_job_then_gone() {
    let app = test_app().await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({ "title": "T", "company": "C", "sourceUrl": "https://example.com/del" }),
        ),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/jobs/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Job deleted successfully");

    let (status, _) = send(&app, get_request(&format!("/jobs/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting again reports not found.
    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/jobs/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_tags_round_trip() {
    let app = test_app().await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({ "title": "T", "company": "C", "sourceUrl": "https://example.com/tags" }),
        ),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/jobs/{}/tags", id),
            json!({ "tags": ["remote", "senior", "rust"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["tags"], json!(["remote", "senior", "rust"]));

    let (_, fetched) = send(&app, get_request(&format!("/jobs/{}", id))).await;
    assert_eq!(fetched["job"]["tags"], json!(["remote", "senior", "rust"]));

    // Omitting the list clears it.
    let (_, cleared) = send(
        &app,
        json_request("PUT", &format!("/jobs/{}/tags", id), json!({})),
    )
    .await;
    assert_eq!(cleared["job"]["tags"], json!([]));
}

#[tokio::test]
async fn test_accept_and_reject_are_mutually_exclusive() {
    let app = test_app().await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({ "title": "T", "company": "C", "sourceUrl": "https://example.com/decide" }),
        ),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    let (_, accepted) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri(format!("/jobs/{}/accept", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(accepted["job"]["acceptedAt"].is_string());
    assert!(accepted["job"]["rejectedAt"].is_null());

    let (_, rejected) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri(format!("/jobs/{}/reject", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(rejected["job"]["rejectedAt"].is_string());
    assert!(rejected["job"]["acceptedAt"].is_null());

    let (_, cleared) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/jobs/{}/reject", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(cleared["job"]["rejectedAt"].is_null());
    assert!(cleared["job"]["acceptedAt"].is_null());
}

#[tokio::test]
async fn test_find_by_url_requires_parameter() {
    let app = test_app().await;
    let (status, body) = send(&app, get_request("/jobs/by-url")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_find_by_url_matches_normalized_duplicate() {
    let app = test_app().await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({ "title": "T", "company": "C", "sourceUrl": "https://example.com/jobs/789" }),
        ),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    // Trailing slash and casing differences still match.
    let (status, body) = send(
        &app,
        get_request("/jobs/by-url?url=https://EXAMPLE.com/jobs/789/"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobId"], id.as_str());
    assert_eq!(body["hasApplication"], false);

    let (_, _) = send(
        &app,
        json_request("POST", "/applications", json!({ "job_id": id })),
    )
    .await;

    let (_, body) = send(
        &app,
        get_request("/jobs/by-url?url=https://example.com/jobs/789"),
    )
    .await;
    assert_eq!(body["hasApplication"], true);
}

#[tokio::test]
async fn test_find_by_url_no_match() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        get_request("/jobs/by-url?url=https://example.com/never-seen"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["job"].is_null());
    assert_eq!(body["hasApplication"], false);
}

#[tokio::test]
async fn test_update_job_full_put() {
    let app = test_app().await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/jobs",
            json!({
                "title": "Old",
                "company": "Acme",
                "sourceUrl": "https://example.com/put",
                "salary_lower_bound": 100000
            }),
        ),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    // Full replace: fields not sent are cleared.
    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/jobs/{}", id),
            json!({
                "title": "New",
                "company": "Acme",
                "location": ["Berlin", "Remote"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["title"], "New");
    assert_eq!(body["job"]["location"], json!(["Berlin", "Remote"]));
    assert!(body["job"]["salary_lower_bound"].is_null());
}
