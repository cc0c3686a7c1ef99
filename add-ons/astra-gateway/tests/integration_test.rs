//! End-to-end tests driving the router directly.
//!
//! No provider API key is configured, so every chat/analysis path exercises
//! the canned fallback cascade — the total-availability contract.

use astra_core::AppConfig;
use astra_gateway::api::build_router;
use astra_gateway::state::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const MAX_FILE_SIZE: usize = 1024;

// ─── Test helpers ───────────────────────────────────────────────────────

async fn setup() -> (Router, TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let config = AppConfig {
        jwt_secret: "test-secret".to_string(),
        token_ttl_secs: 3600,
        upload_dir: tmp.path().to_path_buf(),
        max_file_size: MAX_FILE_SIZE,
        ..AppConfig::default()
    };
    let state = AppState::new(config).await.unwrap();
    (build_router(state), tmp)
}

fn api_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn api_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn authed_get(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn multipart_upload(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "AstraTestBoundary7f";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn register(router: &Router, name: &str, email: &str, password: &str) -> String {
    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/auth/register",
            json!({"name": name, "email": email, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

// ─── Service banner ─────────────────────────────────────────────────────

#[tokio::test]
async fn root_and_health() {
    let (router, _tmp) = setup().await;

    let response = router.clone().oneshot(api_get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Astra"));

    let response = router.clone().oneshot(api_get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

// ─── Auth ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_me_flow() {
    let (router, _tmp) = setup().await;
    let token = register(&router, "Ada", "ada@example.com", "hunter2!").await;

    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/auth/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["email"], "ada@example.com");
    assert!(!body["id"].as_str().unwrap().is_empty());

    // Second registration with the same email is a validation error.
    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/auth/register",
            json!({"name": "Imposter", "email": "ada@example.com", "password": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Email already registered");

    // Login with the right password succeeds, with the wrong one fails.
    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/auth/login",
            json!({"email": "ada@example.com", "password": "hunter2!"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/auth/login",
            json!({"email": "ada@example.com", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_yields_working_token() {
    let (router, _tmp) = setup().await;
    let token = register(&router, "Ada", "ada@example.com", "hunter2!").await;

    let response = router
        .clone()
        .oneshot(authed_request("POST", "/api/auth/refresh", &token, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/auth/me", &refreshed))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_tokens_are_rejected() {
    let (router, _tmp) = setup().await;

    let response = router.clone().oneshot(api_get("/api/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/auth/me", "not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(authed_request("POST", "/api/auth/refresh", "not-a-jwt", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ─── Files ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn file_upload_roundtrip() {
    let (router, _tmp) = setup().await;
    let content: &[u8] = b"ancient river delta sediments show organic signatures";

    let response = router
        .clone()
        .oneshot(multipart_upload("perseverance_notes.txt", "text/plain", content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "perseverance_notes.txt");
    assert_eq!(body["message"], "File uploaded successfully");
    let id = body["id"].as_str().unwrap().to_string();

    // Listed with the original wire field names.
    let response = router.clone().oneshot(api_get("/api/files")).await.unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["type"], "text/plain");
    assert_eq!(listed[0]["size"], content.len());
    assert!(listed[0]["uploadedAt"].is_string());

    let response = router
        .clone()
        .oneshot(api_get(&format!("/api/files/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Download returns the exact bytes and the stored content type.
    let response = router
        .clone()
        .oneshot(api_get(&format!("/api/files/{}/download", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/plain"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], content);

    // Delete, then everything 404s.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/files/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "File deleted successfully");

    let response = router
        .clone()
        .oneshot(api_get(&format!("/api/files/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(api_get(&format!("/api/files/{}/download", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_upload_rejected_without_entry() {
    let (router, _tmp) = setup().await;

    let big = vec![0u8; MAX_FILE_SIZE * 2];
    let response = router
        .clone()
        .oneshot(multipart_upload("huge.bin", "application/octet-stream", &big))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = router.clone().oneshot(api_get("/api/files")).await.unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let (router, _tmp) = setup().await;

    let boundary = "AstraTestBoundary7f";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let (router, _tmp) = setup().await;

    let response = router
        .clone()
        .oneshot(api_get("/api/files/no-such-id"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/files/no-such-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_analysis_is_total_without_providers() {
    let (router, _tmp) = setup().await;

    let response = router
        .clone()
        .oneshot(multipart_upload(
            "bennu_samples.txt",
            "text/plain",
            b"carbon-rich regolith returned from asteroid Bennu",
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            &format!("/api/files/{}/analyze", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["file_id"], id);
    assert!(body["analysis"]["summary"]
        .as_str()
        .unwrap()
        .contains("bennu_samples.txt"));
    assert!(!body["analysis"]["key_points"].as_array().unwrap().is_empty());
}

// ─── Chat ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_comparison_fallback_echoes_utterance() {
    let (router, _tmp) = setup().await;
    let token = register(&router, "Ada", "ada@example.com", "hunter2!").await;

    let response = router
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/chat/message",
            &token,
            json!({"content": "compare Mars and Europa missions"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["sender"], "ai");
    assert!(body["content"]
        .as_str()
        .unwrap()
        .contains("compare Mars and Europa missions"));
    assert!(body["content"].as_str().unwrap().contains("comparing"));

    // Both sides landed in history, in order.
    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/chat/history", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let messages = body_json(response).await["messages"].clone();
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["sender"], "user");
    assert_eq!(messages[0]["content"], "compare Mars and Europa missions");
    assert_eq!(messages[1]["sender"], "ai");

    // Clear wipes the log.
    let response = router
        .clone()
        .oneshot(authed_get("DELETE", "/api/chat/history", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/chat/history", &token))
        .await
        .unwrap();
    let messages = body_json(response).await["messages"].clone();
    assert!(messages.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn chat_generic_fallback_echoes_utterance() {
    let (router, _tmp) = setup().await;

    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/chat/message",
            json!({"content": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["sender"], "ai");
    assert!(body["content"].as_str().unwrap().contains("hello"));
}

#[tokio::test]
async fn chat_rejects_empty_content_and_missing_auth_for_history() {
    let (router, _tmp) = setup().await;

    let response = router
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/chat/message",
            json!({"content": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(api_get("/api/chat/history"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_multi_file_analyze_is_total() {
    let (router, _tmp) = setup().await;
    let token = register(&router, "Ada", "ada@example.com", "hunter2!").await;

    let response = router
        .clone()
        .oneshot(multipart_upload("lunar_survey.txt", "text/plain", b"water ice"))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/chat/analyze",
            &token,
            json!({"file_ids": [id], "query": "common themes"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["files_analyzed"], 1);
    assert_eq!(body["query"], "common themes");
    assert!(!body["insights"].as_array().unwrap().is_empty());
}

// ─── Profile ────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_aggregates_live_stats() {
    let (router, _tmp) = setup().await;
    let token = register(&router, "Ada", "ada@example.com", "hunter2!").await;

    let content: &[u8] = b"helium-3 deposits in regolith";
    router
        .clone()
        .oneshot(multipart_upload("notes.txt", "text/plain", content))
        .await
        .unwrap();
    router
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/chat/message",
            &token,
            json!({"content": "tell me about Mars"}),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/users/profile", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["full_name"], "Ada");
    assert_eq!(body["stats"]["total_files"], 1);
    assert_eq!(body["stats"]["total_storage_bytes"], content.len());
    assert_eq!(body["stats"]["ai_queries_count"], 1);
    assert_eq!(body["stats"]["recent_uploads"], 1);

    // Without a token the latest registered account is shown.
    let response = router
        .clone()
        .oneshot(api_get("/api/users/profile"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "ada@example.com");
}

#[tokio::test]
async fn profile_update_changes_name() {
    let (router, _tmp) = setup().await;
    let token = register(&router, "Ada", "ada@example.com", "hunter2!").await;

    let response = router
        .clone()
        .oneshot(authed_request(
            "PUT",
            "/api/users/profile",
            &token,
            json!({"full_name": "Ada Lovelace"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["full_name"], "Ada Lovelace");

    let response = router
        .clone()
        .oneshot(authed_get("GET", "/api/users/profile", &token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["full_name"], "Ada Lovelace");

    // Update without a token is rejected.
    let response = router
        .clone()
        .oneshot(api_request(
            "PUT",
            "/api/users/profile",
            json!({"full_name": "Nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
