//! Admin authentication, roles and health endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use axum::http::header::HeaderName;
use serde_json::json;

use mp_records_integration_tests::{ADMIN_PASSWORD, ADMIN_USERNAME, TestApp};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let health = app.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.text(), "ok");

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_generated_and_echoed() {
    let app = TestApp::new();
    let header = HeaderName::from_static("x-request-id");

    let generated = app.get("/health", None).await;
    assert!(!generated.header(header.clone()).unwrap_or_default().is_empty());

    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "upstream-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let echoed = app.send(request).await;
    assert_eq!(echoed.header(header), Some("upstream-42"));
}

#[tokio::test]
async fn test_setup_only_once() {
    let app = TestApp::new();
    let _token = app.admin_token().await;

    let again = app
        .post(
            "/api/auth/setup",
            None,
            &json!({ "username": "second", "password": "another-pass" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.json()["success"], false);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = TestApp::new();
    let _token = app.admin_token().await;

    let response = app
        .post(
            "/api/auth/login",
            None,
            &json!({ "username": ADMIN_USERNAME, "password": "nope-nope" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_verify_requires_token() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let anonymous = app.get("/api/auth/verify", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let garbage = app.get("/api/auth/verify", Some("not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let verified = app.get("/api/auth/verify", Some(&token)).await;
    assert_eq!(verified.status, StatusCode::OK);
    let body = verified.json();
    assert_eq!(body["user"]["username"], ADMIN_USERNAME);
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_editor_cannot_manage_backups_or_users() {
    let app = TestApp::new();
    let admin = app.admin_token().await;

    let created = app
        .post(
            "/api/auth/users",
            Some(&admin),
            &json!({ "username": "redaktor", "password": "redakcja-1", "role": "editor" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["user"]["role"], "editor");

    let editor = app.login("redaktor", "redakcja-1").await;

    let messages = app.get("/api/contact", Some(&editor)).await;
    assert_eq!(messages.status, StatusCode::OK);

    let stats = app.get("/api/backup/stats", Some(&editor)).await;
    assert_eq!(stats.status, StatusCode::FORBIDDEN);

    let export = app.get("/api/backup/export", Some(&editor)).await;
    assert_eq!(export.status, StatusCode::FORBIDDEN);

    let more_users = app
        .post(
            "/api/auth/users",
            Some(&editor),
            &json!({ "username": "intruz", "password": "intruz-123", "role": "admin" }),
        )
        .await;
    assert_eq!(more_users.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = TestApp::new();
    let admin = app.admin_token().await;

    let duplicate = app
        .post(
            "/api/auth/users",
            Some(&admin),
            &json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_customer_token_is_not_an_admin_token() {
    let app = TestApp::new();
    let _admin = app.admin_token().await;
    let customer = app.customer_token("ola@example.pl").await;

    let response = app.get("/api/orders/admin", Some(&customer)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let profile = app.get("/api/customers/profile", Some(&admin)).await;
    assert_eq!(profile.status, StatusCode::UNAUTHORIZED);
}
