//! Authentication, health and documentation endpoints.
//!
//! Run with: `cargo test -p saasconsole-api --test auth_test`

mod helpers;

use helpers::fixtures::{create_user, owner_with_company};
use helpers::{api_path, setup_test_app};
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = setup_test_app().await;

    let response = app.client().get(&api_path("/users/me")).await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["code"], "MISSING_AUTHORIZATION_HEADER");
}

#[tokio::test]
async fn test_garbage_and_foreign_tokens_are_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/users/me"))
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(response.status_code(), 401);

    // Well-formed token for a user the console has never seen
    let token = app.token_for(Uuid::new_v4(), None);
    let response = app
        .client()
        .get(&api_path("/users/me"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_current_user_without_company() {
    let app = setup_test_app().await;
    let user = create_user(&app, "solo@example.com", "Solo").await;
    let token = app.token_for(user.user_id, None);

    let response = app
        .client()
        .get(&api_path("/users/me"))
        .authorization_bearer(&token)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["Email"], "solo@example.com");
    assert!(body["company_id"].is_null());
    assert!(body["membership"].is_null());
}

#[tokio::test]
async fn test_company_scoped_endpoint_needs_active_company() {
    let app = setup_test_app().await;
    let user = create_user(&app, "nocompany@example.com", "Nobody").await;
    let token = app.token_for(user.user_id, None);

    let response = app
        .client()
        .get(&api_path("/roles"))
        .authorization_bearer(&token)
        .await;

    assert_eq!(response.status_code(), 422);
}

#[tokio::test]
async fn test_current_user_reports_owner_membership() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;

    let response = app
        .client()
        .get(&api_path("/users/me"))
        .authorization_bearer(&owner.token)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["company_id"], owner.company_id.to_string());
    assert_eq!(body["membership"]["UserType"], "COMPANY_OWNER");
    assert_eq!(body["roles"][0]["Name"], "company admin");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = setup_test_app().await;

    let live = app.client().get("/live").await;
    assert_eq!(live.status_code(), 200);

    let ready = app.client().get("/ready").await;
    assert_eq!(ready.status_code(), 200);

    let health = app.client().get("/health").await;
    assert_eq!(health.status_code(), 200);
    let body: Value = health.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store_backend"], "memory");
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["/api/v1/users"].is_object());
}
