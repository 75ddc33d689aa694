//! Scheduled removals and group membership jobs.
//!
//! Run with: `cargo test -p saasconsole-api --test jobs_test`

mod helpers;

use chrono::{Duration, Utc};
use helpers::fixtures::{add_member, connect_integration, create_group, owner_with_company, parse_id};
use helpers::{api_path, setup_test_app};
use saasconsole_api::services::scheduler::run_due;
use serde_json::{json, Value};

#[tokio::test]
async fn test_removal_job_runs_when_due() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let member = add_member(&app, &owner, "member@example.com").await;
    let integration_id = connect_integration(&app, &owner, "slack").await;

    let response = app
        .client()
        .post(&api_path("/users/remove-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "integration_id": integration_id,
            "number_of_days": 1,
            "users": [{ "email": member.email }, { "email": "MEMBER@example.com" }]
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(body["skipped"], json!(["member@example.com"]));

    // Already scheduled
    let response = app
        .client()
        .post(&api_path("/users/remove-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "integration_id": integration_id,
            "number_of_days": 3,
            "users": [{ "email": member.email }]
        }))
        .await;
    assert_eq!(response.status_code(), 409);

    // Not due yet
    let run = run_due(&app.state, Utc::now()).await.unwrap();
    assert_eq!(run.jobs_done, 0);
    assert!(app.cleanup.calls().is_empty());

    let run = run_due(&app.state, Utc::now() + Duration::days(2)).await.unwrap();
    assert_eq!(run.jobs_done, 1);
    assert_eq!(
        app.cleanup.calls(),
        vec![("slack".to_string(), "member@example.com".to_string())]
    );

    // Done jobs do not run again
    let run = run_due(&app.state, Utc::now() + Duration::days(3)).await.unwrap();
    assert_eq!(run.jobs_done, 0);
    assert_eq!(app.cleanup.calls().len(), 1);
}

#[tokio::test]
async fn test_failed_removal_is_retried() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    add_member(&app, &owner, "member@example.com").await;
    let integration_id = connect_integration(&app, &owner, "jira").await;
    app.cleanup.fail_for("jira");

    app.client()
        .post(&api_path("/users/remove-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "integration_id": integration_id,
            "number_of_days": 0,
            "users": [{ "email": "member@example.com" }]
        }))
        .await;

    let later = Utc::now() + Duration::hours(1);
    let run = run_due(&app.state, later).await.unwrap();
    assert_eq!(run.jobs_failed, 1);

    app.cleanup.failing_slugs.lock().unwrap().clear();
    let run = run_due(&app.state, later).await.unwrap();
    assert_eq!(run.jobs_done, 1);
    assert_eq!(app.cleanup.calls().len(), 2);
}

#[tokio::test]
async fn test_removal_job_passes_recorded_account() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    add_member(&app, &owner, "alice@example.com").await;
    add_member(&app, &owner, "bob@example.com").await;
    let integration_id = connect_integration(&app, &owner, "github").await;

    let response = app
        .client()
        .post(&api_path("/users/remove-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "integration_id": integration_id,
            "number_of_days": 0,
            "users": [
                { "email": "alice@example.com", "integration_account": "alice-gh" },
                { "email": "bob@example.com" }
            ]
        }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());

    let run = run_due(&app.state, Utc::now() + Duration::hours(1)).await.unwrap();
    assert_eq!(run.jobs_done, 2);

    let mut sent: Vec<(String, Option<String>)> = app
        .cleanup
        .calls()
        .into_iter()
        .map(|(_, email)| email)
        .zip(app.cleanup.accounts())
        .collect();
    sent.sort();
    assert_eq!(
        sent,
        vec![
            ("alice@example.com".to_string(), Some("alice-gh".to_string())),
            ("bob@example.com".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_removal_of_owner_is_skipped() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let integration_id = connect_integration(&app, &owner, "slack").await;

    app.client()
        .post(&api_path("/users/remove-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "integration_id": integration_id,
            "number_of_days": 0,
            "users": [{ "email": "owner@example.com" }]
        }))
        .await;

    let run = run_due(&app.state, Utc::now() + Duration::hours(1)).await.unwrap();
    assert_eq!(run.jobs_skipped, 1);
    assert!(app.cleanup.calls().is_empty());
}

#[tokio::test]
async fn test_group_change_job_adds_members() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let alice = add_member(&app, &owner, "alice@example.com").await;
    let group_id = create_group(&app, &owner, "Night Shift").await;

    let response = app
        .client()
        .post(&api_path("/users/cron-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "group_id": group_id,
            "job_type": "ADD_GROUP_MEMBERS",
            "number_of_days": 1,
            "users": [{ "user_id": alice.user_id, "email": alice.email }]
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let job: Value = response.json();
    assert_eq!(job["Status"], "PENDING");

    let run = run_due(&app.state, Utc::now() + Duration::days(2)).await.unwrap();
    assert_eq!(run.cron_jobs_done, 1);

    let response = app
        .client()
        .get(&api_path(&format!("/groups/{}/members", group_id)))
        .authorization_bearer(&owner.token)
        .await;
    let members: Value = response.json();
    assert_eq!(parse_id(&members[0]["UserID"]), alice.user_id);

    let response = app
        .client()
        .get(&api_path("/logs"))
        .add_query_param("action", "ADD_GROUP_MEMBERS")
        .authorization_bearer(&owner.token)
        .await;
    let logs: Value = response.json();
    assert_eq!(logs["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_group_change_for_unknown_group_is_refused() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;

    let response = app
        .client()
        .post(&api_path("/users/cron-jobs"))
        .authorization_bearer(&owner.token)
        .json(&json!({
            "group_id": uuid::Uuid::new_v4(),
            "job_type": "REMOVE_GROUP_MEMBERS",
            "number_of_days": 0,
            "users": [{ "user_id": owner.user_id, "email": owner.email }]
        }))
        .await;
    assert_eq!(response.status_code(), 404);
}
