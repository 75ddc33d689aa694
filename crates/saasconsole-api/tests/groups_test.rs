//! Groups and departments integration tests.
//!
//! Run with: `cargo test -p saasconsole-api --test groups_test`

mod helpers;

use helpers::fixtures::{add_member, create_group, owner_with_company, parse_id};
use helpers::{api_path, setup_test_app};
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn test_group_names_are_unique_in_company() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    create_group(&app, &owner, "Engineering").await;

    let response = app
        .client()
        .post(&api_path("/groups"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": "engineering" }))
        .await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["code"], "GROUP_NAME_ALREADY_EXISTS");

    // Another company may reuse the name
    let other = owner_with_company(&app, "other@example.com", "Globex").await;
    create_group(&app, &other, "Engineering").await;
}

#[tokio::test]
async fn test_group_membership() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let alice = add_member(&app, &owner, "alice@example.com").await;
    let bob = add_member(&app, &owner, "bob@example.com").await;
    let group_id = create_group(&app, &owner, "Engineering").await;
    let members_path = api_path(&format!("/groups/{}/members", group_id));

    let response = app
        .client()
        .post(&members_path)
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_ids": [alice.user_id, bob.user_id] }))
        .await;
    assert_eq!(response.status_code(), 200);

    // Strangers are refused before anything is written
    let response = app
        .client()
        .post(&members_path)
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_ids": [Uuid::new_v4()] }))
        .await;
    assert_eq!(response.status_code(), 404);

    let response = app
        .client()
        .delete(&members_path)
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_ids": [bob.user_id] }))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .get(&members_path)
        .authorization_bearer(&owner.token)
        .await;
    let members: Value = response.json();
    let ids: Vec<Uuid> = members
        .as_array()
        .unwrap()
        .iter()
        .map(|m| parse_id(&m["UserID"]))
        .collect();
    assert_eq!(ids, vec![alice.user_id]);

    let response = app
        .client()
        .get(&api_path("/users/me"))
        .authorization_bearer(&alice.token)
        .await;
    let me: Value = response.json();
    assert_eq!(parse_id(&me["groups"][0]["GroupID"]), group_id);
}

#[tokio::test]
async fn test_delete_group_drops_members() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let alice = add_member(&app, &owner, "alice@example.com").await;
    let group_id = create_group(&app, &owner, "Temporary").await;
    app.client()
        .post(&api_path(&format!("/groups/{}/members", group_id)))
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_ids": [alice.user_id] }))
        .await;

    let response = app
        .client()
        .delete(&api_path(&format!("/groups/{}", group_id)))
        .authorization_bearer(&owner.token)
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["removed_members"], json!([alice.user_id]));

    let response = app
        .client()
        .get(&api_path(&format!("/groups/{}", group_id)))
        .authorization_bearer(&owner.token)
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_department_groups_and_members() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let alice = add_member(&app, &owner, "alice@example.com").await;

    let response = app
        .client()
        .post(&api_path("/departments"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": "Research" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let department: Value = response.json();
    let department_id = parse_id(&department["DepartmentID"]);

    let response = app
        .client()
        .post(&api_path("/departments"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": "research" }))
        .await;
    assert_eq!(response.status_code(), 409);

    let response = app
        .client()
        .post(&api_path("/groups"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": "Lab", "department_id": department_id }))
        .await;
    assert_eq!(response.status_code(), 201);
    let group: Value = response.json();
    let group_id = parse_id(&group["GroupID"]);

    let response = app
        .client()
        .post(&api_path("/groups"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": "Orphan", "department_id": Uuid::new_v4() }))
        .await;
    assert_eq!(response.status_code(), 404);

    let response = app
        .client()
        .get(&api_path(&format!("/departments/{}/groups", department_id)))
        .authorization_bearer(&owner.token)
        .await;
    let groups: Value = response.json();
    assert_eq!(parse_id(&groups[0]["GroupID"]), group_id);

    let response = app
        .client()
        .post(&api_path(&format!("/departments/{}/members", department_id)))
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_ids": [alice.user_id] }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .client()
        .delete(&api_path(&format!("/departments/{}", department_id)))
        .authorization_bearer(&owner.token)
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["removed_members"], json!([alice.user_id]));
    assert_eq!(body["detached_groups"], json!([group_id]));

    // The group survives without its department
    let response = app
        .client()
        .get(&api_path(&format!("/groups/{}", group_id)))
        .authorization_bearer(&owner.token)
        .await;
    assert_eq!(response.status_code(), 200);
    let group: Value = response.json();
    assert!(group.get("DepartmentID").is_none());
}

#[tokio::test]
async fn test_group_admin_role_manages_members_only() {
    let app = setup_test_app().await;
    let owner = owner_with_company(&app, "owner@example.com", "Acme").await;
    let member = add_member(&app, &owner, "member@example.com").await;
    let colleague = add_member(&app, &owner, "colleague@example.com").await;
    let group_id = create_group(&app, &owner, "Support").await;

    let group_admin = app
        .client()
        .get(&api_path("/roles"))
        .add_query_param("search", "group admin")
        .authorization_bearer(&owner.token)
        .await
        .json::<Value>()[0]["RoleID"]
        .clone();

    let response = app
        .client()
        .post(&api_path("/roles/assign"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_ids": [member.user_id], "role_ids": [group_admin] }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .client()
        .post(&api_path(&format!("/groups/{}/members", group_id)))
        .authorization_bearer(&member.token)
        .json(&json!({ "user_ids": [colleague.user_id] }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .client()
        .post(&api_path("/groups"))
        .authorization_bearer(&member.token)
        .json(&json!({ "name": "Shadow IT" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .client()
        .post(&api_path("/departments"))
        .authorization_bearer(&member.token)
        .json(&json!({ "name": "Operations" }))
        .await;
    assert_eq!(response.status_code(), 403);
}
