//! Seed data created through the API, the way a real client would.

use super::{api_path, TestApp};
use chrono::Utc;
use saasconsole_core::models::{Status, User};
use serde_json::{json, Value};
use uuid::Uuid;

/// A user with a session in one company.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub company_id: Uuid,
    pub token: String,
}

/// Insert a user row directly; sign-up belongs to the identity provider.
pub async fn create_user(app: &TestApp, email: &str, first_name: &str) -> User {
    let user = User {
        user_id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        job_title: String::new(),
        contact_number: String::new(),
        display_photo: None,
        status: Status::Active,
        active_company: None,
        user_token: String::new(),
        created_at: Utc::now(),
        updated_at: None,
    };
    app.state
        .db
        .users
        .create(&user)
        .await
        .expect("Failed to create test user");
    user
}

/// Create a user and establish a company owned by them.
pub async fn owner_with_company(app: &TestApp, email: &str, company_name: &str) -> TestUser {
    let user = create_user(app, email, "Owner").await;
    let token = app.token_for(user.user_id, None);

    let response = app
        .client()
        .post(&api_path("/companies"))
        .authorization_bearer(&token)
        .json(&json!({ "name": company_name, "description": "Test company" }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let company: Value = response.json();

    TestUser {
        user_id: user.user_id,
        email: user.email,
        company_id: parse_id(&company["CompanyID"]),
        token,
    }
}

/// Add an ACTIVE member to the owner's company and give them a session.
pub async fn add_member(app: &TestApp, owner: &TestUser, email: &str) -> TestUser {
    let response = app
        .client()
        .post(&api_path("/users"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "users": [{ "email": email, "first_name": "Member" }] }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let body: Value = response.json();
    let user_id = parse_id(&body["added"][0]["UserID"]);

    TestUser {
        user_id,
        email: email.to_string(),
        company_id: owner.company_id,
        token: app.token_for(user_id, Some(owner.company_id)),
    }
}

/// Create a custom role with the given permissions.
pub async fn create_role(app: &TestApp, owner: &TestUser, name: &str, permissions: &[&str]) -> Uuid {
    let response = app
        .client()
        .post(&api_path("/roles"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": name, "permissions": permissions }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let role: Value = response.json();
    parse_id(&role["RoleID"])
}

pub async fn create_group(app: &TestApp, actor: &TestUser, name: &str) -> Uuid {
    let response = app
        .client()
        .post(&api_path("/groups"))
        .authorization_bearer(&actor.token)
        .json(&json!({ "name": name }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let group: Value = response.json();
    parse_id(&group["GroupID"])
}

pub async fn connect_integration(app: &TestApp, owner: &TestUser, slug: &str) -> Uuid {
    let response = app
        .client()
        .post(&api_path("/integrations"))
        .authorization_bearer(&owner.token)
        .json(&json!({ "slug": slug, "name": slug }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let integration: Value = response.json();
    parse_id(&integration["IntegrationID"])
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("Expected a UUID, got {}", value))
}
