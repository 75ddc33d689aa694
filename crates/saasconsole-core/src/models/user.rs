use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::Status;

/// Global user identity, independent of any company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_photo: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_company: Option<Uuid>,
    /// Invitation token, or `DEFAULT_USER` for accounts created without an invite
    #[serde(default)]
    pub user_token: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// User as returned to clients; never carries the invitation token
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct UserResponse {
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub contact_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_photo: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_company: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            job_title: user.job_title,
            contact_number: user.contact_number,
            display_photo: user.display_photo,
            status: user.status,
            active_company: user.active_company,
            created_at: user.created_at,
        }
    }
}

/// One entry of an add/invite request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewUserInput {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "First name is too long"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Last name is too long"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Job title is too long"))]
    pub job_title: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "Contact number is too long"))]
    pub contact_number: String,
}

/// Request DTO for adding or inviting users to the active company
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddUsersRequest {
    #[validate(length(min = 1, message = "At least one user is required"), nested)]
    pub users: Vec<NewUserInput>,
    /// Send an invitation and keep memberships PENDING until accepted
    #[serde(default)]
    pub create_account: bool,
}

/// Request DTO for editing a user's profile
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Job title is too long"))]
    pub job_title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "Contact number is too long"))]
    pub contact_number: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Display photo must be a valid URL"))]
    pub display_photo: Option<String>,
}

/// Body of the link sent in an invitation email
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateUserStatusRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateUserEmailRequest {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CheckEmailRequest {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UserIdsRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RemoveUsersRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    #[serde(default)]
    pub remove_integration_accounts: bool,
}
