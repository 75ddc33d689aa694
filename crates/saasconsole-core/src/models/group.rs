use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LogModuleParams, Status};

/// Organisational group inside a company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(rename = "GroupID")]
    pub group_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    #[serde(rename = "DepartmentID", default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Status,
    pub created_by: Uuid,
    #[serde(default)]
    pub search_key: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn log_entry(&self) -> LogModuleParams {
        LogModuleParams::named(self.group_id, self.name.clone())
    }
}

/// Link row between a group and one of its members.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct GroupMember {
    #[serde(rename = "GroupID")]
    pub group_id: Uuid,
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<Uuid>,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Group name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: String,
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Group name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MembersRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub user_ids: Vec<Uuid>,
}
