use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LogModuleParams, Status};

/// Department of a company; groups may be attached to one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Department {
    #[serde(rename = "DepartmentID")]
    pub department_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
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

impl Department {
    pub fn log_entry(&self) -> LogModuleParams {
        LogModuleParams::named(self.department_id, self.name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct DepartmentMember {
    #[serde(rename = "DepartmentID")]
    pub department_id: Uuid,
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
pub struct CreateDepartmentRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Department name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateDepartmentRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Department name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}
