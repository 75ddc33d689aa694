use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::Status;

/// Company (tenant) metadata row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Company {
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_wizard_status: Option<String>,
    /// Owner who established the company
    pub created_by: Uuid,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request DTO for establishing a company
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Company name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: String,
    #[serde(default)]
    #[validate(url(message = "Logo must be a valid URL"))]
    pub logo: Option<String>,
}

/// Request DTO for editing company details
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateCompanyRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Company name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateCompanyLogoRequest {
    #[validate(url(message = "Logo must be a valid URL"))]
    pub logo: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetActiveCompanyRequest {
    pub company_id: Uuid,
}

/// A company as seen from one of its members.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct UserCompany {
    #[serde(flatten)]
    pub company: Company,
    pub user_type: super::UserType,
    pub member_status: Status,
}
