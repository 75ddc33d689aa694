use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::Status;

/// What a deferred integration-account removal acts on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct JobData {
    pub email: String,
    #[serde(rename = "IntegrationID")]
    pub integration_id: Uuid,
    #[serde(default)]
    pub integration_account: String,
    pub number_of_days: u32,
}

/// Deferred removal of a user's account on one integration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    #[serde(rename = "JobID")]
    pub job_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    pub job_type: String,
    pub job_data: JobData,
    pub status: Status,
    pub run_at: DateTime<Utc>,
    #[serde(rename = "CurrentUserID")]
    pub current_user_id: Uuid,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Member listed on a deferred group-membership change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct JobUser {
    #[serde(rename = "UserID", alias = "user_id")]
    pub user_id: Uuid,
    #[serde(rename = "Email", alias = "email")]
    pub email: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CronJobType {
    AddGroupMembers,
    RemoveGroupMembers,
}

/// Deferred addition or removal of group members.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CronJob {
    #[serde(rename = "JobID")]
    pub job_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    #[serde(rename = "GroupID")]
    pub group_id: Uuid,
    pub job_type: CronJobType,
    pub users: Vec<JobUser>,
    pub status: Status,
    pub selected_date: DateTime<Utc>,
    pub number_of_days: u32,
    pub run_at: DateTime<Utc>,
    #[serde(rename = "CurrentUserID")]
    pub current_user_id: Uuid,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RemovalTarget {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub integration_account: String,
}

/// Request DTO for scheduling integration-account removals
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRemoveUserJobRequest {
    pub integration_id: Uuid,
    #[validate(range(min = 0, max = 365, message = "Number of days must be between 0 and 365"))]
    pub number_of_days: u32,
    #[validate(length(min = 1, message = "At least one user is required"), nested)]
    pub users: Vec<RemovalTarget>,
}

/// Request DTO for scheduling a group-membership change
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateCronJobRequest {
    pub group_id: Uuid,
    pub job_type: CronJobType,
    #[validate(range(min = 0, max = 365, message = "Number of days must be between 0 and 365"))]
    pub number_of_days: u32,
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub users: Vec<JobUser>,
}

/// Result of a scheduled-removal request
#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduledRemovals {
    pub jobs: Vec<Job>,
    pub skipped: Vec<String>,
}
