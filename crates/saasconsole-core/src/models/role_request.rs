use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Status;

/// A member's request for additional roles, awaiting a company admin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PendingRoleRequest {
    #[serde(rename = "RequestID")]
    pub request_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    #[serde(rename = "RoleIDs")]
    pub role_ids: Vec<Uuid>,
    #[serde(default)]
    pub message: String,
    pub status: Status,
    /// Notifications sent to admins for this request
    #[serde(rename = "NotificationIDs", default)]
    pub notification_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handled_by: Option<Uuid>,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
