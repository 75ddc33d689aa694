use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Status;

/// Payload carried by a notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationContent {
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "RequesterID", default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<Uuid>,
    #[serde(rename = "RequestID", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(rename = "RoleIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub role_ids: Vec<Uuid>,
}

/// Message shown to one user, optionally scoped to a company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    #[serde(rename = "NotificationID")]
    pub notification_id: Uuid,
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    pub notification_type: String,
    pub content: NotificationContent,
    #[serde(default)]
    pub is_seen: bool,
    #[serde(default)]
    pub is_read: bool,
    /// For approval notifications: PENDING until accepted (DONE) or rejected
    pub status: Status,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        company_id: Uuid,
        notification_type: &str,
        content: NotificationContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            notification_id: Uuid::now_v7(),
            user_id,
            company_id,
            notification_type: notification_type.to_string(),
            content,
            is_seen: false,
            is_read: false,
            status: Status::Active,
            created_at: now,
            updated_at: None,
        }
    }
}
