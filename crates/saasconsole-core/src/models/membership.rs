use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{LogModuleParams, Status, User, UserType};
use crate::keys;

/// Membership of a user in a company.
///
/// Profile fields are copied from the user row so member lists can be served
/// from one query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyUser {
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
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
    /// Denormalised so company-name uniqueness can be checked per user
    #[serde(default)]
    pub company_name: String,
    pub user_type: UserType,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// User who added this member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<Uuid>,
    #[serde(default)]
    pub search_key: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CompanyUser {
    /// Build a membership row for `user` in a company.
    pub fn for_user(
        user: &User,
        company_id: Uuid,
        company_name: &str,
        user_type: UserType,
        status: Status,
        handler: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            company_id,
            user_id: user.user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            job_title: user.job_title.clone(),
            contact_number: user.contact_number.clone(),
            display_photo: user.display_photo.clone(),
            company_name: company_name.to_string(),
            user_type,
            status,
            previous_status: None,
            deleted_at: None,
            handler,
            search_key: member_search_key(&user.first_name, &user.last_name, &user.email),
            created_at: now,
            updated_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }

    pub fn is_owner(&self) -> bool {
        self.user_type.is_owner()
    }

    /// Log entry naming this member.
    pub fn log_entry(&self) -> LogModuleParams {
        LogModuleParams::named(self.user_id, self.full_name())
    }
}

/// Search text of a member: "first last email", lowercased.
pub fn member_search_key(first_name: &str, last_name: &str, email: &str) -> String {
    keys::search_key([first_name, last_name, email])
}

/// Count of company members per status.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct MemberCounts {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub default: usize,
    pub inactive: usize,
    pub deleted: usize,
}

impl MemberCounts {
    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Active => self.active += 1,
            Status::Pending => self.pending += 1,
            Status::Default => self.default += 1,
            Status::Inactive => self.inactive += 1,
            Status::Deleted => self.deleted += 1,
            Status::Done | Status::Rejected => {}
        }
    }
}
