use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LogModuleParams, Status};

/// Third-party service connected to a company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Integration {
    #[serde(rename = "IntegrationID")]
    pub integration_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    /// Provider identifier such as `github`, `google-admin` or `jira`
    pub slug: String,
    pub name: String,
    pub status: Status,
    pub connected_by: Uuid,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Integration {
    pub fn log_entry(&self) -> LogModuleParams {
        LogModuleParams::named(self.integration_id, self.name.clone())
    }

    /// Job type used to schedule removal of a user's account on this integration.
    pub fn removal_job_type(&self) -> String {
        format!(
            "DELETE_{}{}",
            self.slug.to_uppercase().replace('-', "_"),
            crate::constants::JOB_DELETE_ACCOUNT_SUFFIX
        )
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConnectIntegrationRequest {
    #[validate(length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"))]
    pub slug: String,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_job_type_follows_slug() {
        let integration = Integration {
            integration_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            slug: "google-admin".to_string(),
            name: "Google Admin".to_string(),
            status: Status::Active,
            connected_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        assert_eq!(integration.removal_job_type(), "DELETE_GOOGLE_ADMIN_ACCOUNT");
    }
}
