use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

/// Lifecycle status shared by users, memberships, jobs and requests.
///
/// Membership rows only ever carry the first five; `Done` and `Rejected`
/// close out jobs and approval requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Active,
    Default,
    Inactive,
    Deleted,
    Done,
    Rejected,
}

impl Status {
    /// Statuses a membership may be set to.
    pub const MEMBERSHIP: [Status; 5] = [
        Status::Pending,
        Status::Active,
        Status::Default,
        Status::Inactive,
        Status::Deleted,
    ];

    /// Memberships in these statuses block a second invitation of the same email.
    pub const PRESENT: [Status; 3] = [Status::Active, Status::Pending, Status::Default];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Active => "ACTIVE",
            Status::Default => "DEFAULT",
            Status::Inactive => "INACTIVE",
            Status::Deleted => "DELETED",
            Status::Done => "DONE",
            Status::Rejected => "REJECTED",
        }
    }

    pub fn is_membership_status(&self) -> bool {
        Self::MEMBERSHIP.contains(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Status::Pending),
            "ACTIVE" => Ok(Status::Active),
            "DEFAULT" => Ok(Status::Default),
            "INACTIVE" => Ok(Status::Inactive),
            "DELETED" => Ok(Status::Deleted),
            "DONE" => Ok(Status::Done),
            "REJECTED" => Ok(Status::Rejected),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

/// Role of a member inside a company, independent of assigned roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    CompanyOwner,
    CompanyMember,
}

impl UserType {
    pub fn is_owner(&self) -> bool {
        matches!(self, UserType::CompanyOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("active".parse::<Status>().unwrap(), Status::Active);
        assert_eq!(" Deleted ".parse::<Status>().unwrap(), Status::Deleted);
    }

    #[test]
    fn unknown_status_is_invalid_status_error() {
        let err = "ARCHIVED".parse::<Status>().unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(ref s) if s == "ARCHIVED"));
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&UserType::CompanyOwner).unwrap();
        assert_eq!(json, "\"COMPANY_OWNER\"");
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"PENDING\"");
    }
}
