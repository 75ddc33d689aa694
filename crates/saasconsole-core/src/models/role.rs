use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LogModuleParams, Permission, Status};
use crate::constants::{
    ROLE_ID_COMPANY_ADMIN, ROLE_ID_DEPARTMENT_ADMIN, ROLE_ID_GROUP_ADMIN, ROLE_NAME_COMPANY_ADMIN,
    ROLE_NAME_DEPARTMENT_ADMIN, ROLE_NAME_GROUP_ADMIN,
};

/// Named permission set.
///
/// Custom roles belong to one company. Premade roles have no company and are
/// available everywhere.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    #[serde(rename = "RoleID")]
    pub role_id: Uuid,
    #[serde(rename = "CompanyID", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub premade: bool,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub search_key: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is_company_admin(&self) -> bool {
        self.role_id.to_string() == ROLE_ID_COMPANY_ADMIN
    }

    pub fn log_entry(&self) -> LogModuleParams {
        LogModuleParams::named(self.role_id, self.name.clone())
    }
}

fn premade(id: &str, name: &str, description: &str, permissions: Vec<Permission>) -> Role {
    Role {
        role_id: Uuid::parse_str(id).unwrap_or_else(|_| Uuid::nil()),
        company_id: None,
        name: name.to_string(),
        description: description.to_string(),
        permissions,
        premade: true,
        status: Status::Active,
        created_by: None,
        search_key: name.to_lowercase(),
        created_at: DateTime::<Utc>::default(),
        updated_at: None,
    }
}

/// Roles every company has without storing them.
pub fn premade_roles() -> Vec<Role> {
    vec![
        premade(
            ROLE_ID_COMPANY_ADMIN,
            ROLE_NAME_COMPANY_ADMIN,
            "Full access to the company",
            Permission::ALL.to_vec(),
        ),
        premade(
            ROLE_ID_DEPARTMENT_ADMIN,
            ROLE_NAME_DEPARTMENT_ADMIN,
            "Manage departments and their groups",
            Permission::department_admin(),
        ),
        premade(
            ROLE_ID_GROUP_ADMIN,
            ROLE_NAME_GROUP_ADMIN,
            "Manage groups and their members",
            Permission::group_admin(),
        ),
    ]
}

pub fn premade_role(role_id: Uuid) -> Option<Role> {
    premade_roles().into_iter().find(|r| r.role_id == role_id)
}

pub fn company_admin_role_id() -> Uuid {
    Uuid::parse_str(ROLE_ID_COMPANY_ADMIN).unwrap_or_else(|_| Uuid::nil())
}

/// Assignment of a role to a user within a company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct UserRole {
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    #[serde(rename = "RoleID")]
    pub role_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<Uuid>,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Role with the number of members holding it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct RoleWithUsage {
    #[serde(flatten)]
    pub role: Role,
    pub users_count: usize,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Role name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Role name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Assign or unassign every listed role to every listed user
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AssignRolesRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub user_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "At least one role is required"))]
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RequestRolesRequest {
    #[validate(length(min = 1, message = "At least one role is required"))]
    pub role_ids: Vec<Uuid>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Message is too long"))]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_admin_grants_everything() {
        let admin = premade_role(company_admin_role_id()).unwrap();
        assert!(admin.is_company_admin());
        for p in Permission::ALL {
            assert!(admin.grants(*p));
        }
    }

    #[test]
    fn group_admin_cannot_remove_members_from_company() {
        let roles = premade_roles();
        let group_admin = roles
            .iter()
            .find(|r| r.name == ROLE_NAME_GROUP_ADMIN)
            .unwrap();
        assert!(group_admin.grants(Permission::AddGroupMember));
        assert!(!group_admin.grants(Permission::RemoveCompanyMember));
    }
}
