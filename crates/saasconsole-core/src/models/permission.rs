use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

macro_rules! permissions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A single capability that a role can grant inside a company.
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
        pub enum Permission {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Permission {
            /// Every permission, in display order.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $name,)+
                }
            }
        }

        impl FromStr for Permission {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($name => Ok(Permission::$variant),)+
                    other => Err(AppError::Unprocessable(format!("Unknown permission: {}", other))),
                }
            }
        }
    };
}

permissions! {
    EditCompany => "EDIT_COMPANY",
    RemoveCompany => "REMOVE_COMPANY",
    AddIntegration => "ADD_INTEGRATION",
    RemoveIntegration => "REMOVE_INTEGRATION",
    ConnectIntegration => "CONNECT_INTEGRATION",
    DisconnectIntegration => "DISCONNECT_INTEGRATION",
    AddSubIntegration => "ADD_SUB_INTEGRATION",
    AddCompanyMember => "ADD_COMPANY_MEMBER",
    EditCompanyMember => "EDIT_COMPANY_MEMBER",
    RemoveCompanyMember => "REMOVE_COMPANY_MEMBER",
    AddDepartment => "ADD_DEPARTMENT",
    EditDepartment => "EDIT_DEPARTMENT",
    RemoveDepartment => "REMOVE_DEPARTMENT",
    AddGroup => "ADD_GROUP",
    EditGroup => "EDIT_GROUP",
    RemoveGroup => "REMOVE_GROUP",
    CloneGroup => "CLONE_GROUP",
    MergeGroup => "MERGE_GROUP",
    BranchGroup => "BRANCH_GROUP",
    AddGroupMember => "ADD_GROUP_MEMBER",
    RemoveGroupMember => "REMOVE_GROUP_MEMBER",
    AddGroupIntegration => "ADD_GROUP_INTEGRATION",
    RemoveGroupIntegration => "REMOVE_GROUP_INTEGRATION",
    AddRole => "ADD_ROLE",
    EditRole => "EDIT_ROLE",
    RemoveRole => "REMOVE_ROLE",
    AssignRole => "ASSIGN_ROLE",
    UnassignRole => "UNASSIGN_ROLE",
    ManageBilling => "MANAGE_BILLING",
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Permission {
    /// Permissions granted by the premade department admin role.
    pub fn department_admin() -> Vec<Permission> {
        vec![
            Permission::AddDepartment,
            Permission::EditDepartment,
            Permission::RemoveDepartment,
            Permission::AddGroup,
            Permission::EditGroup,
            Permission::RemoveGroup,
            Permission::AddGroupMember,
            Permission::RemoveGroupMember,
        ]
    }

    /// Permissions granted by the premade group admin role.
    pub fn group_admin() -> Vec<Permission> {
        vec![
            Permission::EditGroup,
            Permission::CloneGroup,
            Permission::MergeGroup,
            Permission::BranchGroup,
            Permission::AddGroupMember,
            Permission::RemoveGroupMember,
            Permission::AddGroupIntegration,
            Permission::RemoveGroupIntegration,
        ]
    }
}
