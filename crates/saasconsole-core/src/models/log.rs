use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Area of the console a log record belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    Company,
    User,
    Role,
    Group,
    Department,
    Integration,
}

/// Mutation described by a log record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    EstablishCompany,
    AddCompany,
    UpdateCompany,
    UpdateUser,
    AddCompanyMembers,
    RemoveCompanyMembers,
    RestoreCompanyMembers,
    PermanentlyRemoveCompanyMembers,
    RemoveCompanyMembersIntegrationAccess,
    AddGroup,
    UpdateGroup,
    #[serde(rename = "REMOVE_GROUP")]
    DeleteGroup,
    AddGroupMembers,
    RemoveGroupMembers,
    AddDepartment,
    UpdateDepartment,
    #[serde(rename = "REMOVE_DEPARTMENT")]
    DeleteDepartment,
    ConnectIntegration,
    DisconnectIntegration,
    AddRole,
    UpdateRole,
    #[serde(rename = "REMOVE_ROLE")]
    DeleteRole,
    AssignRole,
    UnassignRole,
}

impl LogAction {
    /// Wire name, as stored in the `LogAction` attribute.
    pub fn as_str(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Name/id pair kept on a log entry so it stays readable after the entity is gone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LogTemp {
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
}

/// Before/after snapshot of one entity touched by a mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LogModuleParams {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub old: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub new: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<LogTemp>,
}

impl LogModuleParams {
    pub fn id(id: impl ToString) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn named(id: impl ToString, name: impl Into<String>) -> Self {
        let id = id.to_string();
        Self {
            id: Some(id.clone()),
            temp: Some(LogTemp {
                name: name.into(),
                id,
            }),
            ..Default::default()
        }
    }

    pub fn changed<T: Serialize>(id: impl ToString, old: &T, new: &T) -> Self {
        Self {
            id: Some(id.to_string()),
            old: serde_json::to_value(old).ok(),
            new: serde_json::to_value(new).ok(),
            temp: None,
        }
    }
}

/// Loosely-typed payload of a log record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LogInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<LogModuleParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<LogModuleParams>,
}

/// Immutable audit record of one mutation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    #[serde(rename = "LogID")]
    pub log_id: Uuid,
    #[serde(rename = "CompanyID")]
    pub company_id: Uuid,
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    pub log_type: LogType,
    pub log_action: LogAction,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    pub log_info: LogInfo,
}
