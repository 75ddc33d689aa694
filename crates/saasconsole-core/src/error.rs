//! Error types module
//!
//! All failures in the console are unified under `AppError`. Each variant describes
//! its own HTTP presentation through the `ErrorMetadata` trait, so the API layer never
//! needs to know which numeric status a business rule maps to.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like conflicts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "COMPANY_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Company ID does not exist: {0}")]
    CompanyNotFound(String),

    #[error("User ID does not exist: {0}")]
    UserNotFound(String),

    #[error("Email does not exist: {0}")]
    EmailNotFound(String),

    #[error("Department ID does not exist: {0}")]
    DepartmentNotFound(String),

    #[error("Group ID does not exist: {0}")]
    GroupNotFound(String),

    #[error("Role ID does not exist: {0}")]
    RoleNotFound(String),

    #[error("User already exists in this company: {0}")]
    UserAlreadyInCompany(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Duplicate email addresses: {}", .0.join(", "))]
    DuplicateEmailAddresses(Vec<String>),

    #[error("Company already exists: {0}")]
    CompanyAlreadyExists(String),

    #[error("Department already exists in this company: {0}")]
    DepartmentAlreadyExists(String),

    #[error("Group name already exists: {0}")]
    GroupNameAlreadyExists(String),

    #[error("Role name already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("Request already submitted")]
    RequestAlreadySubmitted,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Authorization header not found")]
    MissingAuthorizationHeader,

    #[error("Token format is invalid")]
    InvalidTokenFormat,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Store(_) => (
            500,
            "STORE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::CompanyNotFound(_) => (
            404,
            "COMPANY_NOT_FOUND",
            false,
            Some("Verify the company ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::UserNotFound(_) => (
            404,
            "USER_NOT_FOUND",
            false,
            Some("Verify the user ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::EmailNotFound(_) => (
            404,
            "EMAIL_NOT_FOUND",
            false,
            Some("Verify the email address"),
            false,
            LogLevel::Debug,
        ),
        AppError::DepartmentNotFound(_) => (
            404,
            "DEPARTMENT_NOT_FOUND",
            false,
            Some("Verify the department ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::GroupNotFound(_) => (
            404,
            "GROUP_NOT_FOUND",
            false,
            Some("Verify the group ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::RoleNotFound(_) => (
            404,
            "ROLE_NOT_FOUND",
            false,
            Some("Verify the role ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::UserAlreadyInCompany(_) => (
            409,
            "USER_ALREADY_IN_COMPANY",
            false,
            Some("The user is already a member of this company"),
            false,
            LogLevel::Debug,
        ),
        AppError::EmailAlreadyExists(_) => (
            409,
            "EMAIL_ALREADY_EXISTS",
            false,
            Some("Use a different email address"),
            false,
            LogLevel::Debug,
        ),
        AppError::DuplicateEmailAddresses(_) => (
            409,
            "DUPLICATE_EMAIL_ADDRESSES",
            false,
            Some("Remove repeated email addresses from the request"),
            false,
            LogLevel::Debug,
        ),
        AppError::CompanyAlreadyExists(_) => (
            409,
            "COMPANY_ALREADY_EXISTS",
            false,
            Some("Choose a different company name"),
            false,
            LogLevel::Debug,
        ),
        AppError::DepartmentAlreadyExists(_) => (
            409,
            "DEPARTMENT_ALREADY_EXISTS",
            false,
            Some("Choose a different department name"),
            false,
            LogLevel::Debug,
        ),
        AppError::GroupNameAlreadyExists(_) => (
            409,
            "GROUP_NAME_ALREADY_EXISTS",
            false,
            Some("Choose a different group name"),
            false,
            LogLevel::Debug,
        ),
        AppError::RoleAlreadyExists(_) => (
            409,
            "ROLE_ALREADY_EXISTS",
            false,
            Some("Choose a different role name"),
            false,
            LogLevel::Debug,
        ),
        AppError::RequestAlreadySubmitted => (
            409,
            "REQUEST_ALREADY_SUBMITTED",
            false,
            Some("Wait for the pending request to be processed"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidRole(_) => (
            422,
            "INVALID_ROLE",
            false,
            Some("Use one of the company's roles"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidStatus(_) => (
            422,
            "INVALID_STATUS",
            false,
            Some("Use one of PENDING, ACTIVE, DEFAULT, INACTIVE, DELETED"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unprocessable(_) => (
            422,
            "UNPROCESSABLE_ENTITY",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::MissingAuthorizationHeader => (
            401,
            "MISSING_AUTHORIZATION_HEADER",
            false,
            Some("Send an Authorization: Bearer <token> header"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidTokenFormat => (
            401,
            "INVALID_TOKEN_FORMAT",
            false,
            Some("Send an Authorization: Bearer <token> header"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidToken(_) => (
            401,
            "INVALID_TOKEN",
            false,
            Some("Sign in again to obtain a fresh token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Ask a company admin for the required permission"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Store(_) => "Store",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::CompanyNotFound(_) => "CompanyNotFound",
            AppError::UserNotFound(_) => "UserNotFound",
            AppError::EmailNotFound(_) => "EmailNotFound",
            AppError::DepartmentNotFound(_) => "DepartmentNotFound",
            AppError::GroupNotFound(_) => "GroupNotFound",
            AppError::RoleNotFound(_) => "RoleNotFound",
            AppError::UserAlreadyInCompany(_) => "UserAlreadyInCompany",
            AppError::EmailAlreadyExists(_) => "EmailAlreadyExists",
            AppError::DuplicateEmailAddresses(_) => "DuplicateEmailAddresses",
            AppError::CompanyAlreadyExists(_) => "CompanyAlreadyExists",
            AppError::DepartmentAlreadyExists(_) => "DepartmentAlreadyExists",
            AppError::GroupNameAlreadyExists(_) => "GroupNameAlreadyExists",
            AppError::RoleAlreadyExists(_) => "RoleAlreadyExists",
            AppError::RequestAlreadySubmitted => "RequestAlreadySubmitted",
            AppError::InvalidRole(_) => "InvalidRole",
            AppError::InvalidStatus(_) => "InvalidStatus",
            AppError::Unprocessable(_) => "Unprocessable",
            AppError::MissingAuthorizationHeader => "MissingAuthorizationHeader",
            AppError::InvalidTokenFormat => "InvalidTokenFormat",
            AppError::InvalidToken(_) => "InvalidToken",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Store(_) => "Failed to access data store".to_string(),
            AppError::InvalidInput(ref msg)
            | AppError::BadRequest(ref msg)
            | AppError::NotFound(ref msg)
            | AppError::InvalidToken(ref msg)
            | AppError::Forbidden(ref msg)
            | AppError::Unprocessable(ref msg) => msg.clone(),
            AppError::CompanyNotFound(_) => "Company ID does not exist.".to_string(),
            AppError::UserNotFound(_) => "User ID does not exist.".to_string(),
            AppError::EmailNotFound(_) => "Email does not exist.".to_string(),
            AppError::DepartmentNotFound(_) => "Department ID does not exist.".to_string(),
            AppError::GroupNotFound(_) => "Group ID does not exist.".to_string(),
            AppError::RoleNotFound(_) => "Role ID does not exist.".to_string(),
            AppError::UserAlreadyInCompany(ref email) => {
                format!("User {} already exists in this company.", email)
            }
            AppError::EmailAlreadyExists(_) => "Email already exists.".to_string(),
            AppError::DuplicateEmailAddresses(ref emails) => {
                format!("Duplicate email addresses: {}", emails.join(", "))
            }
            AppError::CompanyAlreadyExists(_) => "Company already exists.".to_string(),
            AppError::DepartmentAlreadyExists(_) => {
                "Department already exists in this company.".to_string()
            }
            AppError::GroupNameAlreadyExists(_) => "Group name already exists.".to_string(),
            AppError::RoleAlreadyExists(_) => "Role name already exists.".to_string(),
            AppError::RequestAlreadySubmitted => "Request already submitted.".to_string(),
            AppError::InvalidRole(ref msg) => format!("Invalid role: {}", msg),
            AppError::InvalidStatus(ref msg) => format!("Invalid status: {}", msg),
            AppError::MissingAuthorizationHeader => "Authorization header not found.".to_string(),
            AppError::InvalidTokenFormat => "Token format is invalid.".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_store() {
        let err = AppError::Store("throttled".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "STORE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access data store");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_company_not_found() {
        let err = AppError::CompanyNotFound("abc".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "COMPANY_NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Company ID does not exist.");
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_conflicts_map_to_409() {
        for err in [
            AppError::UserAlreadyInCompany("a@b.c".into()),
            AppError::EmailAlreadyExists("a@b.c".into()),
            AppError::CompanyAlreadyExists("Acme".into()),
            AppError::GroupNameAlreadyExists("Ops".into()),
            AppError::RequestAlreadySubmitted,
            AppError::DuplicateEmailAddresses(vec!["a@b.c".into()]),
        ] {
            assert_eq!(err.http_status_code(), 409, "{}", err.error_type());
        }
    }

    #[test]
    fn test_auth_header_errors() {
        let missing = AppError::MissingAuthorizationHeader;
        assert_eq!(missing.http_status_code(), 401);
        assert_eq!(missing.error_code(), "MISSING_AUTHORIZATION_HEADER");

        let format = AppError::InvalidTokenFormat;
        assert_eq!(format.http_status_code(), 401);
        assert_eq!(format.error_code(), "INVALID_TOKEN_FORMAT");
    }

    #[test]
    fn test_duplicate_emails_message_lists_addresses() {
        let err = AppError::DuplicateEmailAddresses(vec!["a@x.io".into(), "b@x.io".into()]);
        assert!(err.client_message().contains("a@x.io"));
        assert!(err.client_message().contains("b@x.io"));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        let details = err.detailed_message();
        assert!(details.contains("Caused by"));
    }
}
