//! HTTP error response body
//!
//! `IntoResponse` for `AppError` lives in the api crate: the orphan rule forbids
//! implementing axum's trait for a core type here.

use saasconsole_core::{AppError, ErrorMetadata};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response format for HTTP APIs
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code, e.g. `COMPANY_NOT_FOUND`
    pub code: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    /// Build the body for `err`; sensitive errors lose their details when `hide_sensitive` is set.
    pub fn from_app_error(err: &AppError, hide_sensitive: bool) -> Self {
        let show_details = !(hide_sensitive && err.is_sensitive());
        Self {
            error: err.client_message(),
            details: show_details.then(|| err.detailed_message()),
            error_type: show_details.then(|| err.error_type().to_string()),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_details_hidden_in_production() {
        let err = AppError::Store("table missing".into());
        let body = ErrorResponse::from_app_error(&err, true);
        assert_eq!(body.error, "Failed to access data store");
        assert_eq!(body.code, "STORE_ERROR");
        assert!(body.details.is_none());

        let dev = ErrorResponse::from_app_error(&err, false);
        assert!(dev.details.unwrap().contains("table missing"));
    }

    #[test]
    fn test_business_errors_keep_details() {
        let err = AppError::GroupNameAlreadyExists("Ops".into());
        let body = ErrorResponse::from_app_error(&err, true);
        assert_eq!(body.code, "GROUP_NAME_ALREADY_EXISTS");
        assert_eq!(body.error_type.as_deref(), Some("GroupNameAlreadyExists"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["recoverable"], false);
    }
}
