//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that
//! converts into `AppError` can be propagated with `?` and renders with the
//! shared `ErrorResponse` body.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use saasconsole_core::{AppError, ErrorMetadata, LogLevel};
use saasconsole_infra::ErrorResponse;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Wrapper type for AppError to implement IntoResponse.
/// The orphan rule forbids implementing axum's trait for the core type directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        let body_text = rejection.body_text();
        let message = if body_text.contains("expected a formatted UUID") {
            "Invalid request body: ids such as user_ids must be UUID strings".to_string()
        } else {
            format!("Invalid request body: {}", body_text)
        };
        HttpAppError(AppError::InvalidInput(message))
    }
}

/// JSON body extractor that also runs the body's `validator` rules.
///
/// Deserialization and validation failures both become 400 responses in the
/// standard error shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        inner.validate().map_err(AppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = ?error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

/// Render `err` as a response body; production hides the internal details of every error.
pub(crate) fn error_body(err: &AppError, is_production: bool) -> ErrorResponse {
    let mut body = ErrorResponse::from_app_error(err, true);
    if is_production {
        body.details = None;
        body.error_type = None;
    }
    body
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let err = self.0;
        log_error(&err);

        let status =
            StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = error_body(&err, is_production_env());

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Body {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[test]
    fn test_status_follows_error_metadata() {
        let response = HttpAppError(AppError::GroupNotFound("g1".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = HttpAppError(AppError::RequestAlreadySubmitted).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response =
            HttpAppError(AppError::InvalidStatus("ARCHIVED".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_production_body_hides_details() {
        let err = AppError::CompanyAlreadyExists("Acme".into());
        let dev = error_body(&err, false);
        assert!(dev.details.is_some());
        assert_eq!(dev.code, "COMPANY_ALREADY_EXISTS");

        let prod = error_body(&err, true);
        assert!(prod.details.is_none());
        assert!(prod.error_type.is_none());
        assert_eq!(prod.code, "COMPANY_ALREADY_EXISTS");
    }

    #[test]
    fn test_validation_errors_are_invalid_input() {
        let body = Body {
            name: String::new(),
        };
        let err = AppError::from(body.validate().unwrap_err());
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(err.http_status_code(), 400);
    }
}
