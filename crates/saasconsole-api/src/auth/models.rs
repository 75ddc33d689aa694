use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use saasconsole_core::models::User;
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated caller, stored in request extensions by the auth middleware
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
    /// Active company: the user's stored pointer, else the token's claim
    pub company_id: Option<Uuid>,
}

impl SessionContext {
    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    /// The active company, required by every company-scoped endpoint.
    pub fn company(&self) -> Result<Uuid, AppError> {
        self.company_id
            .ok_or_else(|| AppError::Unprocessable("No active company selected".to_string()))
    }
}

// Read straight from the request parts so handlers can take the context by value
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Missing session context".to_string(),
                        details: None,
                        error_type: None,
                        code: "MISSING_SESSION_CONTEXT".to_string(),
                        recoverable: false,
                        suggested_action: Some("Check the authentication token".to_string()),
                    }),
                )
            })
    }
}
