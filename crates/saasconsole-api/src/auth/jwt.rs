//! HS256 session tokens
//!
//! Tokens carry the user id in `sub` and the company the session was opened
//! for in `company_id`.

use crate::auth::models::JwtClaims;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use saasconsole_core::AppError;
use uuid::Uuid;

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a token for `user_id`, scoped to `company_id` when given.
    pub fn issue(&self, user_id: Uuid, company_id: Option<Uuid>) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id,
            company_id,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate signature and expiry, returning the claims.
    pub fn validate(&self, token: &str) -> Result<JwtClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::InvalidToken("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::InvalidToken("Token signature is invalid".to_string())
                }
                _ => AppError::InvalidToken(format!("Invalid token: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issue_then_validate() {
        let jwt = JwtService::new(SECRET, 1);
        let user = Uuid::new_v4();
        let company = Uuid::new_v4();
        let token = jwt.issue(user, Some(company)).unwrap();

        let claims = jwt.validate(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.company_id, Some(company));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = JwtService::new(SECRET, -1);
        let token = jwt.issue(Uuid::new_v4(), None).unwrap();
        let err = jwt.validate(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(ref m) if m.contains("expired")));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let token = JwtService::new(SECRET, 1)
            .issue(Uuid::new_v4(), None)
            .unwrap();
        let other = JwtService::new("ffffffffffffffffffffffffffffffff", 1);
        assert!(matches!(
            other.validate(&token),
            Err(AppError::InvalidToken(_))
        ));
        assert!(other.validate("not-a-jwt").is_err());
    }
}
