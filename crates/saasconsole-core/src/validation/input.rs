//! Request-level checks that `validator` derive rules cannot express.

use regex::Regex;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Permission, Status};

/// Parse permission names, rejecting unknown ones and dropping repeats.
pub fn parse_permissions(names: &[String]) -> Result<Vec<Permission>, AppError> {
    let mut permissions = Vec::with_capacity(names.len());
    for name in names {
        let permission: Permission = name.parse()?;
        if !permissions.contains(&permission) {
            permissions.push(permission);
        }
    }
    Ok(permissions)
}

/// Parse a status a membership may be moved to.
pub fn parse_status(raw: &str) -> Result<Status, AppError> {
    let status: Status = raw.parse()?;
    if !status.is_membership_status() {
        return Err(AppError::InvalidStatus(raw.to_string()));
    }
    Ok(status)
}

/// Bulk operations require at least one target.
pub fn require_ids(ids: &[Uuid], what: &str) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::Unprocessable(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Integration slugs are lowercase words joined by dashes.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    let pattern = Regex::new(r"^[a-z0-9][a-z0-9-]{0,99}$")
        .map_err(|e| AppError::Internal(format!("Failed to compile slug regex: {}", e)))?;

    if pattern.is_match(slug) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Invalid integration slug '{}': use lowercase letters, digits and dashes",
            slug
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_are_deduplicated() {
        let parsed = parse_permissions(&[
            "ADD_ROLE".to_string(),
            "add_role".to_string(),
            "EDIT_GROUP".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed, vec![Permission::AddRole, Permission::EditGroup]);
    }

    #[test]
    fn unknown_permission_is_unprocessable() {
        let err = parse_permissions(&["FLY".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)));
    }

    #[test]
    fn job_statuses_are_not_membership_statuses() {
        assert!(parse_status("inactive").is_ok());
        assert!(matches!(
            parse_status("DONE"),
            Err(AppError::InvalidStatus(_))
        ));
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert!(matches!(
            require_ids(&[], "user_ids"),
            Err(AppError::Unprocessable(_))
        ));
    }

    #[test]
    fn slugs() {
        assert!(validate_slug("google-admin").is_ok());
        assert!(validate_slug("Google Admin").is_err());
        assert!(validate_slug("-leading").is_err());
    }
}
