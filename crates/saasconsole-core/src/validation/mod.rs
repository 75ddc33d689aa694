//! Validation modules

pub mod email;
pub mod input;

pub use email::{duplicate_emails, normalize_email, unique_by_email};
pub use input::{parse_permissions, parse_status, require_ids, validate_slug};
