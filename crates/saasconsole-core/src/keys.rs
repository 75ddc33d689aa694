//! Composite key builders
//!
//! Partition and sort keys are `<PREFIX><id>` strings. Keeping every key format in
//! one place means the repositories never concatenate prefixes by hand.

use chrono::{DateTime, Utc};

use crate::constants::*;
use crate::error::AppError;

pub fn user(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_USER, id)
}

/// Sort key of the global user row.
pub fn user_email(email: &str) -> String {
    format!("{}{}", PREFIX_USER, email)
}

pub fn company(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_COMPANY, id)
}

pub fn role(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_ROLE, id)
}

pub fn group(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_GROUP, id)
}

pub fn department(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_DEPARTMENT, id)
}

pub fn log(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_LOG, id)
}

pub fn notification(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_NOTIFICATION, id)
}

pub fn role_request(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_ROLE_REQUEST, id)
}

pub fn integration(id: impl std::fmt::Display) -> String {
    format!("{}{}", PREFIX_INTEGRATION, id)
}

/// Sort key of a user-role assignment: `ROLE#<rid>#COMPANY#<cid>`.
pub fn user_role(role_id: impl std::fmt::Display, company_id: impl std::fmt::Display) -> String {
    format!("{}{}#{}{}", PREFIX_ROLE, role_id, PREFIX_COMPANY, company_id)
}

/// Partition key of a scheduled job: `JOB#<unix seconds of the run date at 00:00 UTC>#<id>`.
pub fn job_partition(run_at: DateTime<Utc>, id: impl std::fmt::Display) -> String {
    format!("{}{}#{}", PREFIX_JOB, run_date_timestamp(run_at), id)
}

pub fn job_sort(job_type: &str) -> String {
    format!("{}{}", PREFIX_JOB, job_type)
}

/// Midnight (UTC) of the day `run_at` falls on, as unix seconds.
pub fn run_date_timestamp(run_at: DateTime<Utc>) -> i64 {
    run_at
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or_else(|| run_at.timestamp())
}

/// Parse the run date out of a job partition key.
pub fn job_run_timestamp(partition: &str) -> Option<i64> {
    partition
        .strip_prefix(PREFIX_JOB)?
        .split('#')
        .next()?
        .parse()
        .ok()
}

/// Strip `prefix` from `key`, returning the id part.
pub fn strip_prefix<'a>(prefix: &str, key: &'a str) -> Result<&'a str, AppError> {
    key.strip_prefix(prefix).ok_or_else(|| {
        AppError::Internal(format!("key '{}' does not start with '{}'", key, prefix))
    })
}

/// Lowercased, space-joined text used for case-insensitive search.
pub fn search_key<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `GSI_SK` of a membership row: members sort by their search key.
pub fn member_sort_key(search_key: &str) -> String {
    format!("{}{}", PREFIX_USER, search_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn builds_prefixed_keys() {
        let id = Uuid::nil();
        assert_eq!(company(id), format!("COMPANY#{}", id));
        assert_eq!(user("abc"), "USER#abc");
        assert_eq!(user_role("r1", "c1"), "ROLE#r1#COMPANY#c1");
    }

    #[test]
    fn job_partition_uses_midnight_of_run_date() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 17, 45, 12).unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let key = job_partition(run_at, "job-1");
        assert_eq!(key, format!("JOB#{}#job-1", midnight.timestamp()));
        assert_eq!(job_run_timestamp(&key), Some(midnight.timestamp()));
    }

    #[test]
    fn strip_prefix_rejects_foreign_keys() {
        assert_eq!(strip_prefix(PREFIX_USER, "USER#42").unwrap(), "42");
        assert!(strip_prefix(PREFIX_USER, "COMPANY#42").is_err());
    }

    #[test]
    fn search_key_is_lowercase_and_skips_blanks() {
        assert_eq!(
            search_key(["Ada", " ", "Lovelace", "ADA@Example.com"]),
            "ada lovelace ada@example.com"
        );
    }
}
