//! DynamoDB table schema
//!
//! ```text
//! Table: saasconsole (configurable)
//!
//! Primary key:
//!   - PK (String, partition key)  e.g. "COMPANY#<id>", "USER#<id>"
//!   - SK (String, sort key)       e.g. "USER#<id>", "ROLE#<rid>#COMPANY#<cid>"
//!
//! Global secondary indexes (projection ALL):
//!   - InvertedIndex  SK        / PK
//!   - GetUsers       PK        / GSI_SK
//!   - GetRoles       Type      / SearchKey
//!   - GetLogs        CompanyID / CreatedAt
//! ```

use super::IndexName;
use saasconsole_core::constants::{
    ATTR_COMPANY_ID, ATTR_CREATED_AT, ATTR_GSI_SK, ATTR_PK, ATTR_SEARCH_KEY, ATTR_SK, ATTR_TYPE,
};

/// Attributes used in a key schema; all are strings.
pub const KEY_ATTRIBUTES: [&str; 7] = [
    ATTR_PK,
    ATTR_SK,
    ATTR_GSI_SK,
    ATTR_TYPE,
    ATTR_SEARCH_KEY,
    ATTR_COMPANY_ID,
    ATTR_CREATED_AT,
];

pub const INDEXES: [IndexName; 4] = IndexName::ALL;

/// Placeholder names used in expressions, so reserved words such as `Status` and
/// `Type` never appear verbatim.
pub fn name_placeholder(prefix: &str, n: usize) -> String {
    format!("#{}{}", prefix, n)
}

pub fn value_placeholder(prefix: &str, n: usize) -> String {
    format!(":{}{}", prefix, n)
}
