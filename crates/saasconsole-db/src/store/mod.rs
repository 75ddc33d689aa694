//! Single-table store abstraction
//!
//! Every console entity is a row in one table addressed by a `PK`/`SK` pair.
//! Rows are plain attribute maps; the repositories turn them into models.
//! Backends implement [`ItemStore`] and must agree on query semantics, so the
//! in-memory backend used by the tests behaves like the DynamoDB one.

pub mod cursor;
#[cfg(feature = "store-dynamodb")]
pub mod dynamo;
pub mod factory;
pub mod memory;
#[cfg(feature = "store-dynamodb")]
pub mod schema;

use async_trait::async_trait;
use saasconsole_core::constants::{
    ATTR_COMPANY_ID, ATTR_CREATED_AT, ATTR_GSI_SK, ATTR_PK, ATTR_SEARCH_KEY, ATTR_SK, ATTR_TYPE,
    INDEX_GET_LOGS, INDEX_GET_ROLES, INDEX_GET_USERS, INDEX_INVERTED,
};
use saasconsole_core::{AppError, StoreBackend};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A stored row: attribute name to value.
pub type Item = serde_json::Map<String, Value>;

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Condition check failed: {0}")]
    ConditionFailed(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidCursor(msg) => AppError::BadRequest(format!("Invalid cursor: {}", msg)),
            other => AppError::Store(other.to_string()),
        }
    }
}

/// Primary key of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Read the primary key out of a row.
    pub fn of(item: &Item) -> StoreResult<Self> {
        let pk = string_attr(item, ATTR_PK)
            .ok_or_else(|| StoreError::InvalidItem("row has no PK".to_string()))?;
        let sk = string_attr(item, ATTR_SK)
            .ok_or_else(|| StoreError::InvalidItem("row has no SK".to_string()))?;
        Ok(Self::new(pk, sk))
    }
}

/// Secondary indexes of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexName {
    /// `SK` → `PK`: every company of a user, every member of a group
    Inverted,
    /// `PK` → `GSI_SK`: members of a company ordered by search key
    GetUsers,
    /// `Type` → `SearchKey`: rows of one entity type
    GetRoles,
    /// `CompanyID` → `CreatedAt`: audit log of a company
    GetLogs,
}

impl IndexName {
    pub const ALL: [IndexName; 4] = [
        IndexName::Inverted,
        IndexName::GetUsers,
        IndexName::GetRoles,
        IndexName::GetLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::Inverted => INDEX_INVERTED,
            IndexName::GetUsers => INDEX_GET_USERS,
            IndexName::GetRoles => INDEX_GET_ROLES,
            IndexName::GetLogs => INDEX_GET_LOGS,
        }
    }

    pub fn partition_attr(&self) -> &'static str {
        match self {
            IndexName::Inverted => ATTR_SK,
            IndexName::GetUsers => ATTR_PK,
            IndexName::GetRoles => ATTR_TYPE,
            IndexName::GetLogs => ATTR_COMPANY_ID,
        }
    }

    pub fn sort_attr(&self) -> &'static str {
        match self {
            IndexName::Inverted => ATTR_PK,
            IndexName::GetUsers => ATTR_GSI_SK,
            IndexName::GetRoles => ATTR_SEARCH_KEY,
            IndexName::GetLogs => ATTR_CREATED_AT,
        }
    }
}

/// Condition on the sort attribute of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SortCondition {
    Eq(String),
    BeginsWith(String),
    LessOrEqual(String),
}

impl SortCondition {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            SortCondition::Eq(expected) => value == expected,
            SortCondition::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
            SortCondition::LessOrEqual(bound) => value <= bound.as_str(),
        }
    }
}

/// Attribute filter applied to rows after the key condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Substring match on a string attribute
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attr: String,
    pub op: FilterOp,
}

impl Filter {
    /// A missing attribute only satisfies `Ne` and `NotIn`.
    pub fn matches(&self, item: &Item) -> bool {
        let value = item.get(&self.attr);
        match (&self.op, value) {
            (FilterOp::Eq(expected), Some(v)) => v == expected,
            (FilterOp::Ne(expected), Some(v)) => v != expected,
            (FilterOp::Ne(_), None) => true,
            (FilterOp::In(values), Some(v)) => values.contains(v),
            (FilterOp::NotIn(values), Some(v)) => !values.contains(v),
            (FilterOp::NotIn(_), None) => true,
            (FilterOp::Contains(needle), Some(Value::String(s))) => s.contains(needle.as_str()),
            _ => false,
        }
    }
}

/// Key-condition query against the table or one of its indexes.
#[derive(Debug, Clone)]
pub struct Query {
    pub index: Option<IndexName>,
    pub partition: String,
    pub sort: Option<SortCondition>,
    pub filters: Vec<Filter>,
    /// Maximum rows returned, counted after filtering. `None` reads every page.
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
    pub scan_forward: bool,
}

impl Query {
    /// Query the base table by `PK`.
    pub fn table(partition: impl Into<String>) -> Self {
        Self {
            index: None,
            partition: partition.into(),
            sort: None,
            filters: Vec::new(),
            limit: None,
            exclusive_start_key: None,
            scan_forward: true,
        }
    }

    pub fn index(index: IndexName, partition: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            ..Self::table(partition)
        }
    }

    pub fn sort(mut self, condition: SortCondition) -> Self {
        self.sort = Some(condition);
        self
    }

    pub fn sort_begins_with(self, prefix: impl Into<String>) -> Self {
        self.sort(SortCondition::BeginsWith(prefix.into()))
    }

    pub fn filter(mut self, attr: impl Into<String>, op: FilterOp) -> Self {
        self.filters.push(Filter {
            attr: attr.into(),
            op,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn partition_attr(&self) -> &'static str {
        self.index.map(|i| i.partition_attr()).unwrap_or(ATTR_PK)
    }

    pub fn sort_attr(&self) -> &'static str {
        self.index.map(|i| i.sort_attr()).unwrap_or(ATTR_SK)
    }

    pub fn matches_filters(&self, item: &Item) -> bool {
        self.filters.iter().all(|f| f.matches(item))
    }

    /// Key attributes that identify `item`'s position in this query.
    pub fn position_of(&self, item: &Item) -> Item {
        let mut key = Item::new();
        for attr in [ATTR_PK, ATTR_SK, self.partition_attr(), self.sort_attr()] {
            if let Some(value) = item.get(attr) {
                key.insert(attr.to_string(), value.clone());
            }
        }
        key
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

/// Partial update of a row.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub set: Item,
    pub remove: Vec<String>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(attr.into(), value.into());
        self
    }

    /// Set `attr` when `value` is present, leave it untouched otherwise.
    pub fn set_opt(self, attr: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.set(attr, v),
            None => self,
        }
    }

    pub fn remove(mut self, attr: impl Into<String>) -> Self {
        self.remove.push(attr.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum WriteRequest {
    Put(Item),
    Delete(ItemKey),
}

/// Store abstraction trait
///
/// All backends (DynamoDB, in-memory) implement this trait so the repositories
/// never depend on a specific client.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Strongly consistent read of one row.
    async fn get(&self, key: &ItemKey) -> StoreResult<Option<Item>>;

    /// Create or replace a row.
    async fn put(&self, item: Item) -> StoreResult<()>;

    /// Create a row, failing with `ConditionFailed` when the key is taken.
    async fn put_if_absent(&self, item: Item) -> StoreResult<()>;

    /// Apply a partial update and return the updated row.
    ///
    /// Returns `None` when the row does not exist; an update never creates one.
    async fn update(&self, key: &ItemKey, update: UpdateRequest) -> StoreResult<Option<Item>>;

    async fn delete(&self, key: &ItemKey) -> StoreResult<()>;

    async fn query(&self, query: Query) -> StoreResult<Page>;

    /// Puts and deletes sent in chunks of `BATCH_LIMIT`, in order.
    async fn batch_write(&self, writes: Vec<WriteRequest>) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_type(&self) -> StoreBackend;
}

pub(crate) fn string_attr<'a>(item: &'a Item, attr: &str) -> Option<&'a str> {
    item.get(attr).and_then(Value::as_str)
}
