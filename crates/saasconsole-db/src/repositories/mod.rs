//! Entity repositories
//!
//! Each repository is a cheap-to-clone handle on the shared store. Repositories
//! own the key layout: they add `PK`, `SK`, `Type` and any index attributes when
//! writing a model and drop them again when reading it back.

mod company;
mod containers;
mod department;
mod group;
mod integration;
mod job;
mod log;
mod membership;
mod notification;
mod role;
mod role_request;
mod user;

pub use company::CompanyRepository;
pub use department::DepartmentRepository;
pub use group::GroupRepository;
pub use integration::IntegrationRepository;
pub use job::JobRepository;
pub use log::LogRepository;
pub use membership::{MemberFilter, MembershipRepository};
pub use notification::NotificationRepository;
pub use role::RoleRepository;
pub use role_request::RoleRequestRepository;
pub use user::UserRepository;

use crate::store::{cursor, Item, ItemStore, Page, Query};
use saasconsole_core::constants::{ATTR_PK, ATTR_SK, ATTR_TYPE};
use saasconsole_core::models::Paginated;
use saasconsole_core::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serialize `value` into a row with the given primary key and entity type.
pub(crate) fn to_row<T: Serialize>(
    value: &T,
    pk: String,
    sk: String,
    entity_type: &str,
) -> Result<Item, AppError> {
    let mut item = match serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize {} row: {}", entity_type, e)))?
    {
        Value::Object(map) => map,
        other => {
            return Err(AppError::Internal(format!(
                "{} row serialized to a non-object: {}",
                entity_type, other
            )))
        }
    };
    item.insert(ATTR_PK.to_string(), Value::String(pk));
    item.insert(ATTR_SK.to_string(), Value::String(sk));
    item.insert(ATTR_TYPE.to_string(), Value::String(entity_type.to_string()));
    Ok(item)
}

pub(crate) fn from_row<T: DeserializeOwned>(item: Item) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(item))
        .map_err(|e| AppError::Store(format!("Malformed row: {}", e)))
}

pub(crate) fn from_rows<T: DeserializeOwned>(items: Vec<Item>) -> Result<Vec<T>, AppError> {
    items.into_iter().map(from_row).collect()
}

/// Run `query` from an opaque cursor and decode one page of models.
pub(crate) async fn paginate<T: DeserializeOwned>(
    store: &dyn ItemStore,
    query: Query,
    limit: usize,
    cursor: Option<&str>,
) -> Result<Paginated<T>, AppError> {
    let start = cursor::decode_opt(cursor)?;
    let Page {
        items,
        last_evaluated_key,
    } = store.query(query.limit(limit).start_after(start)).await?;
    Ok(Paginated {
        items: from_rows(items)?,
        last_evaluated_key: cursor::encode_opt(last_evaluated_key.as_ref())?,
    })
}

/// Run `query` to completion.
pub(crate) async fn query_all<T: DeserializeOwned>(
    store: &dyn ItemStore,
    query: Query,
) -> Result<Vec<T>, AppError> {
    let page = store.query(query).await?;
    from_rows(page.items)
}

pub(crate) fn string(value: impl Into<String>) -> Value {
    Value::String(value.into())
}

pub(crate) fn strings<I, S>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(string).collect()
}
