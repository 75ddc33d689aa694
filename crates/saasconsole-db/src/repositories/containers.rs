//! Shared storage for organisational containers (groups and departments).
//!
//! Both use the same layout: the container row at `PK = <PREFIX><id>`,
//! `SK = COMPANY#<cid>`, and one member row per user at
//! `PK = <PREFIX><id>`, `SK = USER#<uid>`.

use super::{from_row, query_all, string, to_row};
use crate::store::{FilterOp, IndexName, Item, ItemKey, ItemStore, Query, WriteRequest};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct Containers {
    store: Arc<dyn ItemStore>,
    prefix: &'static str,
    entity_type: &'static str,
    member_type: &'static str,
    /// Attribute holding the container id on both row kinds
    id_attr: &'static str,
}

impl Containers {
    pub(crate) fn new(
        store: Arc<dyn ItemStore>,
        prefix: &'static str,
        entity_type: &'static str,
        member_type: &'static str,
        id_attr: &'static str,
    ) -> Self {
        Self {
            store,
            prefix,
            entity_type,
            member_type,
            id_attr,
        }
    }

    fn partition(&self, id: Uuid) -> String {
        format!("{}{}", self.prefix, id)
    }

    fn key(&self, company_id: Uuid, id: Uuid) -> ItemKey {
        ItemKey::new(self.partition(id), keys::company(company_id))
    }

    fn member_key(&self, id: Uuid, user_id: Uuid) -> ItemKey {
        ItemKey::new(self.partition(id), keys::user(user_id))
    }

    fn row<T: Serialize>(&self, company_id: Uuid, id: Uuid, value: &T) -> Result<Item, AppError> {
        to_row(
            value,
            self.partition(id),
            keys::company(company_id),
            self.entity_type,
        )
    }

    fn id_of(&self, item: &Item) -> Option<Uuid> {
        item.get(self.id_attr)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    pub(crate) async fn create<T: Serialize>(
        &self,
        company_id: Uuid,
        id: Uuid,
        value: &T,
    ) -> Result<(), AppError> {
        self.store.put_if_absent(self.row(company_id, id, value)?).await?;
        Ok(())
    }

    pub(crate) async fn save<T: Serialize>(
        &self,
        company_id: Uuid,
        id: Uuid,
        value: &T,
    ) -> Result<(), AppError> {
        self.store.put(self.row(company_id, id, value)?).await?;
        Ok(())
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<T>, AppError> {
        self.store
            .get(&self.key(company_id, id))
            .await?
            .map(from_row)
            .transpose()
    }

    /// Delete the container and its member rows; returns the removed members.
    pub(crate) async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let members = self.member_ids(id).await?;
        let mut writes: Vec<WriteRequest> = members
            .iter()
            .map(|user_id| WriteRequest::Delete(self.member_key(id, *user_id)))
            .collect();
        writes.push(WriteRequest::Delete(self.key(company_id, id)));
        self.store.batch_write(writes).await?;
        Ok(members)
    }

    fn company_query(&self, company_id: Uuid) -> Query {
        Query::index(IndexName::GetRoles, self.entity_type)
            .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string())))
    }

    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        company_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<T>, AppError> {
        let mut query = self.company_query(company_id);
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            query = query.filter(ATTR_SEARCH_KEY, FilterOp::Contains(search.to_lowercase()));
        }
        query_all(self.store.as_ref(), query).await
    }

    pub(crate) async fn is_name_unique(
        &self,
        company_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let query = self
            .company_query(company_id)
            .sort(crate::store::SortCondition::Eq(name.trim().to_lowercase()));
        let page = self.store.query(query).await?;
        Ok(page
            .items
            .iter()
            .all(|item| exclude.is_some() && self.id_of(item) == exclude))
    }

    /// Write member rows; `ids` yields (container id, user id) for each member.
    pub(crate) async fn put_members<M: Serialize>(
        &self,
        members: &[M],
        ids: impl Fn(&M) -> (Uuid, Uuid),
    ) -> Result<(), AppError> {
        let writes = members
            .iter()
            .map(|m| {
                let (id, user_id) = ids(m);
                to_row(m, self.partition(id), keys::user(user_id), self.member_type)
                    .map(WriteRequest::Put)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.batch_write(writes).await?;
        Ok(())
    }

    pub(crate) async fn remove_members(&self, id: Uuid, user_ids: &[Uuid]) -> Result<(), AppError> {
        let writes = user_ids
            .iter()
            .map(|user_id| WriteRequest::Delete(self.member_key(id, *user_id)))
            .collect();
        self.store.batch_write(writes).await?;
        Ok(())
    }

    fn members_query(&self, id: Uuid) -> Query {
        Query::table(self.partition(id))
            .sort_begins_with(PREFIX_USER)
            .filter(ATTR_TYPE, FilterOp::Eq(string(self.member_type)))
    }

    pub(crate) async fn members<M: DeserializeOwned>(&self, id: Uuid) -> Result<Vec<M>, AppError> {
        query_all(self.store.as_ref(), self.members_query(id)).await
    }

    async fn member_ids(&self, id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let page = self.store.query(self.members_query(id)).await?;
        Ok(page
            .items
            .iter()
            .filter_map(|item| item.get("UserID").and_then(|v| v.as_str()))
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect())
    }

    fn user_query(&self, user_id: Uuid, company_id: Uuid) -> Query {
        Query::index(IndexName::Inverted, keys::user(user_id))
            .sort_begins_with(self.prefix)
            .filter(ATTR_TYPE, FilterOp::Eq(string(self.member_type)))
            .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string())))
    }

    /// Member rows of one user inside a company.
    pub(crate) async fn memberships_of_user<M: DeserializeOwned>(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<M>, AppError> {
        query_all(self.store.as_ref(), self.user_query(user_id, company_id)).await
    }

    /// Drop the user from every container of the company; returns how many.
    pub(crate) async fn remove_user_from_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<usize, AppError> {
        let page = self.store.query(self.user_query(user_id, company_id)).await?;
        let writes: Vec<WriteRequest> = page
            .items
            .iter()
            .filter_map(|item| self.id_of(item))
            .map(|id| WriteRequest::Delete(self.member_key(id, user_id)))
            .collect();
        let removed = writes.len();
        self.store.batch_write(writes).await?;
        Ok(removed)
    }
}
