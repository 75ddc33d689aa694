//! In-memory store backend
//!
//! Used by tests and local development. Index queries are answered by scanning
//! the ordered row map, which is fine for the data sizes involved.

use super::{
    string_attr, Item, ItemKey, ItemStore, Page, Query, StoreError, StoreResult, UpdateRequest,
    WriteRequest,
};
use async_trait::async_trait;
use saasconsole_core::constants::{ATTR_PK, ATTR_SK, BATCH_LIMIT};
use saasconsole_core::StoreBackend;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<BTreeMap<ItemKey, Item>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

/// Position of a row within a query: sort value first, primary key to break ties.
type Position = (String, String, String);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn position(query: &Query, item: &Item) -> Option<Position> {
        let sort = string_attr(item, query.sort_attr())?;
        let pk = string_attr(item, ATTR_PK)?;
        let sk = string_attr(item, ATTR_SK)?;
        Some((sort.to_string(), pk.to_string(), sk.to_string()))
    }

    fn is_after(query: &Query, candidate: &Position, start: &Position) -> bool {
        match candidate.cmp(start) {
            Ordering::Greater => query.scan_forward,
            Ordering::Less => !query.scan_forward,
            Ordering::Equal => false,
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get(&self, key: &ItemKey) -> StoreResult<Option<Item>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn put(&self, item: Item) -> StoreResult<()> {
        let key = ItemKey::of(&item)?;
        self.rows.write().await.insert(key, item);
        Ok(())
    }

    async fn put_if_absent(&self, item: Item) -> StoreResult<()> {
        let key = ItemKey::of(&item)?;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&key) {
            return Err(StoreError::ConditionFailed(format!(
                "row {} / {} already exists",
                key.pk, key.sk
            )));
        }
        rows.insert(key, item);
        Ok(())
    }

    async fn update(&self, key: &ItemKey, update: UpdateRequest) -> StoreResult<Option<Item>> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(key) else {
            return Ok(None);
        };
        for attr in [ATTR_PK, ATTR_SK] {
            if update.set.contains_key(attr) || update.remove.iter().any(|a| a == attr) {
                return Err(StoreError::InvalidItem(format!(
                    "key attribute {} can not be updated",
                    attr
                )));
            }
        }
        for (attr, value) in update.set {
            row.insert(attr, value);
        }
        for attr in &update.remove {
            row.remove(attr);
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, key: &ItemKey) -> StoreResult<()> {
        self.rows.write().await.remove(key);
        Ok(())
    }

    async fn query(&self, query: Query) -> StoreResult<Page> {
        let rows = self.rows.read().await;
        let partition_attr = query.partition_attr();

        let mut candidates: Vec<(Position, &Item)> = rows
            .values()
            .filter(|item| string_attr(item, partition_attr) == Some(query.partition.as_str()))
            .filter_map(|item| Self::position(&query, item).map(|pos| (pos, item)))
            .filter(|(pos, _)| query.sort.as_ref().map_or(true, |c| c.matches(&pos.0)))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        if !query.scan_forward {
            candidates.reverse();
        }

        let start = match &query.exclusive_start_key {
            Some(key) => Some(Self::position(&query, key).ok_or_else(|| {
                StoreError::InvalidCursor("start key lacks the query's key attributes".to_string())
            })?),
            None => None,
        };

        let mut remaining = candidates
            .into_iter()
            .filter(|(pos, _)| start.as_ref().map_or(true, |s| Self::is_after(&query, pos, s)))
            .peekable();

        let mut page = Page::default();
        while let Some((_, item)) = remaining.next() {
            if !query.matches_filters(item) {
                continue;
            }
            page.items.push(item.clone());
            if query.limit.is_some_and(|limit| page.items.len() >= limit) {
                if remaining.peek().is_some() {
                    page.last_evaluated_key = Some(query.position_of(item));
                }
                break;
            }
        }
        Ok(page)
    }

    async fn batch_write(&self, writes: Vec<WriteRequest>) -> StoreResult<()> {
        for chunk in writes.chunks(BATCH_LIMIT) {
            let mut rows = self.rows.write().await;
            for write in chunk {
                match write {
                    WriteRequest::Put(item) => {
                        rows.insert(ItemKey::of(item)?, item.clone());
                    }
                    WriteRequest::Delete(key) => {
                        rows.remove(key);
                    }
                }
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FilterOp, IndexName};
    use serde_json::{json, Value};

    fn row(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => Item::new(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (uid, name, status) in [
            ("1", "ada", "ACTIVE"),
            ("2", "bob", "DELETED"),
            ("3", "cyd", "ACTIVE"),
            ("4", "dee", "PENDING"),
        ] {
            store
                .put(row(json!({
                    "PK": "COMPANY#c1",
                    "SK": format!("USER#{}", uid),
                    "GSI_SK": format!("USER#{}", name),
                    "Status": status,
                })))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_put_if_absent_rejects_existing_key() {
        let store = MemoryStore::new();
        let item = row(json!({"PK": "A", "SK": "B"}));
        store.put_if_absent(item.clone()).await.unwrap();
        let err = store.put_if_absent(item).await.unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed(_)));
    }

    #[tokio::test]
    async fn test_update_never_creates_rows() {
        let store = MemoryStore::new();
        let key = ItemKey::new("A", "B");
        let updated = store
            .update(&key, UpdateRequest::new().set("Status", "ACTIVE"))
            .await
            .unwrap();
        assert!(updated.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_sets_and_removes() {
        let store = MemoryStore::new();
        store
            .put(row(json!({"PK": "A", "SK": "B", "Status": "DELETED", "PreviousStatus": "ACTIVE"})))
            .await
            .unwrap();
        let updated = store
            .update(
                &ItemKey::new("A", "B"),
                UpdateRequest::new().set("Status", "ACTIVE").remove("PreviousStatus"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["Status"], json!("ACTIVE"));
        assert!(!updated.contains_key("PreviousStatus"));
    }

    #[tokio::test]
    async fn test_limit_counts_rows_after_filtering() {
        let store = seeded().await;
        let query = Query::index(IndexName::GetUsers, "COMPANY#c1")
            .filter("Status", FilterOp::Eq(json!("ACTIVE")))
            .limit(1);

        let first = store.query(query.clone()).await.unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0]["GSI_SK"], json!("USER#ada"));
        assert!(first.last_evaluated_key.is_some());

        let second = store
            .query(query.clone().start_after(first.last_evaluated_key))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0]["GSI_SK"], json!("USER#cyd"));
        assert!(second.last_evaluated_key.is_some());

        let third = store
            .query(query.start_after(second.last_evaluated_key))
            .await
            .unwrap();
        assert!(third.items.is_empty());
        assert!(third.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_descending_query_on_inverted_index() {
        let store = MemoryStore::new();
        for cid in ["c1", "c2", "c3"] {
            store
                .put(row(json!({"PK": format!("COMPANY#{}", cid), "SK": "USER#u1"})))
                .await
                .unwrap();
        }
        let page = store
            .query(
                Query::index(IndexName::Inverted, "USER#u1")
                    .sort_begins_with("COMPANY#")
                    .descending(),
            )
            .await
            .unwrap();
        let pks: Vec<_> = page.items.iter().map(|i| i["PK"].clone()).collect();
        assert_eq!(pks, vec![json!("COMPANY#c3"), json!("COMPANY#c2"), json!("COMPANY#c1")]);
    }

    #[tokio::test]
    async fn test_batch_write_puts_and_deletes() {
        let store = seeded().await;
        let mut writes: Vec<WriteRequest> = (0..30)
            .map(|i| WriteRequest::Put(row(json!({"PK": "GROUP#g", "SK": format!("USER#{:02}", i)}))))
            .collect();
        writes.push(WriteRequest::Delete(ItemKey::new("COMPANY#c1", "USER#1")));
        store.batch_write(writes).await.unwrap();

        let members = store.query(Query::table("GROUP#g")).await.unwrap();
        assert_eq!(members.items.len(), 30);
        assert!(store.get(&ItemKey::new("COMPANY#c1", "USER#1")).await.unwrap().is_none());
    }
}
