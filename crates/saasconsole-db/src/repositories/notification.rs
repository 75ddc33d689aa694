use super::{from_row, paginate, query_all, string, to_row};
use crate::store::{FilterOp, ItemKey, ItemStore, Query, UpdateRequest, WriteRequest};
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{timestamp, Notification, Paginated, Status};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for notifications (`PK = USER#<uid>`, `SK = NOTIFICATION#<id>`).
///
/// Notification ids are time-ordered, so sort-key order is creation order.
#[derive(Clone)]
pub struct NotificationRepository {
    store: Arc<dyn ItemStore>,
}

impl NotificationRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(user_id: Uuid, notification_id: Uuid) -> ItemKey {
        ItemKey::new(keys::user(user_id), keys::notification(notification_id))
    }

    fn user_query(user_id: Uuid, company_id: Option<Uuid>) -> Query {
        let mut query = Query::table(keys::user(user_id))
            .sort_begins_with(PREFIX_NOTIFICATION)
            .descending();
        if let Some(company_id) = company_id {
            query = query.filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string())));
        }
        query
    }

    #[tracing::instrument(skip(self, notifications), fields(db.entity = "notification", db.operation = "batch_insert", db.count = notifications.len()))]
    pub async fn put_many(&self, notifications: &[Notification]) -> Result<(), AppError> {
        let writes = notifications
            .iter()
            .map(|n| {
                to_row(
                    n,
                    keys::user(n.user_id),
                    keys::notification(n.notification_id),
                    ENTITY_TYPE_NOTIFICATION,
                )
                .map(WriteRequest::Put)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.batch_write(writes).await?;
        Ok(())
    }

    pub async fn put(&self, notification: &Notification) -> Result<(), AppError> {
        self.put_many(std::slice::from_ref(notification)).await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "notification", db.operation = "select", db.record_id = %notification_id))]
    pub async fn get(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, AppError> {
        self.store
            .get(&Self::key(user_id, notification_id))
            .await?
            .map(from_row)
            .transpose()
    }

    pub async fn require(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification, AppError> {
        self.get(user_id, notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {}", notification_id)))
    }

    /// Notifications of a user, newest first, optionally limited to one company.
    #[tracing::instrument(skip(self, cursor), fields(db.entity = "notification", db.operation = "select"))]
    pub async fn list(
        &self,
        user_id: Uuid,
        company_id: Option<Uuid>,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Paginated<Notification>, AppError> {
        paginate(
            self.store.as_ref(),
            Self::user_query(user_id, company_id),
            limit,
            cursor,
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "notification", db.operation = "update", db.record_id = %notification_id))]
    pub async fn mark_seen(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(
            user_id,
            notification_id,
            UpdateRequest::new()
                .set("IsSeen", true)
                .set(ATTR_UPDATED_AT, timestamp::format(&now)),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "notification", db.operation = "update", db.record_id = %notification_id))]
    pub async fn set_status(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<Notification, AppError> {
        self.apply(
            user_id,
            notification_id,
            UpdateRequest::new()
                .set(ATTR_STATUS, status.as_str())
                .set("IsRead", true)
                .set(ATTR_UPDATED_AT, timestamp::format(&now)),
        )
        .await
    }

    /// Mark every unread notification of the user as read and seen.
    #[tracing::instrument(skip(self), fields(db.entity = "notification", db.operation = "update"))]
    pub async fn mark_all_read(
        &self,
        user_id: Uuid,
        company_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let unread: Vec<Notification> = query_all(
            self.store.as_ref(),
            Self::user_query(user_id, company_id).filter("IsRead", FilterOp::Eq(false.into())),
        )
        .await?;
        let updated: Vec<Notification> = unread
            .into_iter()
            .map(|mut n| {
                n.is_read = true;
                n.is_seen = true;
                n.updated_at = Some(now);
                n
            })
            .collect();
        self.put_many(&updated).await?;
        Ok(updated.len())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "notification", db.operation = "delete", db.record_id = %notification_id))]
    pub async fn delete(&self, user_id: Uuid, notification_id: Uuid) -> Result<(), AppError> {
        self.store.delete(&Self::key(user_id, notification_id)).await?;
        Ok(())
    }

    async fn apply(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        update: UpdateRequest,
    ) -> Result<Notification, AppError> {
        let row = self
            .store
            .update(&Self::key(user_id, notification_id), update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {}", notification_id)))?;
        from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use saasconsole_core::models::NotificationContent;

    fn notification(user_id: Uuid, company_id: Uuid, title: &str) -> Notification {
        Notification::new(
            user_id,
            company_id,
            NOTIFICATION_ROLE_UPDATE,
            NotificationContent {
                title: title.to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_list_newest_first_and_mark_all_read() {
        let repo = NotificationRepository::new(store());
        let (user, company) = (Uuid::new_v4(), Uuid::new_v4());
        for title in ["first", "second", "third"] {
            repo.put(&notification(user, company, title)).await.unwrap();
        }
        repo.put(&notification(user, Uuid::new_v4(), "elsewhere"))
            .await
            .unwrap();

        let page = repo.list(user, Some(company), 2, None).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|n| n.content.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second"]);
        assert!(page.last_evaluated_key.is_some());

        let updated = repo.mark_all_read(user, Some(company), Utc::now()).await.unwrap();
        assert_eq!(updated, 3);
        let again = repo.mark_all_read(user, None, Utc::now()).await.unwrap();
        assert_eq!(again, 1);
    }

    #[tokio::test]
    async fn test_mark_seen_and_delete() {
        let repo = NotificationRepository::new(store());
        let n = notification(Uuid::new_v4(), Uuid::new_v4(), "hello");
        repo.put(&n).await.unwrap();

        let seen = repo.mark_seen(n.user_id, n.notification_id, Utc::now()).await.unwrap();
        assert!(seen.is_seen);
        assert!(!seen.is_read);

        repo.delete(n.user_id, n.notification_id).await.unwrap();
        assert!(matches!(
            repo.mark_seen(n.user_id, n.notification_id, Utc::now()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
