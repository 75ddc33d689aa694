use super::{from_row, query_all, string, to_row};
use crate::store::{FilterOp, IndexName, ItemKey, ItemStore, Query, UpdateRequest};
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{timestamp, PendingRoleRequest, Status};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for role requests (`PK = USER#<uid>`, `SK = ROLE_REQUEST#<id>`)
#[derive(Clone)]
pub struct RoleRequestRepository {
    store: Arc<dyn ItemStore>,
}

impl RoleRequestRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(user_id: Uuid, request_id: Uuid) -> ItemKey {
        ItemKey::new(keys::user(user_id), keys::role_request(request_id))
    }

    #[tracing::instrument(skip(self, request), fields(db.entity = "role_request", db.operation = "insert", db.record_id = %request.request_id))]
    pub async fn put(&self, request: &PendingRoleRequest) -> Result<(), AppError> {
        let row = to_row(
            request,
            keys::user(request.user_id),
            keys::role_request(request.request_id),
            ENTITY_TYPE_ROLE_REQUEST,
        )?;
        self.store.put(row).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "role_request", db.operation = "select", db.record_id = %request_id))]
    pub async fn get(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<Option<PendingRoleRequest>, AppError> {
        self.store
            .get(&Self::key(user_id, request_id))
            .await?
            .map(from_row)
            .transpose()
    }

    /// The user's open request in a company, if any.
    #[tracing::instrument(skip(self), fields(db.entity = "role_request", db.operation = "select"))]
    pub async fn pending_for_user(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<PendingRoleRequest>, AppError> {
        let requests: Vec<PendingRoleRequest> = query_all(
            self.store.as_ref(),
            Query::table(keys::user(user_id))
                .sort_begins_with(PREFIX_ROLE_REQUEST)
                .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string())))
                .filter(ATTR_STATUS, FilterOp::Eq(string(Status::Pending.as_str()))),
        )
        .await?;
        Ok(requests.into_iter().next())
    }

    /// Open requests of a company, newest first.
    #[tracing::instrument(skip(self), fields(db.entity = "role_request", db.operation = "select"))]
    pub async fn list_pending(&self, company_id: Uuid) -> Result<Vec<PendingRoleRequest>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::index(IndexName::GetLogs, company_id.to_string())
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_ROLE_REQUEST)))
                .filter(ATTR_STATUS, FilterOp::Eq(string(Status::Pending.as_str())))
                .descending(),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "role_request", db.operation = "update", db.record_id = %request_id))]
    pub async fn set_status(
        &self,
        user_id: Uuid,
        request_id: Uuid,
        status: Status,
        handled_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PendingRoleRequest, AppError> {
        let row = self
            .store
            .update(
                &Self::key(user_id, request_id),
                UpdateRequest::new()
                    .set(ATTR_STATUS, status.as_str())
                    .set("HandledBy", handled_by.to_string())
                    .set(ATTR_UPDATED_AT, timestamp::format(&now)),
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role request {}", request_id)))?;
        from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;

    fn request(user_id: Uuid, company_id: Uuid) -> PendingRoleRequest {
        PendingRoleRequest {
            request_id: Uuid::new_v4(),
            company_id,
            user_id,
            role_ids: vec![Uuid::new_v4()],
            message: "please".into(),
            status: Status::Pending,
            notification_ids: vec![],
            handled_by: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_pending_request_lifecycle() {
        let repo = RoleRequestRepository::new(store());
        let (user, company) = (Uuid::new_v4(), Uuid::new_v4());
        let req = request(user, company);
        repo.put(&req).await.unwrap();

        assert!(repo.pending_for_user(user, company).await.unwrap().is_some());
        assert!(repo.pending_for_user(user, Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(repo.list_pending(company).await.unwrap().len(), 1);

        let done = repo
            .set_status(user, req.request_id, Status::Done, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert_eq!(done.status, Status::Done);
        assert!(done.handled_by.is_some());
        assert!(repo.pending_for_user(user, company).await.unwrap().is_none());
        assert!(repo.list_pending(company).await.unwrap().is_empty());
    }
}
