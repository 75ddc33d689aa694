use super::{from_row, query_all, string, to_row};
use crate::store::{FilterOp, IndexName, ItemKey, ItemStore, Query, UpdateRequest, WriteRequest};
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{timestamp, Status, UpdateUserRequest, User};
use saasconsole_core::validation::normalize_email;
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for global user rows (`PK = USER#<id>`, `SK = USER#<email>`)
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn ItemStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(user: &User) -> ItemKey {
        ItemKey::new(keys::user(user.user_id), keys::user_email(&user.email))
    }

    fn row(user: &User) -> Result<crate::store::Item, AppError> {
        let mut row = to_row(
            user,
            keys::user(user.user_id),
            keys::user_email(&user.email),
            ENTITY_TYPE_USER,
        )?;
        row.insert(ATTR_SEARCH_KEY.to_string(), string(user.email.to_lowercase()));
        Ok(row)
    }

    #[tracing::instrument(skip(self, user), fields(db.entity = "user", db.operation = "insert", db.record_id = %user.user_id))]
    pub async fn create(&self, user: &User) -> Result<(), AppError> {
        self.store
            .put_if_absent(Self::row(user)?)
            .await
            .map_err(|e| match e {
                crate::store::StoreError::ConditionFailed(_) => {
                    AppError::EmailAlreadyExists(user.email.clone())
                }
                other => other.into(),
            })
    }

    /// Create or replace several users, chunked by the store.
    #[tracing::instrument(skip(self, users), fields(db.entity = "user", db.operation = "batch_insert", db.count = users.len()))]
    pub async fn put_many(&self, users: &[User]) -> Result<(), AppError> {
        let writes = users
            .iter()
            .map(|u| Self::row(u).map(WriteRequest::Put))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.batch_write(writes).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "user", db.operation = "select", db.record_id = %user_id))]
    pub async fn get(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let users: Vec<User> = query_all(
            self.store.as_ref(),
            Query::table(keys::user(user_id))
                .sort_begins_with(PREFIX_USER)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_USER))),
        )
        .await?;
        Ok(users.into_iter().next())
    }

    pub async fn require(&self, user_id: Uuid) -> Result<User, AppError> {
        self.get(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Look a user up by email through the inverted index on `SK`.
    #[tracing::instrument(skip(self, email), fields(db.entity = "user", db.operation = "select"))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = query_all(
            self.store.as_ref(),
            Query::index(IndexName::Inverted, keys::user_email(&normalize_email(email)))
                .sort_begins_with(PREFIX_USER)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_USER))),
        )
        .await?;
        Ok(users.into_iter().next())
    }

    #[tracing::instrument(skip(self, changes), fields(db.entity = "user", db.operation = "update", db.record_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: &UpdateUserRequest,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let user = self.require(user_id).await?;
        let update = UpdateRequest::new()
            .set_opt("FirstName", changes.first_name.as_deref())
            .set_opt("LastName", changes.last_name.as_deref())
            .set_opt("JobTitle", changes.job_title.as_deref())
            .set_opt("ContactNumber", changes.contact_number.as_deref())
            .set_opt("DisplayPhoto", changes.display_photo.as_deref())
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(&user, update).await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "user", db.operation = "update", db.record_id = %user_id))]
    pub async fn update_status(
        &self,
        user_id: Uuid,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let user = self.require(user_id).await?;
        let update = UpdateRequest::new()
            .set(ATTR_STATUS, status.as_str())
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(&user, update).await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "user", db.operation = "update", db.record_id = %user_id))]
    pub async fn set_active_company(
        &self,
        user_id: Uuid,
        company_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let user = self.require(user_id).await?;
        let update = match company_id {
            Some(id) => UpdateRequest::new().set("ActiveCompany", id.to_string()),
            None => UpdateRequest::new().remove("ActiveCompany"),
        }
        .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(&user, update).await
    }

    /// Replace the invitation token; `DEFAULT_USER_TOKEN` once nothing is outstanding.
    #[tracing::instrument(skip(self, token), fields(db.entity = "user", db.operation = "update", db.record_id = %user_id))]
    pub async fn set_user_token(
        &self,
        user_id: Uuid,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let user = self.require(user_id).await?;
        let update = UpdateRequest::new()
            .set("UserToken", token)
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(&user, update).await
    }

    /// Change a user's email.
    ///
    /// The email is part of the sort key, so the row is rewritten under the new
    /// key and the old row removed.
    #[tracing::instrument(skip(self, email), fields(db.entity = "user", db.operation = "update", db.record_id = %user_id))]
    pub async fn update_email(
        &self,
        user_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let old = self.require(user_id).await?;
        let mut user = old.clone();
        user.email = normalize_email(email);
        user.updated_at = Some(now);
        if user.email == old.email {
            return Ok(old);
        }

        self.create(&user).await?;
        self.store.delete(&Self::key(&old)).await?;
        Ok(user)
    }

    async fn apply(&self, user: &User, update: UpdateRequest) -> Result<User, AppError> {
        let row = self
            .store
            .update(&Self::key(user), update)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user.user_id.to_string()))?;
        from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;

    fn user(email: &str) -> User {
        User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            job_title: String::new(),
            contact_number: String::new(),
            display_photo: None,
            status: Status::Active,
            active_company: None,
            user_token: DEFAULT_USER_TOKEN.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_email_ignores_case() {
        let repo = UserRepository::new(store());
        let ada = user("ada@example.com");
        repo.create(&ada).await.unwrap();

        let found = repo.find_by_email(" ADA@example.com ").await.unwrap().unwrap();
        assert_eq!(found.user_id, ada.user_id);
        assert!(repo.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_email_moves_the_row() {
        let repo = UserRepository::new(store());
        let ada = user("ada@example.com");
        repo.create(&ada).await.unwrap();

        let moved = repo
            .update_email(ada.user_id, "countess@example.com", Utc::now())
            .await
            .unwrap();
        assert_eq!(moved.email, "countess@example.com");
        assert!(repo.find_by_email("ada@example.com").await.unwrap().is_none());
        assert_eq!(repo.get(ada.user_id).await.unwrap().unwrap().email, "countess@example.com");
    }

    #[tokio::test]
    async fn test_active_company_can_be_cleared() {
        let repo = UserRepository::new(store());
        let ada = user("ada@example.com");
        repo.create(&ada).await.unwrap();
        let company = Uuid::new_v4();

        let set = repo
            .set_active_company(ada.user_id, Some(company), Utc::now())
            .await
            .unwrap();
        assert_eq!(set.active_company, Some(company));
        let cleared = repo
            .set_active_company(ada.user_id, None, Utc::now())
            .await
            .unwrap();
        assert!(cleared.active_company.is_none());
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let repo = UserRepository::new(store());
        let err = repo
            .update_status(Uuid::new_v4(), Status::Inactive, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_user_token() {
        let repo = UserRepository::new(store());
        let ada = user("ada@example.com");
        repo.create(&ada).await.unwrap();

        let updated = repo
            .set_user_token(ada.user_id, "invite-token", Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.user_token, "invite-token");
        assert_eq!(repo.require(ada.user_id).await.unwrap().user_token, "invite-token");
    }
}
