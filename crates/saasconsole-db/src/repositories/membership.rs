use super::{from_row, paginate, query_all, string, strings, to_row};
use crate::store::{
    FilterOp, IndexName, Item, ItemKey, ItemStore, Query, StoreError, UpdateRequest, WriteRequest,
};
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{
    member_search_key, timestamp, CompanyUser, MemberCounts, Paginated, Status, User,
};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Which members of a company a listing returns.
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    /// Empty means every status
    pub statuses: Vec<Status>,
    /// Lowercased text matched against name and email
    pub search: Option<String>,
}

/// Repository for company memberships (`PK = COMPANY#<cid>`, `SK = USER#<uid>`)
#[derive(Clone)]
pub struct MembershipRepository {
    store: Arc<dyn ItemStore>,
}

impl MembershipRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(company_id: Uuid, user_id: Uuid) -> ItemKey {
        ItemKey::new(keys::company(company_id), keys::user(user_id))
    }

    fn row(member: &CompanyUser) -> Result<Item, AppError> {
        let mut row = to_row(
            member,
            keys::company(member.company_id),
            keys::user(member.user_id),
            ENTITY_TYPE_COMPANY_MEMBER,
        )?;
        row.insert(
            ATTR_GSI_SK.to_string(),
            string(keys::member_sort_key(&member.search_key)),
        );
        Ok(row)
    }

    fn members_query(company_id: Uuid, filter: &MemberFilter) -> Query {
        let mut query = Query::index(IndexName::GetUsers, keys::company(company_id))
            .sort_begins_with(PREFIX_USER)
            .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_COMPANY_MEMBER)));
        if !filter.statuses.is_empty() {
            query = query.filter(
                ATTR_STATUS,
                FilterOp::In(strings(filter.statuses.iter().map(Status::as_str))),
            );
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(ATTR_SEARCH_KEY, FilterOp::Contains(search.to_lowercase()));
        }
        query
    }

    /// Insert a new membership; an existing row for the pair is a conflict.
    #[tracing::instrument(skip(self, member), fields(db.entity = "company_member", db.operation = "insert", db.record_id = %member.user_id))]
    pub async fn create(&self, member: &CompanyUser) -> Result<(), AppError> {
        self.store
            .put_if_absent(Self::row(member)?)
            .await
            .map_err(|e| match e {
                StoreError::ConditionFailed(_) => {
                    AppError::UserAlreadyInCompany(member.email.clone())
                }
                other => other.into(),
            })
    }

    /// Create or replace memberships in batches.
    #[tracing::instrument(skip(self, members), fields(db.entity = "company_member", db.operation = "batch_insert", db.count = members.len()))]
    pub async fn put_many(&self, members: &[CompanyUser]) -> Result<(), AppError> {
        let writes = members
            .iter()
            .map(|m| Self::row(m).map(WriteRequest::Put))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.batch_write(writes).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "company_member", db.operation = "select", db.record_id = %user_id))]
    pub async fn get(&self, company_id: Uuid, user_id: Uuid) -> Result<Option<CompanyUser>, AppError> {
        self.store
            .get(&Self::key(company_id, user_id))
            .await?
            .map(from_row)
            .transpose()
    }

    /// Like [`get`](Self::get) but a missing membership is `UserNotFound`.
    pub async fn require(&self, company_id: Uuid, user_id: Uuid) -> Result<CompanyUser, AppError> {
        self.get(company_id, user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// One page of members ordered by search key.
    #[tracing::instrument(skip(self, filter, cursor), fields(db.entity = "company_member", db.operation = "select"))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: &MemberFilter,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Paginated<CompanyUser>, AppError> {
        paginate(
            self.store.as_ref(),
            Self::members_query(company_id, filter),
            limit,
            cursor,
        )
        .await
    }

    /// Every member matching `filter`.
    #[tracing::instrument(skip(self, filter), fields(db.entity = "company_member", db.operation = "select"))]
    pub async fn list_all(
        &self,
        company_id: Uuid,
        filter: &MemberFilter,
    ) -> Result<Vec<CompanyUser>, AppError> {
        query_all(self.store.as_ref(), Self::members_query(company_id, filter)).await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "company_member", db.operation = "count"))]
    pub async fn count(&self, company_id: Uuid) -> Result<MemberCounts, AppError> {
        let members = self.list_all(company_id, &MemberFilter::default()).await?;
        let mut counts = MemberCounts::default();
        for member in &members {
            counts.record(member.status);
        }
        Ok(counts)
    }

    #[tracing::instrument(skip(self, email), fields(db.entity = "company_member", db.operation = "select"))]
    pub async fn find_by_email(
        &self,
        company_id: Uuid,
        email: &str,
    ) -> Result<Option<CompanyUser>, AppError> {
        let members: Vec<CompanyUser> = query_all(
            self.store.as_ref(),
            Self::members_query(company_id, &MemberFilter::default())
                .filter(ATTR_EMAIL, FilterOp::Eq(string(email.trim().to_lowercase()))),
        )
        .await?;
        Ok(members.into_iter().next())
    }

    /// Every membership of a user, across companies.
    #[tracing::instrument(skip(self), fields(db.entity = "company_member", db.operation = "select"))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CompanyUser>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::index(IndexName::Inverted, keys::user(user_id))
                .sort_begins_with(PREFIX_COMPANY)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_COMPANY_MEMBER))),
        )
        .await
    }

    /// Set a membership's status.
    ///
    /// Moving to DELETED remembers the current status in `PreviousStatus` and
    /// stamps `DeletedAt` so the member can be restored later.
    #[tracing::instrument(skip(self), fields(db.entity = "company_member", db.operation = "update", db.record_id = %user_id))]
    pub async fn update_status(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        status: Status,
        handler: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CompanyUser, AppError> {
        let current = self.require(company_id, user_id).await?;
        let mut update = UpdateRequest::new()
            .set(ATTR_STATUS, status.as_str())
            .set("Handler", handler.to_string())
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        if status == Status::Deleted {
            if current.status != Status::Deleted {
                update = update.set(ATTR_PREVIOUS_STATUS, current.status.as_str());
            }
            update = update.set("DeletedAt", timestamp::format(&now));
        } else {
            update = update.remove(ATTR_PREVIOUS_STATUS).remove("DeletedAt");
        }
        self.apply(company_id, user_id, update).await
    }

    /// Soft-delete a member.
    pub async fn remove(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        handler: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CompanyUser, AppError> {
        self.update_status(company_id, user_id, Status::Deleted, handler, now)
            .await
    }

    /// Bring a DELETED member back to the status it had, or DEFAULT.
    #[tracing::instrument(skip(self), fields(db.entity = "company_member", db.operation = "update", db.record_id = %user_id))]
    pub async fn restore(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        handler: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CompanyUser, AppError> {
        let current = self.require(company_id, user_id).await?;
        if current.status != Status::Deleted {
            return Err(AppError::InvalidStatus(format!(
                "member {} is {}, not DELETED",
                user_id, current.status
            )));
        }
        let status = current
            .previous_status
            .filter(|s| *s != Status::Deleted)
            .unwrap_or(Status::Default);
        self.update_status(company_id, user_id, status, handler, now)
            .await
    }

    /// Remove the membership row.
    #[tracing::instrument(skip(self), fields(db.entity = "company_member", db.operation = "delete", db.record_id = %user_id))]
    pub async fn delete_permanently(&self, company_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.store.delete(&Self::key(company_id, user_id)).await?;
        Ok(())
    }

    /// Copy a user's profile onto every membership row of that user.
    #[tracing::instrument(skip(self, user), fields(db.entity = "company_member", db.operation = "update", db.record_id = %user.user_id))]
    pub async fn sync_profile(&self, user: &User, now: DateTime<Utc>) -> Result<usize, AppError> {
        let search_key = member_search_key(&user.first_name, &user.last_name, &user.email);
        let memberships = self.list_for_user(user.user_id).await?;
        for membership in &memberships {
            let update = UpdateRequest::new()
                .set(ATTR_EMAIL, user.email.as_str())
                .set("FirstName", user.first_name.as_str())
                .set("LastName", user.last_name.as_str())
                .set("JobTitle", user.job_title.as_str())
                .set("ContactNumber", user.contact_number.as_str())
                .set_opt("DisplayPhoto", user.display_photo.as_deref())
                .set(ATTR_SEARCH_KEY, search_key.as_str())
                .set(ATTR_GSI_SK, keys::member_sort_key(&search_key))
                .set(ATTR_UPDATED_AT, timestamp::format(&now));
            self.store
                .update(&Self::key(membership.company_id, user.user_id), update)
                .await?;
        }
        Ok(memberships.len())
    }

    /// Copy a renamed company's name onto its membership rows.
    #[tracing::instrument(skip(self, name), fields(db.entity = "company_member", db.operation = "update"))]
    pub async fn sync_company_name(&self, company_id: Uuid, name: &str) -> Result<(), AppError> {
        let members = self.list_all(company_id, &MemberFilter::default()).await?;
        for member in members {
            self.store
                .update(
                    &Self::key(company_id, member.user_id),
                    UpdateRequest::new().set("CompanyName", name),
                )
                .await?;
        }
        Ok(())
    }

    async fn apply(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        update: UpdateRequest,
    ) -> Result<CompanyUser, AppError> {
        let row = self
            .store
            .update(&Self::key(company_id, user_id), update)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;
        from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use saasconsole_core::models::UserType;

    fn user(first: &str, email: &str) -> User {
        User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: "Tester".into(),
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

    async fn seed(repo: &MembershipRepository, company_id: Uuid) -> Vec<CompanyUser> {
        let mut members = Vec::new();
        for (first, status) in [
            ("ada", Status::Active),
            ("bob", Status::Pending),
            ("cyd", Status::Active),
            ("dee", Status::Inactive),
        ] {
            let u = user(first, &format!("{}@example.com", first));
            let m = CompanyUser::for_user(
                &u,
                company_id,
                "Acme",
                UserType::CompanyMember,
                status,
                None,
                Utc::now(),
            );
            repo.create(&m).await.unwrap();
            members.push(m);
        }
        members
    }

    #[tokio::test]
    async fn test_second_membership_for_same_pair_conflicts() {
        let repo = MembershipRepository::new(store());
        let company = Uuid::new_v4();
        let members = seed(&repo, company).await;
        let err = repo.create(&members[0]).await.unwrap_err();
        assert!(matches!(err, AppError::UserAlreadyInCompany(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let repo = MembershipRepository::new(store());
        let company = Uuid::new_v4();
        seed(&repo, company).await;

        let active = MemberFilter {
            statuses: vec![Status::Active],
            search: None,
        };
        let first = repo.list(company, &active, 1, None).await.unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].first_name, "ada");
        let cursor = first.last_evaluated_key.clone().unwrap();
        let second = repo.list(company, &active, 1, Some(&cursor)).await.unwrap();
        assert_eq!(second.items[0].first_name, "cyd");

        let search = MemberFilter {
            statuses: vec![],
            search: Some("BOB".into()),
        };
        let found = repo.list_all(company, &search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, Status::Pending);

        let counts = repo.count(company).await.unwrap();
        assert_eq!(counts.total, 4);
        assert_eq!(counts.active, 2);
        assert_eq!(counts.inactive, 1);
    }

    #[tokio::test]
    async fn test_remove_then_restore_returns_previous_status() {
        let repo = MembershipRepository::new(store());
        let company = Uuid::new_v4();
        let members = seed(&repo, company).await;
        let actor = Uuid::new_v4();
        let pending = &members[1];

        let removed = repo
            .remove(company, pending.user_id, actor, Utc::now())
            .await
            .unwrap();
        assert_eq!(removed.status, Status::Deleted);
        assert_eq!(removed.previous_status, Some(Status::Pending));
        assert!(removed.deleted_at.is_some());

        let restored = repo
            .restore(company, pending.user_id, actor, Utc::now())
            .await
            .unwrap();
        assert_eq!(restored.status, Status::Pending);
        assert!(restored.previous_status.is_none());
        assert!(restored.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_restore_without_previous_status_defaults() {
        let repo = MembershipRepository::new(store());
        let company = Uuid::new_v4();
        let u = user("eve", "eve@example.com");
        let mut m = CompanyUser::for_user(
            &u,
            company,
            "Acme",
            UserType::CompanyMember,
            Status::Deleted,
            None,
            Utc::now(),
        );
        m.previous_status = None;
        repo.create(&m).await.unwrap();

        let restored = repo
            .restore(company, u.user_id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert_eq!(restored.status, Status::Default);
    }

    #[tokio::test]
    async fn test_profile_sync_updates_search_order() {
        let repo = MembershipRepository::new(store());
        let company = Uuid::new_v4();
        let members = seed(&repo, company).await;

        let mut renamed = user("zed", "ada@example.com");
        renamed.user_id = members[0].user_id;
        let touched = repo.sync_profile(&renamed, Utc::now()).await.unwrap();
        assert_eq!(touched, 1);

        let all = repo.list_all(company, &MemberFilter::default()).await.unwrap();
        assert_eq!(all.last().unwrap().first_name, "zed");
    }
}
