use super::{from_row, query_all, string, to_row};
use crate::store::{FilterOp, IndexName, ItemKey, ItemStore, Query, UpdateRequest};
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{timestamp, Company, CompanyUser, Status, UserCompany};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for company rows (`PK = SK = COMPANY#<id>`)
#[derive(Clone)]
pub struct CompanyRepository {
    store: Arc<dyn ItemStore>,
}

impl CompanyRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(company_id: Uuid) -> ItemKey {
        ItemKey::new(keys::company(company_id), keys::company(company_id))
    }

    #[tracing::instrument(skip(self, company), fields(db.entity = "company", db.operation = "insert", db.record_id = %company.company_id))]
    pub async fn create(&self, company: &Company) -> Result<(), AppError> {
        let id = keys::company(company.company_id);
        let mut row = to_row(company, id.clone(), id, ENTITY_TYPE_COMPANY)?;
        row.insert(ATTR_SEARCH_KEY.to_string(), string(company.name.to_lowercase()));
        self.store.put_if_absent(row).await.map_err(|e| match e {
            crate::store::StoreError::ConditionFailed(_) => {
                AppError::CompanyAlreadyExists(company.name.clone())
            }
            other => other.into(),
        })
    }

    #[tracing::instrument(skip(self), fields(db.entity = "company", db.operation = "select", db.record_id = %company_id))]
    pub async fn get(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        self.store
            .get(&Self::key(company_id))
            .await?
            .map(from_row)
            .transpose()
    }

    /// Like [`get`](Self::get) but a missing company is an error.
    pub async fn require(&self, company_id: Uuid) -> Result<Company, AppError> {
        self.get(company_id)
            .await?
            .ok_or_else(|| AppError::CompanyNotFound(company_id.to_string()))
    }

    #[tracing::instrument(skip(self, name, description), fields(db.entity = "company", db.operation = "update", db.record_id = %company_id))]
    pub async fn update_details(
        &self,
        company_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Company, AppError> {
        let update = UpdateRequest::new()
            .set_opt("Name", name)
            .set_opt(ATTR_SEARCH_KEY, name.map(str::to_lowercase))
            .set_opt("Description", description)
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(company_id, update).await
    }

    #[tracing::instrument(skip(self, logo), fields(db.entity = "company", db.operation = "update", db.record_id = %company_id))]
    pub async fn update_logo(
        &self,
        company_id: Uuid,
        logo: &str,
        now: DateTime<Utc>,
    ) -> Result<Company, AppError> {
        let update = UpdateRequest::new()
            .set("Logo", logo)
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(company_id, update).await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "company", db.operation = "update", db.record_id = %company_id))]
    pub async fn set_setup_wizard_status(
        &self,
        company_id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Company, AppError> {
        let update = UpdateRequest::new()
            .set("SetupWizardStatus", status)
            .set(ATTR_UPDATED_AT, timestamp::format(&now));
        self.apply(company_id, update).await
    }

    async fn apply(&self, company_id: Uuid, update: UpdateRequest) -> Result<Company, AppError> {
        let row = self
            .store
            .update(&Self::key(company_id), update)
            .await?
            .ok_or_else(|| AppError::CompanyNotFound(company_id.to_string()))?;
        from_row(row)
    }

    /// Companies the user is an ACTIVE member of.
    ///
    /// Pending invitations are left out until they are accepted.
    #[tracing::instrument(skip(self), fields(db.entity = "company", db.operation = "select"))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UserCompany>, AppError> {
        let memberships: Vec<CompanyUser> = query_all(
            self.store.as_ref(),
            Query::index(IndexName::Inverted, keys::user(user_id))
                .sort_begins_with(PREFIX_COMPANY)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_COMPANY_MEMBER)))
                .filter(ATTR_STATUS, FilterOp::Eq(string(Status::Active.as_str()))),
        )
        .await?;

        let mut companies = Vec::with_capacity(memberships.len());
        for membership in memberships {
            match self.get(membership.company_id).await? {
                Some(company) => companies.push(UserCompany {
                    company,
                    user_type: membership.user_type,
                    member_status: membership.status,
                }),
                None => tracing::warn!(
                    company_id = %membership.company_id,
                    user_id = %user_id,
                    "Membership points at a missing company"
                ),
            }
        }
        Ok(companies)
    }

    /// Whether `name` is free among the companies the user is an ACTIVE member of.
    ///
    /// Compared case-insensitively against the company name denormalised onto
    /// each membership row. `exclude` skips the company being renamed.
    #[tracing::instrument(skip(self, name), fields(db.entity = "company", db.operation = "select"))]
    pub async fn is_name_unique_for_user(
        &self,
        name: &str,
        user_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let memberships: Vec<CompanyUser> = query_all(
            self.store.as_ref(),
            Query::index(IndexName::Inverted, keys::user(user_id))
                .sort_begins_with(PREFIX_COMPANY)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_COMPANY_MEMBER)))
                .filter(ATTR_STATUS, FilterOp::Eq(string(Status::Active.as_str()))),
        )
        .await?;

        let wanted = name.trim().to_lowercase();
        Ok(!memberships.iter().any(|m| {
            Some(m.company_id) != exclude && m.company_name.trim().to_lowercase() == wanted
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use crate::repositories::MembershipRepository;
    use saasconsole_core::models::{User, UserType};

    fn company(name: &str, owner: Uuid) -> Company {
        Company {
            company_id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            logo: None,
            status: Status::Active,
            setup_wizard_status: None,
            created_by: owner,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn user() -> User {
        User {
            user_id: Uuid::new_v4(),
            email: "owner@example.com".into(),
            first_name: "Olive".into(),
            last_name: "Owner".into(),
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
    async fn test_create_and_update_company() {
        let repo = CompanyRepository::new(store());
        let owner = Uuid::new_v4();
        let c = company("Acme", owner);
        repo.create(&c).await.unwrap();

        let updated = repo
            .update_details(c.company_id, Some("Acme Corp"), None, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.name, "Acme Corp");
        assert!(updated.updated_at.is_some());

        let err = repo
            .update_logo(Uuid::new_v4(), "https://cdn/logo.png", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CompanyNotFound(_)));
    }

    #[tokio::test]
    async fn test_name_uniqueness_is_per_user_and_case_insensitive() {
        let store = store();
        let companies = CompanyRepository::new(store.clone());
        let members = MembershipRepository::new(store);
        let owner = user();

        let c = company("Acme", owner.user_id);
        companies.create(&c).await.unwrap();
        let membership = CompanyUser::for_user(
            &owner,
            c.company_id,
            &c.name,
            UserType::CompanyOwner,
            Status::Active,
            None,
            Utc::now(),
        );
        members.create(&membership).await.unwrap();

        assert!(!companies
            .is_name_unique_for_user("  ACME ", owner.user_id, None)
            .await
            .unwrap());
        assert!(companies
            .is_name_unique_for_user("Acme", owner.user_id, Some(c.company_id))
            .await
            .unwrap());
        assert!(companies
            .is_name_unique_for_user("Acme", Uuid::new_v4(), None)
            .await
            .unwrap());

        let listed = companies.list_for_user(owner.user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].user_type.is_owner());
    }

    #[tokio::test]
    async fn test_pending_memberships_are_not_listed() {
        let store = store();
        let companies = CompanyRepository::new(store.clone());
        let members = MembershipRepository::new(store);
        let invitee = user();

        let c = company("Globex", Uuid::new_v4());
        companies.create(&c).await.unwrap();
        let membership = CompanyUser::for_user(
            &invitee,
            c.company_id,
            &c.name,
            UserType::CompanyMember,
            Status::Pending,
            None,
            Utc::now(),
        );
        members.create(&membership).await.unwrap();

        assert!(companies
            .list_for_user(invitee.user_id)
            .await
            .unwrap()
            .is_empty());

        members
            .update_status(c.company_id, invitee.user_id, Status::Active, invitee.user_id, Utc::now())
            .await
            .unwrap();
        let listed = companies.list_for_user(invitee.user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].member_status, Status::Active);
    }
}
