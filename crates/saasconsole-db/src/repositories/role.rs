use super::{from_row, query_all, string, to_row};
use crate::store::{FilterOp, IndexName, Item, ItemKey, ItemStore, Query, WriteRequest};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{premade_role, premade_roles, Role, UserRole};
use saasconsole_core::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for custom roles (`PK = ROLE#<rid>`, `SK = COMPANY#<cid>`) and
/// role assignments (`PK = USER#<uid>`, `SK = ROLE#<rid>#COMPANY#<cid>`).
///
/// Premade roles are never stored; lookups fall back to the built-in set.
#[derive(Clone)]
pub struct RoleRepository {
    store: Arc<dyn ItemStore>,
}

impl RoleRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(company_id: Uuid, role_id: Uuid) -> ItemKey {
        ItemKey::new(keys::role(role_id), keys::company(company_id))
    }

    fn assignment_key(user_id: Uuid, role_id: Uuid, company_id: Uuid) -> ItemKey {
        ItemKey::new(keys::user(user_id), keys::user_role(role_id, company_id))
    }

    fn role_row(company_id: Uuid, role: &Role) -> Result<Item, AppError> {
        let mut role = role.clone();
        role.company_id = Some(company_id);
        role.search_key = role.name.trim().to_lowercase();
        to_row(
            &role,
            keys::role(role.role_id),
            keys::company(company_id),
            ENTITY_TYPE_ROLE,
        )
    }

    #[tracing::instrument(skip(self, role), fields(db.entity = "role", db.operation = "insert", db.record_id = %role.role_id))]
    pub async fn create(&self, company_id: Uuid, role: &Role) -> Result<(), AppError> {
        self.store
            .put_if_absent(Self::role_row(company_id, role)?)
            .await
            .map_err(|e| match e {
                crate::store::StoreError::ConditionFailed(_) => {
                    AppError::RoleAlreadyExists(role.name.clone())
                }
                other => other.into(),
            })
    }

    /// Replace a custom role.
    #[tracing::instrument(skip(self, role), fields(db.entity = "role", db.operation = "update", db.record_id = %role.role_id))]
    pub async fn save(&self, company_id: Uuid, role: &Role) -> Result<(), AppError> {
        if role.premade {
            return Err(AppError::InvalidRole(format!(
                "premade role '{}' can not be changed",
                role.name
            )));
        }
        self.store.put(Self::role_row(company_id, role)?).await?;
        Ok(())
    }

    /// A premade role, or a custom role of this company.
    #[tracing::instrument(skip(self), fields(db.entity = "role", db.operation = "select", db.record_id = %role_id))]
    pub async fn get(&self, company_id: Uuid, role_id: Uuid) -> Result<Option<Role>, AppError> {
        if let Some(role) = premade_role(role_id) {
            return Ok(Some(role));
        }
        self.store
            .get(&Self::key(company_id, role_id))
            .await?
            .map(from_row)
            .transpose()
    }

    pub async fn require(&self, company_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        self.get(company_id, role_id)
            .await?
            .ok_or_else(|| AppError::RoleNotFound(role_id.to_string()))
    }

    /// Delete a custom role together with every assignment of it.
    #[tracing::instrument(skip(self), fields(db.entity = "role", db.operation = "delete", db.record_id = %role_id))]
    pub async fn delete(&self, company_id: Uuid, role_id: Uuid) -> Result<usize, AppError> {
        let assignments = self.assignments_of_role(company_id, role_id).await?;
        let mut writes: Vec<WriteRequest> = assignments
            .iter()
            .map(|a| WriteRequest::Delete(Self::assignment_key(a.user_id, role_id, company_id)))
            .collect();
        writes.push(WriteRequest::Delete(Self::key(company_id, role_id)));
        self.store.batch_write(writes).await?;
        Ok(assignments.len())
    }

    /// Custom roles of a company, ordered by name.
    #[tracing::instrument(skip(self, search), fields(db.entity = "role", db.operation = "select"))]
    pub async fn list_custom(
        &self,
        company_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Role>, AppError> {
        let mut query = Query::index(IndexName::GetRoles, ENTITY_TYPE_ROLE)
            .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string())));
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            query = query.filter(ATTR_SEARCH_KEY, FilterOp::Contains(search.to_lowercase()));
        }
        query_all(self.store.as_ref(), query).await
    }

    /// Premade roles followed by the company's custom roles.
    pub async fn list(&self, company_id: Uuid, search: Option<&str>) -> Result<Vec<Role>, AppError> {
        let needle = search.map(str::to_lowercase);
        let mut roles: Vec<Role> = premade_roles()
            .into_iter()
            .filter(|r| needle.as_deref().map_or(true, |s| r.search_key.contains(s)))
            .collect();
        roles.extend(self.list_custom(company_id, search).await?);
        Ok(roles)
    }

    /// Whether `name` is free in the company.
    ///
    /// Premade role names are always taken. `exclude` skips the role being renamed.
    #[tracing::instrument(skip(self, name), fields(db.entity = "role", db.operation = "select"))]
    pub async fn is_name_unique(
        &self,
        company_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let wanted = name.trim().to_lowercase();
        if PREMADE_ROLE_NAMES.contains(&wanted.as_str()) {
            return Ok(false);
        }
        let roles: Vec<Role> = query_all(
            self.store.as_ref(),
            Query::index(IndexName::GetRoles, ENTITY_TYPE_ROLE)
                .sort(crate::store::SortCondition::Eq(wanted))
                .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string()))),
        )
        .await?;
        Ok(roles.iter().all(|r| Some(r.role_id) == exclude))
    }

    #[tracing::instrument(skip(self, assignments), fields(db.entity = "user_role", db.operation = "batch_insert", db.count = assignments.len()))]
    pub async fn assign(&self, assignments: &[UserRole]) -> Result<(), AppError> {
        let writes = assignments
            .iter()
            .map(|a| {
                to_row(
                    a,
                    keys::user(a.user_id),
                    keys::user_role(a.role_id, a.company_id),
                    ENTITY_TYPE_USER_ROLE,
                )
                .map(WriteRequest::Put)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.batch_write(writes).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, pairs), fields(db.entity = "user_role", db.operation = "batch_delete", db.count = pairs.len()))]
    pub async fn unassign(&self, company_id: Uuid, pairs: &[(Uuid, Uuid)]) -> Result<(), AppError> {
        let writes = pairs
            .iter()
            .map(|(user_id, role_id)| {
                WriteRequest::Delete(Self::assignment_key(*user_id, *role_id, company_id))
            })
            .collect();
        self.store.batch_write(writes).await?;
        Ok(())
    }

    /// Role assignments a user holds in a company.
    #[tracing::instrument(skip(self), fields(db.entity = "user_role", db.operation = "select"))]
    pub async fn assignments_of_user(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<UserRole>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::table(keys::user(user_id))
                .sort_begins_with(PREFIX_ROLE)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_USER_ROLE)))
                .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string()))),
        )
        .await
    }

    /// Roles a user holds in a company, resolved to their definitions.
    ///
    /// Assignments whose role no longer exists are skipped.
    pub async fn roles_of_user(&self, user_id: Uuid, company_id: Uuid) -> Result<Vec<Role>, AppError> {
        let assignments = self.assignments_of_user(user_id, company_id).await?;
        let mut seen = HashSet::new();
        let mut roles = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if !seen.insert(assignment.role_id) {
                continue;
            }
            if let Some(role) = self.get(company_id, assignment.role_id).await? {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    /// Assignments of one role in a company, via the inverted index.
    #[tracing::instrument(skip(self), fields(db.entity = "user_role", db.operation = "select", db.record_id = %role_id))]
    pub async fn assignments_of_role(
        &self,
        company_id: Uuid,
        role_id: Uuid,
    ) -> Result<Vec<UserRole>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::index(IndexName::Inverted, keys::user_role(role_id, company_id))
                .sort_begins_with(PREFIX_USER)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_USER_ROLE))),
        )
        .await
    }

    pub async fn count_users(&self, company_id: Uuid, role_id: Uuid) -> Result<usize, AppError> {
        Ok(self.assignments_of_role(company_id, role_id).await?.len())
    }

    /// Drop every role a user holds in a company.
    #[tracing::instrument(skip(self), fields(db.entity = "user_role", db.operation = "batch_delete"))]
    pub async fn remove_user_from_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<usize, AppError> {
        let assignments = self.assignments_of_user(user_id, company_id).await?;
        let pairs: Vec<(Uuid, Uuid)> = assignments.iter().map(|a| (user_id, a.role_id)).collect();
        self.unassign(company_id, &pairs).await?;
        Ok(pairs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use chrono::Utc;
    use saasconsole_core::models::{company_admin_role_id, Permission, Status};

    fn role(name: &str) -> Role {
        Role {
            role_id: Uuid::new_v4(),
            company_id: None,
            name: name.to_string(),
            description: String::new(),
            permissions: vec![Permission::AddGroup, Permission::EditGroup],
            premade: false,
            status: Status::Active,
            created_by: None,
            search_key: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn assignment(user_id: Uuid, role_id: Uuid, company_id: Uuid) -> UserRole {
        UserRole {
            user_id,
            role_id,
            company_id,
            assigned_by: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_role_names_are_unique_per_company() {
        let repo = RoleRepository::new(store());
        let company = Uuid::new_v4();
        let editors = role("Editors");
        repo.create(company, &editors).await.unwrap();

        assert!(!repo.is_name_unique(company, "editors ", None).await.unwrap());
        assert!(repo
            .is_name_unique(company, "Editors", Some(editors.role_id))
            .await
            .unwrap());
        assert!(repo.is_name_unique(Uuid::new_v4(), "Editors", None).await.unwrap());
        assert!(!repo.is_name_unique(company, "Company Admin", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_includes_premade_roles() {
        let repo = RoleRepository::new(store());
        let company = Uuid::new_v4();
        repo.create(company, &role("Editors")).await.unwrap();
        repo.create(Uuid::new_v4(), &role("Elsewhere")).await.unwrap();

        let roles = repo.list(company, None).await.unwrap();
        assert_eq!(roles.len(), 4);
        assert!(roles.iter().any(|r| r.is_company_admin()));

        let searched = repo.list(company, Some("edit")).await.unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].company_id, Some(company));
    }

    #[tokio::test]
    async fn test_deleting_role_drops_its_assignments() {
        let repo = RoleRepository::new(store());
        let company = Uuid::new_v4();
        let editors = role("Editors");
        repo.create(company, &editors).await.unwrap();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        repo.assign(&[
            assignment(u1, editors.role_id, company),
            assignment(u2, editors.role_id, company),
            assignment(u1, company_admin_role_id(), company),
        ])
        .await
        .unwrap();
        assert_eq!(repo.count_users(company, editors.role_id).await.unwrap(), 2);

        let removed = repo.delete(company, editors.role_id).await.unwrap();
        assert_eq!(removed, 2);
        assert!(repo.get(company, editors.role_id).await.unwrap().is_none());

        let left = repo.roles_of_user(u1, company).await.unwrap();
        assert_eq!(left.len(), 1);
        assert!(left[0].is_company_admin());
    }

    #[tokio::test]
    async fn test_premade_roles_are_read_only() {
        let repo = RoleRepository::new(store());
        let admin = repo
            .get(Uuid::new_v4(), company_admin_role_id())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            repo.save(Uuid::new_v4(), &admin).await,
            Err(AppError::InvalidRole(_))
        ));
    }
}
