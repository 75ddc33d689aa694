use super::containers::Containers;
use crate::store::ItemStore;
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::models::{Group, GroupMember};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for groups and group membership rows
#[derive(Clone)]
pub struct GroupRepository {
    rows: Containers,
}

impl GroupRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            rows: Containers::new(
                store,
                PREFIX_GROUP,
                ENTITY_TYPE_GROUP,
                ENTITY_TYPE_GROUP_MEMBER,
                "GroupID",
            ),
        }
    }

    fn normalized(group: &Group) -> Group {
        let mut group = group.clone();
        group.search_key = group.name.trim().to_lowercase();
        group
    }

    #[tracing::instrument(skip(self, group), fields(db.entity = "group", db.operation = "insert", db.record_id = %group.group_id))]
    pub async fn create(&self, group: &Group) -> Result<(), AppError> {
        self.rows
            .create(group.company_id, group.group_id, &Self::normalized(group))
            .await
    }

    #[tracing::instrument(skip(self, group), fields(db.entity = "group", db.operation = "update", db.record_id = %group.group_id))]
    pub async fn save(&self, group: &Group) -> Result<(), AppError> {
        self.rows
            .save(group.company_id, group.group_id, &Self::normalized(group))
            .await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "group", db.operation = "select", db.record_id = %group_id))]
    pub async fn get(&self, company_id: Uuid, group_id: Uuid) -> Result<Option<Group>, AppError> {
        self.rows.get(company_id, group_id).await
    }

    pub async fn require(&self, company_id: Uuid, group_id: Uuid) -> Result<Group, AppError> {
        self.get(company_id, group_id)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(group_id.to_string()))
    }

    /// Delete a group and its member rows; returns the users that were members.
    #[tracing::instrument(skip(self), fields(db.entity = "group", db.operation = "delete", db.record_id = %group_id))]
    pub async fn delete(&self, company_id: Uuid, group_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.rows.delete(company_id, group_id).await
    }

    #[tracing::instrument(skip(self, search), fields(db.entity = "group", db.operation = "select"))]
    pub async fn list(&self, company_id: Uuid, search: Option<&str>) -> Result<Vec<Group>, AppError> {
        self.rows.list(company_id, search).await
    }

    /// Groups attached to a department.
    pub async fn list_for_department(
        &self,
        company_id: Uuid,
        department_id: Uuid,
    ) -> Result<Vec<Group>, AppError> {
        let groups = self.list(company_id, None).await?;
        Ok(groups
            .into_iter()
            .filter(|g| g.department_id == Some(department_id))
            .collect())
    }

    pub async fn is_name_unique(
        &self,
        company_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppError> {
        self.rows.is_name_unique(company_id, name, exclude).await
    }

    #[tracing::instrument(skip(self, user_ids), fields(db.entity = "group_member", db.operation = "batch_insert", db.count = user_ids.len()))]
    pub async fn add_members(
        &self,
        company_id: Uuid,
        group_id: Uuid,
        user_ids: &[Uuid],
        added_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupMember>, AppError> {
        let members: Vec<GroupMember> = user_ids
            .iter()
            .map(|user_id| GroupMember {
                group_id,
                user_id: *user_id,
                company_id,
                added_by,
                created_at: now,
            })
            .collect();
        self.rows
            .put_members(&members, |m| (m.group_id, m.user_id))
            .await?;
        Ok(members)
    }

    #[tracing::instrument(skip(self, user_ids), fields(db.entity = "group_member", db.operation = "batch_delete", db.count = user_ids.len()))]
    pub async fn remove_members(&self, group_id: Uuid, user_ids: &[Uuid]) -> Result<(), AppError> {
        self.rows.remove_members(group_id, user_ids).await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "group_member", db.operation = "select", db.record_id = %group_id))]
    pub async fn members(&self, group_id: Uuid) -> Result<Vec<GroupMember>, AppError> {
        self.rows.members(group_id).await
    }

    /// Groups of a company the user belongs to.
    #[tracing::instrument(skip(self), fields(db.entity = "group_member", db.operation = "select"))]
    pub async fn groups_of_user(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Group>, AppError> {
        let memberships: Vec<GroupMember> =
            self.rows.memberships_of_user(user_id, company_id).await?;
        let mut groups = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(group) = self.get(company_id, membership.group_id).await? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    pub async fn remove_user_from_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<usize, AppError> {
        self.rows.remove_user_from_company(user_id, company_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use saasconsole_core::models::Status;

    fn group(company_id: Uuid, name: &str) -> Group {
        Group {
            group_id: Uuid::new_v4(),
            company_id,
            department_id: None,
            name: name.to_string(),
            description: String::new(),
            status: Status::Active,
            created_by: Uuid::new_v4(),
            search_key: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_group_names_unique_within_company() {
        let repo = GroupRepository::new(store());
        let company = Uuid::new_v4();
        let g = group(company, "Engineering");
        repo.create(&g).await.unwrap();

        assert!(!repo.is_name_unique(company, "ENGINEERING", None).await.unwrap());
        assert!(repo
            .is_name_unique(company, "engineering", Some(g.group_id))
            .await
            .unwrap());
        assert!(repo.is_name_unique(Uuid::new_v4(), "Engineering", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_members_and_user_groups() {
        let repo = GroupRepository::new(store());
        let company = Uuid::new_v4();
        let eng = group(company, "Engineering");
        let ops = group(company, "Ops");
        repo.create(&eng).await.unwrap();
        repo.create(&ops).await.unwrap();

        let (ada, bob) = (Uuid::new_v4(), Uuid::new_v4());
        repo.add_members(company, eng.group_id, &[ada, bob], None, Utc::now())
            .await
            .unwrap();
        repo.add_members(company, ops.group_id, &[ada], None, Utc::now())
            .await
            .unwrap();

        assert_eq!(repo.members(eng.group_id).await.unwrap().len(), 2);
        assert_eq!(repo.groups_of_user(ada, company).await.unwrap().len(), 2);

        let removed = repo.remove_user_from_company(ada, company).await.unwrap();
        assert_eq!(removed, 2);
        assert!(repo.groups_of_user(ada, company).await.unwrap().is_empty());
        assert_eq!(repo.members(eng.group_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_group_removes_member_rows() {
        let repo = GroupRepository::new(store());
        let company = Uuid::new_v4();
        let eng = group(company, "Engineering");
        repo.create(&eng).await.unwrap();
        let ada = Uuid::new_v4();
        repo.add_members(company, eng.group_id, &[ada], None, Utc::now())
            .await
            .unwrap();

        let former = repo.delete(company, eng.group_id).await.unwrap();
        assert_eq!(former, vec![ada]);
        assert!(repo.get(company, eng.group_id).await.unwrap().is_none());
        assert!(repo.members(eng.group_id).await.unwrap().is_empty());
        assert!(repo.list(company, None).await.unwrap().is_empty());
    }
}
