use super::containers::Containers;
use crate::store::ItemStore;
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::models::{Department, DepartmentMember};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for departments and department membership rows
#[derive(Clone)]
pub struct DepartmentRepository {
    rows: Containers,
}

impl DepartmentRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            rows: Containers::new(
                store,
                PREFIX_DEPARTMENT,
                ENTITY_TYPE_DEPARTMENT,
                ENTITY_TYPE_DEPARTMENT_MEMBER,
                "DepartmentID",
            ),
        }
    }

    fn normalized(department: &Department) -> Department {
        let mut department = department.clone();
        department.search_key = department.name.trim().to_lowercase();
        department
    }

    #[tracing::instrument(skip(self, department), fields(db.entity = "department", db.operation = "insert", db.record_id = %department.department_id))]
    pub async fn create(&self, department: &Department) -> Result<(), AppError> {
        self.rows
            .create(
                department.company_id,
                department.department_id,
                &Self::normalized(department),
            )
            .await
    }

    #[tracing::instrument(skip(self, department), fields(db.entity = "department", db.operation = "update", db.record_id = %department.department_id))]
    pub async fn save(&self, department: &Department) -> Result<(), AppError> {
        self.rows
            .save(
                department.company_id,
                department.department_id,
                &Self::normalized(department),
            )
            .await
    }

    #[tracing::instrument(skip(self), fields(db.entity = "department", db.operation = "select", db.record_id = %department_id))]
    pub async fn get(
        &self,
        company_id: Uuid,
        department_id: Uuid,
    ) -> Result<Option<Department>, AppError> {
        self.rows.get(company_id, department_id).await
    }

    pub async fn require(&self, company_id: Uuid, department_id: Uuid) -> Result<Department, AppError> {
        self.get(company_id, department_id)
            .await?
            .ok_or_else(|| AppError::DepartmentNotFound(department_id.to_string()))
    }

    #[tracing::instrument(skip(self), fields(db.entity = "department", db.operation = "delete", db.record_id = %department_id))]
    pub async fn delete(&self, company_id: Uuid, department_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.rows.delete(company_id, department_id).await
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Department>, AppError> {
        self.rows.list(company_id, search).await
    }

    pub async fn is_name_unique(
        &self,
        company_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppError> {
        self.rows.is_name_unique(company_id, name, exclude).await
    }

    #[tracing::instrument(skip(self, user_ids), fields(db.entity = "department_member", db.operation = "batch_insert", db.count = user_ids.len()))]
    pub async fn add_members(
        &self,
        company_id: Uuid,
        department_id: Uuid,
        user_ids: &[Uuid],
        added_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DepartmentMember>, AppError> {
        let members: Vec<DepartmentMember> = user_ids
            .iter()
            .map(|user_id| DepartmentMember {
                department_id,
                user_id: *user_id,
                company_id,
                added_by,
                created_at: now,
            })
            .collect();
        self.rows
            .put_members(&members, |m| (m.department_id, m.user_id))
            .await?;
        Ok(members)
    }

    pub async fn remove_members(&self, department_id: Uuid, user_ids: &[Uuid]) -> Result<(), AppError> {
        self.rows.remove_members(department_id, user_ids).await
    }

    pub async fn members(&self, department_id: Uuid) -> Result<Vec<DepartmentMember>, AppError> {
        self.rows.members(department_id).await
    }

    pub async fn departments_of_user(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Department>, AppError> {
        let memberships: Vec<DepartmentMember> =
            self.rows.memberships_of_user(user_id, company_id).await?;
        let mut departments = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(department) = self.get(company_id, membership.department_id).await? {
                departments.push(department);
            }
        }
        Ok(departments)
    }

    pub async fn remove_user_from_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<usize, AppError> {
        self.rows.remove_user_from_company(user_id, company_id).await
    }
}
