use saasconsole_core::models::{CompanyUser, Permission, Status};
use saasconsole_core::AppError;
use saasconsole_db::{MemberFilter, MembershipRepository, RoleRepository};
use uuid::Uuid;

/// Resolves what a member may do in a company.
///
/// Owners may do everything. Everyone else needs an ACTIVE membership and an
/// assigned role granting the permission; the premade company admin role
/// grants every permission.
#[derive(Clone)]
pub struct PermissionChecker {
    memberships: MembershipRepository,
    roles: RoleRepository,
}

impl PermissionChecker {
    pub fn new(memberships: MembershipRepository, roles: RoleRepository) -> Self {
        Self { memberships, roles }
    }

    pub async fn has_permission(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        permission: Permission,
    ) -> Result<bool, AppError> {
        let Some(member) = self.memberships.get(company_id, user_id).await? else {
            return Ok(false);
        };
        if member.status != Status::Active {
            return Ok(false);
        }
        if member.is_owner() {
            return Ok(true);
        }
        let roles = self.roles.roles_of_user(user_id, company_id).await?;
        Ok(roles
            .iter()
            .any(|role| role.is_company_admin() || role.grants(permission)))
    }

    /// Fail with 403 unless the user holds `permission` in the company.
    pub async fn require(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        permission: Permission,
    ) -> Result<(), AppError> {
        if self.has_permission(user_id, company_id, permission).await? {
            Ok(())
        } else {
            tracing::debug!(%user_id, %company_id, permission = %permission, "Permission denied");
            Err(AppError::Forbidden(format!(
                "Missing permission {}",
                permission
            )))
        }
    }

    /// The caller's own ACTIVE membership, or 403.
    pub async fn require_member(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<CompanyUser, AppError> {
        match self.memberships.get(company_id, user_id).await? {
            Some(member) if member.status == Status::Active => Ok(member),
            _ => Err(AppError::Forbidden(
                "Not an active member of this company".to_string(),
            )),
        }
    }

    /// Active members able to approve role requests: owners and company admins.
    pub async fn company_admins(&self, company_id: Uuid) -> Result<Vec<CompanyUser>, AppError> {
        let active = self
            .memberships
            .list_all(
                company_id,
                &MemberFilter {
                    statuses: vec![Status::Active],
                    search: None,
                },
            )
            .await?;

        let mut admins = Vec::new();
        for member in active {
            if member.is_owner() {
                admins.push(member);
                continue;
            }
            let roles = self.roles.roles_of_user(member.user_id, company_id).await?;
            if roles.iter().any(|r| r.is_company_admin()) {
                admins.push(member);
            }
        }
        Ok(admins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use saasconsole_core::models::{company_admin_role_id, Role, User, UserRole, UserType};
    use saasconsole_db::MemoryStore;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User {
            user_id: Uuid::new_v4(),
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            job_title: String::new(),
            contact_number: String::new(),
            display_photo: None,
            status: Status::Active,
            active_company: None,
            user_token: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    struct Fixture {
        checker: PermissionChecker,
        memberships: MembershipRepository,
        roles: RoleRepository,
        company: Uuid,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn saasconsole_db::ItemStore> = Arc::new(MemoryStore::new());
        let memberships = MembershipRepository::new(store.clone());
        let roles = RoleRepository::new(store);
        Fixture {
            checker: PermissionChecker::new(memberships.clone(), roles.clone()),
            memberships,
            roles,
            company: Uuid::new_v4(),
        }
    }

    async fn join(f: &Fixture, user: &User, user_type: UserType, status: Status) {
        let member =
            CompanyUser::for_user(user, f.company, "Acme", user_type, status, None, Utc::now());
        f.memberships.create(&member).await.unwrap();
    }

    async fn grant(f: &Fixture, user: &User, role_id: Uuid) {
        f.roles
            .assign(&[UserRole {
                user_id: user.user_id,
                role_id,
                company_id: f.company,
                assigned_by: None,
                created_at: Utc::now(),
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_owner_has_every_permission() {
        let f = fixture();
        let owner = user("owner@example.com");
        join(&f, &owner, UserType::CompanyOwner, Status::Active).await;
        assert!(f
            .checker
            .has_permission(owner.user_id, f.company, Permission::RemoveCompanyMember)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_custom_role_grants_only_its_permissions() {
        let f = fixture();
        let member = user("member@example.com");
        join(&f, &member, UserType::CompanyMember, Status::Active).await;
        let role = Role {
            role_id: Uuid::new_v4(),
            company_id: Some(f.company),
            name: "editors".into(),
            description: String::new(),
            permissions: vec![Permission::EditGroup],
            premade: false,
            status: Status::Active,
            created_by: None,
            search_key: "editors".into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        f.roles.create(f.company, &role).await.unwrap();
        grant(&f, &member, role.role_id).await;

        assert!(f
            .checker
            .has_permission(member.user_id, f.company, Permission::EditGroup)
            .await
            .unwrap());
        let err = f
            .checker
            .require(member.user_id, f.company, Permission::RemoveGroup)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_inactive_admin_is_denied_and_not_listed() {
        let f = fixture();
        let admin = user("admin@example.com");
        join(&f, &admin, UserType::CompanyMember, Status::Inactive).await;
        grant(&f, &admin, company_admin_role_id()).await;

        assert!(!f
            .checker
            .has_permission(admin.user_id, f.company, Permission::EditCompany)
            .await
            .unwrap());
        assert!(f.checker.company_admins(f.company).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_company_admins_include_owner_and_admin_role_holders() {
        let f = fixture();
        let owner = user("owner@example.com");
        let admin = user("admin@example.com");
        let plain = user("plain@example.com");
        join(&f, &owner, UserType::CompanyOwner, Status::Active).await;
        join(&f, &admin, UserType::CompanyMember, Status::Active).await;
        join(&f, &plain, UserType::CompanyMember, Status::Active).await;
        grant(&f, &admin, company_admin_role_id()).await;

        let mut ids: Vec<Uuid> = f
            .checker
            .company_admins(f.company)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        ids.sort();
        let mut expected = vec![owner.user_id, admin.user_id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
