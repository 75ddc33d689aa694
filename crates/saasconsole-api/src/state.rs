//! Application state.
//!
//! Repositories are grouped in `DbState`; the services built on top of them sit
//! next to it in `AppState`.

use crate::auth::JwtService;
use crate::email_queue::EmailJobQueue;
use crate::services::audit::AuditLogger;
use crate::services::integration_cleanup::IntegrationCleanup;
use crate::services::permissions::PermissionChecker;
use saasconsole_core::Config;
use saasconsole_db::{
    CompanyRepository, DepartmentRepository, GroupRepository, IntegrationRepository, ItemStore,
    JobRepository, LogRepository, MembershipRepository, NotificationRepository, RoleRepository,
    RoleRequestRepository, UserRepository,
};
use std::sync::Arc;

/// The store and every repository over it.
#[derive(Clone)]
pub struct DbState {
    pub store: Arc<dyn ItemStore>,
    pub companies: CompanyRepository,
    pub users: UserRepository,
    pub memberships: MembershipRepository,
    pub roles: RoleRepository,
    pub role_requests: RoleRequestRepository,
    pub groups: GroupRepository,
    pub departments: DepartmentRepository,
    pub logs: LogRepository,
    pub notifications: NotificationRepository,
    pub integrations: IntegrationRepository,
    pub jobs: JobRepository,
}

impl DbState {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            companies: CompanyRepository::new(store.clone()),
            users: UserRepository::new(store.clone()),
            memberships: MembershipRepository::new(store.clone()),
            roles: RoleRepository::new(store.clone()),
            role_requests: RoleRequestRepository::new(store.clone()),
            groups: GroupRepository::new(store.clone()),
            departments: DepartmentRepository::new(store.clone()),
            logs: LogRepository::new(store.clone()),
            notifications: NotificationRepository::new(store.clone()),
            integrations: IntegrationRepository::new(store.clone()),
            jobs: JobRepository::new(store.clone()),
            store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: DbState,
    pub jwt: JwtService,
    pub audit: AuditLogger,
    pub permissions: PermissionChecker,
    pub email: EmailJobQueue,
    pub integration_cleanup: Arc<dyn IntegrationCleanup>,
}
