//! OpenAPI documentation served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use saasconsole_core::models;
use saasconsole_infra::ErrorResponse;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SaaS Console API",
        version = "0.1.0",
        description = "Multi-tenant administration API: companies, members, roles and permissions, groups, departments, integrations and the audit log. All endpoints are versioned under /api/v1/ and require a bearer token."
    ),
    modifiers(&BearerAuth),
    security(("bearer_auth" = [])),
    paths(
        // Companies
        handlers::companies::create_company,
        handlers::companies::list_companies,
        handlers::companies::get_company,
        handlers::companies::update_company,
        handlers::companies::update_company_logo,
        handlers::companies::get_active_company,
        handlers::companies::set_active_company,
        handlers::companies::list_company_users,
        handlers::companies::count_company_users,
        handlers::companies::list_company_groups,
        handlers::companies::complete_setup_wizard,
        // Users
        handlers::users::get_current_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::add_users,
        handlers::users::accept_invitation,
        handlers::users::update_user,
        handlers::users::update_users_status,
        handlers::users::update_user_email,
        handlers::users::remove_user,
        handlers::users::remove_users,
        handlers::users::restore_users,
        handlers::users::permanently_delete_users,
        handlers::users::check_email,
        // Scheduled jobs
        handlers::jobs::schedule_removals,
        handlers::jobs::schedule_group_change,
        // Roles
        handlers::roles::create_role,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::role_in_use,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::roles::assign_roles,
        handlers::roles::unassign_roles,
        handlers::roles::request_roles,
        handlers::roles::list_pending_requests,
        handlers::requests::accept_request,
        handlers::requests::reject_request,
        // Groups
        handlers::groups::create_group,
        handlers::groups::list_groups,
        handlers::groups::get_group,
        handlers::groups::update_group,
        handlers::groups::delete_group,
        handlers::groups::list_group_members,
        handlers::groups::add_group_members,
        handlers::groups::remove_group_members,
        // Departments
        handlers::departments::create_department,
        handlers::departments::list_departments,
        handlers::departments::get_department,
        handlers::departments::list_department_groups,
        handlers::departments::update_department,
        handlers::departments::delete_department,
        handlers::departments::list_department_members,
        handlers::departments::add_department_members,
        handlers::departments::remove_department_members,
        // Notifications
        handlers::notifications::list_notifications,
        handlers::notifications::mark_seen,
        handlers::notifications::mark_all_read,
        handlers::notifications::delete_notification,
        // Integrations
        handlers::integrations::list_integrations,
        handlers::integrations::connect_integration,
        handlers::integrations::disconnect_integration,
        // Logs
        handlers::logs::list_logs,
    ),
    components(
        schemas(
            // Companies
            models::Company,
            models::UserCompany,
            models::CreateCompanyRequest,
            models::UpdateCompanyRequest,
            models::UpdateCompanyLogoRequest,
            models::SetActiveCompanyRequest,
            handlers::companies::ActiveCompanyResponse,
            // Users and memberships
            models::User,
            models::UserResponse,
            models::CompanyUser,
            models::MemberCounts,
            models::NewUserInput,
            models::AddUsersRequest,
            models::AcceptInvitationRequest,
            models::UpdateUserRequest,
            models::UpdateUserStatusRequest,
            models::UpdateUserEmailRequest,
            models::CheckEmailRequest,
            models::UserIdsRequest,
            models::RemoveUsersRequest,
            models::Status,
            models::UserType,
            handlers::users::CurrentUserResponse,
            handlers::users::AddUsersResponse,
            handlers::users::RemoveUsersResponse,
            // Jobs
            models::Job,
            models::JobData,
            models::JobUser,
            models::CronJob,
            models::CronJobType,
            models::RemovalTarget,
            models::CreateRemoveUserJobRequest,
            models::CreateCronJobRequest,
            models::ScheduledRemovals,
            // Roles
            models::Permission,
            models::Role,
            models::UserRole,
            models::RoleWithUsage,
            models::CreateRoleRequest,
            models::UpdateRoleRequest,
            models::AssignRolesRequest,
            models::RequestRolesRequest,
            models::PendingRoleRequest,
            handlers::roles::RoleInUseResponse,
            handlers::roles::DeleteRoleResponse,
            handlers::roles::RoleAssignmentResponse,
            // Groups and departments
            models::Group,
            models::GroupMember,
            models::CreateGroupRequest,
            models::UpdateGroupRequest,
            models::MembersRequest,
            models::Department,
            models::DepartmentMember,
            models::CreateDepartmentRequest,
            models::UpdateDepartmentRequest,
            handlers::groups::DeleteGroupResponse,
            handlers::departments::DeleteDepartmentResponse,
            // Notifications
            models::Notification,
            models::NotificationContent,
            handlers::notifications::ReadAllResponse,
            // Integrations
            models::Integration,
            models::ConnectIntegrationRequest,
            // Logs
            models::LogType,
            models::LogAction,
            models::LogTemp,
            models::LogModuleParams,
            models::LogInfo,
            models::LogRecord,
            handlers::logs::LogsResponse,
            // Error
            ErrorResponse,
        )
    ),
    tags(
        (name = "companies", description = "Company creation, settings and the active company"),
        (name = "users", description = "Company members and their lifecycle"),
        (name = "jobs", description = "Scheduled removals and group changes"),
        (name = "roles", description = "Roles, assignments and role requests"),
        (name = "groups", description = "Groups and their members"),
        (name = "departments", description = "Departments, their groups and members"),
        (name = "notifications", description = "Notifications of the current user"),
        (name = "integrations", description = "Connected third-party integrations"),
        (name = "logs", description = "Audit log of the active company")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_versioned_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v1/companies"));
        assert!(spec.paths.paths.contains_key("/api/v1/roles/{id}"));
        assert!(spec.paths.paths.contains_key("/api/v1/logs"));
        assert!(spec.paths.paths.keys().all(|p| p.starts_with("/api/v1/")));
    }
}
