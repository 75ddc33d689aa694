//! Domain route groups (companies, users, roles, groups, etc.).

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use std::sync::Arc;

pub fn company_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/companies", API_PREFIX),
            post(handlers::companies::create_company).get(handlers::companies::list_companies),
        )
        .route(
            &format!("{}/companies/active", API_PREFIX),
            get(handlers::companies::get_active_company)
                .patch(handlers::companies::set_active_company),
        )
        .route(
            &format!("{}/companies/{{id}}", API_PREFIX),
            get(handlers::companies::get_company).put(handlers::companies::update_company),
        )
        .route(
            &format!("{}/companies/{{id}}/logo", API_PREFIX),
            patch(handlers::companies::update_company_logo),
        )
        .route(
            &format!("{}/companies/{{id}}/users", API_PREFIX),
            get(handlers::companies::list_company_users),
        )
        .route(
            &format!("{}/companies/{{id}}/users/count", API_PREFIX),
            get(handlers::companies::count_company_users),
        )
        .route(
            &format!("{}/companies/{{id}}/groups", API_PREFIX),
            get(handlers::companies::list_company_groups),
        )
        .route(
            &format!("{}/companies/{{id}}/setup-wizard", API_PREFIX),
            patch(handlers::companies::complete_setup_wizard),
        )
        .with_state(state)
}

pub fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/users", API_PREFIX),
            get(handlers::users::list_users).post(handlers::users::add_users),
        )
        .route(
            &format!("{}/users/me", API_PREFIX),
            get(handlers::users::get_current_user),
        )
        .route(
            &format!("{}/users/status", API_PREFIX),
            patch(handlers::users::update_users_status),
        )
        .route(
            &format!("{}/users/remove", API_PREFIX),
            post(handlers::users::remove_users),
        )
        .route(
            &format!("{}/users/restore", API_PREFIX),
            post(handlers::users::restore_users),
        )
        .route(
            &format!("{}/users/permanently-delete", API_PREFIX),
            post(handlers::users::permanently_delete_users),
        )
        .route(
            &format!("{}/users/check-email", API_PREFIX),
            post(handlers::users::check_email),
        )
        .route(
            &format!("{}/users/remove-jobs", API_PREFIX),
            post(handlers::jobs::schedule_removals),
        )
        .route(
            &format!("{}/users/cron-jobs", API_PREFIX),
            post(handlers::jobs::schedule_group_change),
        )
        .route(
            &format!("{}/users/{{id}}", API_PREFIX),
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::remove_user),
        )
        .route(
            &format!("{}/users/{{id}}/email", API_PREFIX),
            patch(handlers::users::update_user_email),
        )
        .with_state(state)
}

/// Reached from the invitation email, before the invitee has a session.
pub fn invitation_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/users/invitations/accept", API_PREFIX),
            post(handlers::users::accept_invitation),
        )
        .with_state(state)
}

pub fn role_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/roles", API_PREFIX),
            get(handlers::roles::list_roles).post(handlers::roles::create_role),
        )
        .route(
            &format!("{}/roles/assign", API_PREFIX),
            post(handlers::roles::assign_roles),
        )
        .route(
            &format!("{}/roles/unassign", API_PREFIX),
            post(handlers::roles::unassign_roles),
        )
        .route(
            &format!("{}/roles/request", API_PREFIX),
            post(handlers::roles::request_roles),
        )
        .route(
            &format!("{}/roles/requests/pending", API_PREFIX),
            get(handlers::roles::list_pending_requests),
        )
        .route(
            &format!("{}/roles/{{id}}", API_PREFIX),
            get(handlers::roles::get_role)
                .put(handlers::roles::update_role)
                .delete(handlers::roles::delete_role),
        )
        .route(
            &format!("{}/roles/{{id}}/in-use", API_PREFIX),
            get(handlers::roles::role_in_use),
        )
        .route(
            &format!("{}/requests/{{notification_id}}/accept", API_PREFIX),
            post(handlers::requests::accept_request),
        )
        .route(
            &format!("{}/requests/{{notification_id}}/reject", API_PREFIX),
            post(handlers::requests::reject_request),
        )
        .with_state(state)
}

pub fn group_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/groups", API_PREFIX),
            get(handlers::groups::list_groups).post(handlers::groups::create_group),
        )
        .route(
            &format!("{}/groups/{{id}}", API_PREFIX),
            get(handlers::groups::get_group)
                .put(handlers::groups::update_group)
                .delete(handlers::groups::delete_group),
        )
        .route(
            &format!("{}/groups/{{id}}/members", API_PREFIX),
            get(handlers::groups::list_group_members)
                .post(handlers::groups::add_group_members)
                .delete(handlers::groups::remove_group_members),
        )
        .with_state(state)
}

pub fn department_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/departments", API_PREFIX),
            get(handlers::departments::list_departments)
                .post(handlers::departments::create_department),
        )
        .route(
            &format!("{}/departments/{{id}}", API_PREFIX),
            get(handlers::departments::get_department)
                .put(handlers::departments::update_department)
                .delete(handlers::departments::delete_department),
        )
        .route(
            &format!("{}/departments/{{id}}/groups", API_PREFIX),
            get(handlers::departments::list_department_groups),
        )
        .route(
            &format!("{}/departments/{{id}}/members", API_PREFIX),
            get(handlers::departments::list_department_members)
                .post(handlers::departments::add_department_members)
                .delete(handlers::departments::remove_department_members),
        )
        .with_state(state)
}

pub fn notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/notifications", API_PREFIX),
            get(handlers::notifications::list_notifications),
        )
        .route(
            &format!("{}/notifications/read-all", API_PREFIX),
            put(handlers::notifications::mark_all_read),
        )
        .route(
            &format!("{}/notifications/{{id}}", API_PREFIX),
            delete(handlers::notifications::delete_notification),
        )
        .route(
            &format!("{}/notifications/{{id}}/seen", API_PREFIX),
            patch(handlers::notifications::mark_seen),
        )
        .with_state(state)
}

pub fn integration_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/integrations", API_PREFIX),
            get(handlers::integrations::list_integrations)
                .post(handlers::integrations::connect_integration),
        )
        .route(
            &format!("{}/integrations/{{id}}", API_PREFIX),
            delete(handlers::integrations::disconnect_integration),
        )
        .with_state(state)
}

pub fn log_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/logs", API_PREFIX), get(handlers::logs::list_logs))
        .with_state(state)
}
