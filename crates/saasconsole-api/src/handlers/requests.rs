//! Approval of role requests by company admins.

use crate::auth::SessionContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::constants::NOTIFICATION_REQUEST_COMPANY_ROLE_ACCEPT;
use saasconsole_core::models::{
    LogAction, LogInfo, LogType, Notification, NotificationContent, PendingRoleRequest,
    Permission, Role, Status, UserRole,
};
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accept,
    Reject,
}

impl Decision {
    fn status(self) -> Status {
        match self {
            Decision::Accept => Status::Done,
            Decision::Reject => Status::Rejected,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Decision::Accept => "accepted",
            Decision::Reject => "rejected",
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{notification_id}/accept",
    tag = "roles",
    params(("notification_id" = Uuid, Path, description = "Notification carrying the request")),
    responses(
        (status = 200, description = "Request accepted and roles assigned", body = PendingRoleRequest),
        (status = 403, description = "Missing ASSIGN_ROLE", body = ErrorResponse),
        (status = 404, description = "Notification or request not found", body = ErrorResponse),
        (status = 422, description = "Request already handled", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        decide(&state, ctx.user_id(), notification_id, Decision::Accept).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{notification_id}/reject",
    tag = "roles",
    params(("notification_id" = Uuid, Path, description = "Notification carrying the request")),
    responses(
        (status = 200, description = "Request rejected", body = PendingRoleRequest),
        (status = 403, description = "Missing ASSIGN_ROLE", body = ErrorResponse),
        (status = 404, description = "Notification or request not found", body = ErrorResponse),
        (status = 422, description = "Request already handled", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        decide(&state, ctx.user_id(), notification_id, Decision::Reject).await?,
    ))
}

async fn decide(
    state: &AppState,
    actor: Uuid,
    notification_id: Uuid,
    decision: Decision,
) -> Result<PendingRoleRequest, AppError> {
    let notification = state.db.notifications.require(actor, notification_id).await?;
    let company_id = notification.company_id;
    let (Some(request_id), Some(requester_id)) = (
        notification.content.request_id,
        notification.content.requester_id,
    ) else {
        return Err(AppError::BadRequest(
            "Notification does not carry a role request".to_string(),
        ));
    };
    state
        .permissions
        .require(actor, company_id, Permission::AssignRole)
        .await?;

    let request = state
        .db
        .role_requests
        .get(requester_id, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role request {}", request_id)))?;
    if request.status != Status::Pending {
        return Err(AppError::Unprocessable(format!(
            "Role request is already {}",
            request.status
        )));
    }

    let now = Utc::now();
    let roles = if decision == Decision::Accept {
        grant_requested_roles(state, actor, &request).await?
    } else {
        Vec::new()
    };

    let handled = state
        .db
        .role_requests
        .set_status(requester_id, request_id, decision.status(), actor, now)
        .await?;

    // Every admin got a copy of the request; close them all
    for admin in state.permissions.company_admins(company_id).await? {
        for &id in &request.notification_ids {
            if state.db.notifications.get(admin.user_id, id).await?.is_some() {
                state
                    .db
                    .notifications
                    .set_status(admin.user_id, id, decision.status(), now)
                    .await?;
            }
        }
    }
    if !request.notification_ids.contains(&notification_id) {
        state
            .db
            .notifications
            .set_status(actor, notification_id, decision.status(), now)
            .await?;
    }

    state
        .db
        .notifications
        .put(&Notification::new(
            requester_id,
            company_id,
            NOTIFICATION_REQUEST_COMPANY_ROLE_ACCEPT,
            NotificationContent {
                title: format!("Your role request was {}", decision.verb()),
                message: roles
                    .iter()
                    .map(|r| r.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                request_id: Some(request_id),
                role_ids: request.role_ids.clone(),
                ..Default::default()
            },
            now,
        ))
        .await?;

    tracing::info!(request_id = %request_id, decision = decision.verb(), "Role request handled");
    Ok(handled)
}

async fn grant_requested_roles(
    state: &AppState,
    actor: Uuid,
    request: &PendingRoleRequest,
) -> Result<Vec<Role>, AppError> {
    let company_id = request.company_id;
    let member = state
        .db
        .memberships
        .require(company_id, request.user_id)
        .await?;
    let mut roles = Vec::with_capacity(request.role_ids.len());
    for &role_id in &request.role_ids {
        roles.push(state.db.roles.require(company_id, role_id).await?);
    }

    let now = Utc::now();
    let assignments: Vec<UserRole> = roles
        .iter()
        .map(|r| UserRole {
            user_id: request.user_id,
            role_id: r.role_id,
            company_id,
            assigned_by: Some(actor),
            created_at: now,
        })
        .collect();
    state.db.roles.assign(&assignments).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Role,
            LogAction::AssignRole,
            LogInfo {
                users: vec![member.log_entry()],
                roles: roles.iter().map(Role::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;
    Ok(roles)
}
