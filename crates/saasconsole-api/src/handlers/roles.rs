use crate::auth::SessionContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::services::email::Email;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::constants::{NOTIFICATION_REQUEST_COMPANY_ROLE_UPDATE, NOTIFICATION_ROLE_UPDATE};
use saasconsole_core::models::{
    AssignRolesRequest, CompanyUser, CreateRoleRequest, LogAction, LogInfo, LogModuleParams,
    LogType, Notification, NotificationContent, PageQuery, PendingRoleRequest, Permission,
    RequestRolesRequest, Role, RoleWithUsage, Status, UpdateRoleRequest, UserRole,
};
use saasconsole_core::validation::parse_permissions;
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleInUseResponse {
    pub role_id: Uuid,
    pub in_use: bool,
    pub users_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRoleResponse {
    pub role_id: Uuid,
    /// Assignments removed together with the role
    pub unassigned: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleAssignmentResponse {
    pub user_ids: Vec<Uuid>,
    pub roles: Vec<Role>,
}

fn premade_is_read_only(role: &Role) -> Result<(), AppError> {
    if role.premade {
        return Err(AppError::InvalidRole(format!(
            "Premade role '{}' cannot be changed",
            role.name
        )));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name taken", body = ErrorResponse),
        (status = 422, description = "Unknown permission", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CreateRoleRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AddRole)
        .await?;
    let permissions = parse_permissions(&req.permissions)?;
    let name = req.name.trim().to_string();
    if !state.db.roles.is_name_unique(company_id, &name, None).await? {
        return Err(AppError::RoleAlreadyExists(name).into());
    }

    let role = Role {
        role_id: Uuid::new_v4(),
        company_id: Some(company_id),
        search_key: name.to_lowercase(),
        name,
        description: req.description,
        permissions,
        premade: false,
        status: Status::Active,
        created_by: Some(actor),
        created_at: Utc::now(),
        updated_at: None,
    };
    state.db.roles.create(company_id, &role).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Role,
            LogAction::AddRole,
            LogInfo {
                role: Some(role.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "roles",
    params(PageQuery),
    responses((status = 200, description = "Premade and custom roles with their user counts", body = Vec<RoleWithUsage>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;

    let search = query.search_text();
    let roles = state.db.roles.list(company_id, search.as_deref()).await?;
    let mut out = Vec::with_capacity(roles.len());
    for role in roles {
        let users_count = state.db.roles.count_users(company_id, role.role_id).await?;
        out.push(RoleWithUsage { role, users_count });
    }
    Ok(Json(out))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    Ok(Json(state.db.roles.require(company_id, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}/in-use",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Whether any member holds the role", body = RoleInUseResponse))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn role_in_use(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    state.db.roles.require(company_id, id).await?;
    let users_count = state.db.roles.count_users(company_id, id).await?;
    Ok(Json(RoleInUseResponse {
        role_id: id,
        in_use: users_count > 0,
        users_count,
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 409, description = "Role name taken", body = ErrorResponse),
        (status = 422, description = "Premade role or unknown permission", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::EditRole)
        .await?;
    let old = state.db.roles.require(company_id, id).await?;
    premade_is_read_only(&old)?;

    let mut role = old.clone();
    if let Some(name) = req.name.as_deref().map(str::trim) {
        if !name.eq_ignore_ascii_case(&old.name)
            && !state
                .db
                .roles
                .is_name_unique(company_id, name, Some(id))
                .await?
        {
            return Err(AppError::RoleAlreadyExists(name.to_string()).into());
        }
        role.name = name.to_string();
        role.search_key = name.to_lowercase();
    }
    if let Some(description) = req.description {
        role.description = description;
    }
    if let Some(permissions) = &req.permissions {
        role.permissions = parse_permissions(permissions)?;
    }
    role.updated_at = Some(Utc::now());
    state.db.roles.save(company_id, &role).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Role,
            LogAction::UpdateRole,
            LogInfo {
                role: Some(LogModuleParams::changed(
                    id,
                    &json!({"Name": old.name, "Description": old.description, "Permissions": old.permissions}),
                    &json!({"Name": role.name, "Description": role.description, "Permissions": role.permissions}),
                )),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = DeleteRoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 422, description = "Premade role", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveRole)
        .await?;
    let role = state.db.roles.require(company_id, id).await?;
    premade_is_read_only(&role)?;

    let unassigned = state.db.roles.delete(company_id, id).await?;
    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Role,
            LogAction::DeleteRole,
            LogInfo {
                role: Some(role.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(DeleteRoleResponse {
        role_id: id,
        unassigned,
    }))
}

/// Load every role and every member named by an assignment request.
async fn assignment_targets(
    state: &AppState,
    company_id: Uuid,
    req: &AssignRolesRequest,
) -> Result<(Vec<Role>, Vec<CompanyUser>), AppError> {
    let mut roles = Vec::with_capacity(req.role_ids.len());
    for &role_id in &req.role_ids {
        roles.push(state.db.roles.require(company_id, role_id).await?);
    }
    let mut members = Vec::with_capacity(req.user_ids.len());
    for &user_id in &req.user_ids {
        members.push(state.db.memberships.require(company_id, user_id).await?);
    }
    Ok((roles, members))
}

/// Notify each member in-app and by email that their roles changed.
async fn announce_role_change(
    state: &AppState,
    company_id: Uuid,
    members: &[CompanyUser],
    roles: &[Role],
    action: &str,
) -> Result<(), AppError> {
    let now = Utc::now();
    let role_names: Vec<String> = roles.iter().map(|r| r.name.clone()).collect();
    let notifications: Vec<Notification> = members
        .iter()
        .map(|m| {
            Notification::new(
                m.user_id,
                company_id,
                NOTIFICATION_ROLE_UPDATE,
                NotificationContent {
                    title: "Your roles changed".to_string(),
                    message: format!("Roles {}: {}", action, role_names.join(", ")),
                    role_ids: roles.iter().map(|r| r.role_id).collect(),
                    ..Default::default()
                },
                now,
            )
        })
        .collect();
    state.db.notifications.put_many(&notifications).await?;

    state.email.submit_all(members.iter().map(|m| {
        Email::access_changed(&m.full_name(), &m.email, &m.company_name, action, &role_names)
    }));
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/assign",
    tag = "roles",
    request_body = AssignRolesRequest,
    responses(
        (status = 200, description = "Roles assigned", body = RoleAssignmentResponse),
        (status = 403, description = "Missing ASSIGN_ROLE", body = ErrorResponse),
        (status = 404, description = "Unknown role or member", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(users = req.user_ids.len(), roles = req.role_ids.len()))]
pub async fn assign_roles(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<AssignRolesRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AssignRole)
        .await?;
    let (roles, members) = assignment_targets(&state, company_id, &req).await?;

    let now = Utc::now();
    let assignments: Vec<UserRole> = members
        .iter()
        .flat_map(|m| {
            roles.iter().map(move |r| UserRole {
                user_id: m.user_id,
                role_id: r.role_id,
                company_id,
                assigned_by: Some(actor),
                created_at: now,
            })
        })
        .collect();
    state.db.roles.assign(&assignments).await?;
    announce_role_change(&state, company_id, &members, &roles, "assigned").await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Role,
            LogAction::AssignRole,
            LogInfo {
                users: members.iter().map(CompanyUser::log_entry).collect(),
                roles: roles.iter().map(Role::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(RoleAssignmentResponse {
        user_ids: req.user_ids,
        roles,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/unassign",
    tag = "roles",
    request_body = AssignRolesRequest,
    responses(
        (status = 200, description = "Roles unassigned", body = RoleAssignmentResponse),
        (status = 403, description = "Missing UNASSIGN_ROLE", body = ErrorResponse),
        (status = 404, description = "Unknown role or member", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(users = req.user_ids.len(), roles = req.role_ids.len()))]
pub async fn unassign_roles(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<AssignRolesRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::UnassignRole)
        .await?;
    let (roles, members) = assignment_targets(&state, company_id, &req).await?;

    let pairs: Vec<(Uuid, Uuid)> = members
        .iter()
        .flat_map(|m| roles.iter().map(move |r| (m.user_id, r.role_id)))
        .collect();
    state.db.roles.unassign(company_id, &pairs).await?;
    announce_role_change(&state, company_id, &members, &roles, "unassigned").await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Role,
            LogAction::UnassignRole,
            LogInfo {
                users: members.iter().map(CompanyUser::log_entry).collect(),
                roles: roles.iter().map(Role::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(RoleAssignmentResponse {
        user_ids: req.user_ids,
        roles,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/request",
    tag = "roles",
    request_body = RequestRolesRequest,
    responses(
        (status = 201, description = "Request sent to the company admins", body = PendingRoleRequest),
        (status = 404, description = "Unknown role", body = ErrorResponse),
        (status = 409, description = "Another request is pending", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(user_id = %ctx.user_id()))]
pub async fn request_roles(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<RequestRolesRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let user_id = ctx.user_id();
    let requester = state.permissions.require_member(user_id, company_id).await?;
    if state
        .db
        .role_requests
        .pending_for_user(user_id, company_id)
        .await?
        .is_some()
    {
        return Err(AppError::RequestAlreadySubmitted.into());
    }
    for &role_id in &req.role_ids {
        state.db.roles.require(company_id, role_id).await?;
    }

    let now = Utc::now();
    let request_id = Uuid::now_v7();
    let admins = state.permissions.company_admins(company_id).await?;
    let notifications: Vec<Notification> = admins
        .iter()
        .map(|admin| {
            let mut notification = Notification::new(
                admin.user_id,
                company_id,
                NOTIFICATION_REQUEST_COMPANY_ROLE_UPDATE,
                NotificationContent {
                    title: format!("{} requested new roles", requester.full_name()),
                    message: req.message.clone(),
                    requester_id: Some(user_id),
                    request_id: Some(request_id),
                    role_ids: req.role_ids.clone(),
                },
                now,
            );
            notification.status = Status::Pending;
            notification
        })
        .collect();
    state.db.notifications.put_many(&notifications).await?;

    let request = PendingRoleRequest {
        request_id,
        company_id,
        user_id,
        role_ids: req.role_ids,
        message: req.message,
        status: Status::Pending,
        notification_ids: notifications.iter().map(|n| n.notification_id).collect(),
        handled_by: None,
        created_at: now,
        updated_at: None,
    };
    state.db.role_requests.put(&request).await?;

    tracing::info!(request_id = %request_id, admins = admins.len(), "Role request submitted");
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/requests/pending",
    tag = "roles",
    responses(
        (status = 200, description = "Open role requests of the company", body = Vec<PendingRoleRequest>),
        (status = 403, description = "Missing ASSIGN_ROLE", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_pending_requests(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require(ctx.user_id(), company_id, Permission::AssignRole)
        .await?;
    Ok(Json(state.db.role_requests.list_pending(company_id).await?))
}
