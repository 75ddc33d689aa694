use crate::auth::SessionContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::{list_members, MemberListQuery};
use crate::services::email::Email;
use crate::services::members::{changeable_members, remove_members};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::constants::DEFAULT_USER_TOKEN;
use saasconsole_core::models::{
    AcceptInvitationRequest, AddUsersRequest, CheckEmailRequest, CompanyUser, Group, LogAction,
    LogInfo, LogModuleParams, LogType, Paginated, Permission, RemoveUsersRequest, Role, Status,
    UpdateUserEmailRequest, UpdateUserRequest, UpdateUserStatusRequest, User, UserIdsRequest,
    UserResponse, UserType,
};
use saasconsole_core::validation::{
    duplicate_emails, normalize_email, parse_status, require_ids, unique_by_email,
};
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// The caller with their view of the active company
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
    pub company_id: Option<Uuid>,
    pub membership: Option<CompanyUser>,
    pub roles: Vec<Role>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddUsersResponse {
    pub added: Vec<CompanyUser>,
    /// Emails that were already members and were left untouched
    pub existing: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveUsersResponse {
    pub removed: Vec<CompanyUser>,
    /// `"<slug>-error"` to the failure message of each failing integration
    pub integration_errors: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RemoveUserQuery {
    #[serde(default)]
    pub remove_integration_accounts: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses((status = 200, description = "Current user", body = CurrentUserResponse))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let user_id = ctx.user_id();
    let (membership, roles, groups) = match ctx.company_id {
        Some(company_id) => (
            state.db.memberships.get(company_id, user_id).await?,
            state.db.roles.roles_of_user(user_id, company_id).await?,
            state.db.groups.groups_of_user(user_id, company_id).await?,
        ),
        None => (None, Vec::new(), Vec::new()),
    };

    Ok(Json(CurrentUserResponse {
        company_id: ctx.company_id,
        user: ctx.user.into(),
        membership,
        roles,
        groups,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(MemberListQuery),
    responses(
        (status = 200, description = "One page of members of the active company", body = Paginated<CompanyUser>),
        (status = 422, description = "No active company or unknown status filter", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Query(query): Query<MemberListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    Ok(Json(list_members(&state, company_id, &query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Membership of the user in the active company", body = CompanyUser),
        (status = 404, description = "Not a member", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    Ok(Json(state.db.memberships.require(company_id, id).await?))
}

fn invite_link(state: &AppState, token: &str) -> String {
    format!(
        "{}/verify-email?token={}",
        state.config.frontend_url().unwrap_or_default().trim_end_matches('/'),
        token
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = AddUsersRequest,
    responses(
        (status = 201, description = "Users added or invited", body = AddUsersResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Missing ADD_COMPANY_MEMBER", body = ErrorResponse),
        (status = 409, description = "Duplicate emails in the request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.users.len(), create_account = req.create_account))]
pub async fn add_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<AddUsersRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AddCompanyMember)
        .await?;
    let company = state.db.companies.require(company_id).await?;

    let duplicates = duplicate_emails(&req.users);
    if !duplicates.is_empty() {
        return Err(AppError::DuplicateEmailAddresses(duplicates).into());
    }

    let now = Utc::now();
    let member_status = if req.create_account {
        Status::Pending
    } else {
        Status::Active
    };

    let mut existing = Vec::new();
    let mut new_users = Vec::new();
    let mut reissued = Vec::new();
    let mut rows = Vec::new();
    let mut invites = Vec::new();

    for input in unique_by_email(req.users) {
        if let Some(member) = state
            .db
            .memberships
            .find_by_email(company_id, &input.email)
            .await?
        {
            if Status::PRESENT.contains(&member.status) {
                existing.push(input.email);
                continue;
            }
        }

        let user = match state.db.users.find_by_email(&input.email).await? {
            Some(user) => {
                if req.create_account {
                    // The latest invitation replaces any earlier link
                    let token = state.jwt.issue(user.user_id, Some(company_id))?;
                    reissued.push((user.user_id, token));
                }
                user
            }
            None => {
                let user_id = Uuid::new_v4();
                let user_token = if req.create_account {
                    state.jwt.issue(user_id, Some(company_id))?
                } else {
                    DEFAULT_USER_TOKEN.to_string()
                };
                let user = User {
                    user_id,
                    email: input.email.clone(),
                    first_name: input.first_name.trim().to_string(),
                    last_name: input.last_name.trim().to_string(),
                    job_title: input.job_title,
                    contact_number: input.contact_number,
                    display_photo: None,
                    status: Status::Active,
                    active_company: None,
                    user_token,
                    created_at: now,
                    updated_at: None,
                };
                new_users.push(user.clone());
                user
            }
        };

        if req.create_account {
            let token = reissued
                .iter()
                .find(|(id, _)| *id == user.user_id)
                .map(|(_, token)| token.as_str())
                .unwrap_or(user.user_token.as_str());
            invites.push(Email::invitation(
                &user.full_name(),
                &user.email,
                &company.name,
                &invite_link(&state, token),
            ));
        }
        rows.push(CompanyUser::for_user(
            &user,
            company_id,
            &company.name,
            UserType::CompanyMember,
            member_status,
            Some(actor),
            now,
        ));
    }

    state.db.users.put_many(&new_users).await?;
    for (user_id, token) in &reissued {
        state.db.users.set_user_token(*user_id, token, now).await?;
    }
    state.db.memberships.put_many(&rows).await?;
    state.email.submit_all(invites);

    if !rows.is_empty() {
        state
            .audit
            .record(
                actor,
                company_id,
                LogType::User,
                LogAction::AddCompanyMembers,
                LogInfo {
                    users: rows.iter().map(CompanyUser::log_entry).collect(),
                    ..Default::default()
                },
            )
            .await;
    }

    tracing::info!(
        added = rows.len(),
        created = new_users.len(),
        existing = existing.len(),
        "Company members added"
    );
    Ok((
        StatusCode::CREATED,
        Json(AddUsersResponse {
            added: rows,
            existing,
        }),
    ))
}

/// Accept the invitation carried by the emailed link.
///
/// Public: the invitation token is the credential. It must be the one last
/// issued to the user, and it is cleared once used.
#[utoipa::path(
    post,
    path = "/api/v1/users/invitations/accept",
    tag = "users",
    request_body = AcceptInvitationRequest,
    responses(
        (status = 200, description = "Membership is now ACTIVE", body = CompanyUser),
        (status = 401, description = "Invalid, expired or superseded token", body = ErrorResponse),
        (status = 404, description = "User or membership not found", body = ErrorResponse),
        (status = 422, description = "No pending invitation", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, req))]
pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<AcceptInvitationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let claims = state.jwt.validate(&req.token)?;
    let company_id = claims.company_id.ok_or_else(|| {
        AppError::InvalidToken("Invitation token is not scoped to a company".to_string())
    })?;
    let user = state.db.users.require(claims.sub).await?;
    if user.user_token != req.token {
        return Err(AppError::InvalidToken("Invitation is no longer valid".to_string()).into());
    }

    let membership = state.db.memberships.require(company_id, user.user_id).await?;
    if membership.status != Status::Pending {
        return Err(AppError::Unprocessable(format!(
            "No pending invitation (membership is {})",
            membership.status
        ))
        .into());
    }

    let now = Utc::now();
    let accepted = state
        .db
        .memberships
        .update_status(company_id, user.user_id, Status::Active, user.user_id, now)
        .await?;
    state
        .db
        .users
        .set_user_token(user.user_id, DEFAULT_USER_TOKEN, now)
        .await?;
    if user.active_company.is_none() {
        state
            .db
            .users
            .set_active_company(user.user_id, Some(company_id), now)
            .await?;
    }

    state
        .audit
        .record(
            user.user_id,
            company_id,
            LogType::User,
            LogAction::UpdateUser,
            LogInfo {
                user: Some(LogModuleParams::changed(
                    user.user_id,
                    &serde_json::json!({"Status": membership.status}),
                    &serde_json::json!({"Status": accepted.status}),
                )),
                ..Default::default()
            },
        )
        .await;

    tracing::info!(user_id = %user.user_id, company_id = %company_id, "Invitation accepted");
    Ok(Json(accepted))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 403, description = "Missing EDIT_COMPANY_MEMBER", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let actor = ctx.user_id();
    let company_id = ctx.company_id;
    if id != actor {
        let company_id = ctx.company()?;
        state
            .permissions
            .require(actor, company_id, Permission::EditCompanyMember)
            .await?;
        state.db.memberships.require(company_id, id).await?;
    }

    let old = state.db.users.require(id).await?;
    let now = Utc::now();
    let updated = state.db.users.update_profile(id, &req, now).await?;
    state.db.memberships.sync_profile(&updated, now).await?;

    if let Some(company_id) = company_id {
        state
            .audit
            .record(
                actor,
                company_id,
                LogType::User,
                LogAction::UpdateUser,
                LogInfo {
                    user: Some(LogModuleParams::changed(
                        id,
                        &UserResponse::from(old),
                        &UserResponse::from(updated.clone()),
                    )),
                    ..Default::default()
                },
            )
            .await;
    }

    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/status",
    tag = "users",
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "Memberships updated", body = Vec<CompanyUser>),
        (status = 404, description = "A user is not a member", body = ErrorResponse),
        (status = 422, description = "Empty user list, invalid or DELETED status, the caller, the owner, or a removed member", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len(), status = %req.status))]
pub async fn update_users_status(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<UpdateUserStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_ids(&req.user_ids, "user_ids")?;
    let status = parse_status(&req.status)?;
    // Removal has its own endpoint so group, department and role rows go with it
    if status == Status::Deleted {
        return Err(AppError::InvalidStatus(req.status).into());
    }
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::EditCompanyMember)
        .await?;

    let olds = changeable_members(&state, actor, company_id, &req.user_ids).await?;
    if let Some(removed) = olds.iter().find(|m| m.status == Status::Deleted) {
        return Err(AppError::Unprocessable(format!(
            "{} was removed from the company; restore them instead",
            removed.email
        ))
        .into());
    }

    let now = Utc::now();
    let mut updated = Vec::with_capacity(olds.len());
    for old in &olds {
        updated.push(
            state
                .db
                .memberships
                .update_status(company_id, old.user_id, status, actor, now)
                .await?,
        );
    }

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::User,
            LogAction::UpdateUser,
            LogInfo {
                users: olds
                    .iter()
                    .map(|m| {
                        LogModuleParams::changed(
                            m.user_id,
                            &serde_json::json!({"Status": m.status}),
                            &serde_json::json!({"Status": status}),
                        )
                    })
                    .collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(updated))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/email",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserEmailRequest,
    responses(
        (status = 200, description = "Email changed", body = UserResponse),
        (status = 409, description = "Email already used", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_user_email(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserEmailRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let actor = ctx.user_id();
    if id != actor {
        let company_id = ctx.company()?;
        state
            .permissions
            .require(actor, company_id, Permission::EditCompanyMember)
            .await?;
        state.db.memberships.require(company_id, id).await?;
    }

    let email = normalize_email(&req.email);
    if let Some(other) = state.db.users.find_by_email(&email).await? {
        if other.user_id != id {
            return Err(AppError::EmailAlreadyExists(email).into());
        }
    }

    let old = state.db.users.require(id).await?;
    let now = Utc::now();
    let updated = state.db.users.update_email(id, &email, now).await?;
    state.db.memberships.sync_profile(&updated, now).await?;

    if let Some(company_id) = ctx.company_id {
        state
            .audit
            .record(
                actor,
                company_id,
                LogType::User,
                LogAction::UpdateUser,
                LogInfo {
                    user: Some(LogModuleParams::changed(
                        id,
                        &serde_json::json!({"Email": old.email}),
                        &serde_json::json!({"Email": updated.email}),
                    )),
                    ..Default::default()
                },
            )
            .await;
    }

    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID"), RemoveUserQuery),
    responses(
        (status = 200, description = "Member removed", body = RemoveUsersResponse),
        (status = 403, description = "Missing REMOVE_COMPANY_MEMBER", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse),
        (status = 422, description = "Self or owner removal", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Query(query): Query<RemoveUserQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveCompanyMember)
        .await?;
    let outcome = remove_members(
        &state,
        actor,
        company_id,
        &[id],
        query.remove_integration_accounts,
    )
    .await?;
    Ok(Json(RemoveUsersResponse {
        removed: outcome.removed,
        integration_errors: outcome.integration_errors,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/remove",
    tag = "users",
    request_body = RemoveUsersRequest,
    responses(
        (status = 200, description = "Members removed", body = RemoveUsersResponse),
        (status = 403, description = "Missing REMOVE_COMPANY_MEMBER", body = ErrorResponse),
        (status = 422, description = "Empty list, self or owner removal", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn remove_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<RemoveUsersRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_ids(&req.user_ids, "user_ids")?;
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveCompanyMember)
        .await?;
    let outcome = remove_members(
        &state,
        actor,
        company_id,
        &req.user_ids,
        req.remove_integration_accounts,
    )
    .await?;
    Ok(Json(RemoveUsersResponse {
        removed: outcome.removed,
        integration_errors: outcome.integration_errors,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/restore",
    tag = "users",
    request_body = UserIdsRequest,
    responses(
        (status = 200, description = "Members restored", body = Vec<CompanyUser>),
        (status = 422, description = "A member is not DELETED", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn restore_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<UserIdsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_ids(&req.user_ids, "user_ids")?;
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AddCompanyMember)
        .await?;

    let now = Utc::now();
    let mut restored = Vec::with_capacity(req.user_ids.len());
    for &user_id in &req.user_ids {
        restored.push(
            state
                .db
                .memberships
                .restore(company_id, user_id, actor, now)
                .await?,
        );
    }

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::User,
            LogAction::RestoreCompanyMembers,
            LogInfo {
                users: restored.iter().map(CompanyUser::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(restored))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/permanently-delete",
    tag = "users",
    request_body = UserIdsRequest,
    responses(
        (status = 200, description = "Deleted memberships removed", body = Vec<CompanyUser>),
        (status = 403, description = "Missing REMOVE_COMPANY_MEMBER", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn permanently_delete_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<UserIdsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_ids(&req.user_ids, "user_ids")?;
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveCompanyMember)
        .await?;

    let mut deleted = Vec::new();
    for &user_id in &req.user_ids {
        match state.db.memberships.get(company_id, user_id).await? {
            Some(member) if member.status == Status::Deleted => {
                state
                    .db
                    .memberships
                    .delete_permanently(company_id, user_id)
                    .await?;
                deleted.push(member);
            }
            _ => tracing::debug!(user_id = %user_id, "Skipping member that is not DELETED"),
        }
    }

    if !deleted.is_empty() {
        state
            .audit
            .record(
                actor,
                company_id,
                LogType::User,
                LogAction::PermanentlyRemoveCompanyMembers,
                LogInfo {
                    users: deleted.iter().map(CompanyUser::log_entry).collect(),
                    ..Default::default()
                },
            )
            .await;
    }

    Ok(Json(deleted))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/check-email",
    tag = "users",
    request_body = CheckEmailRequest,
    responses(
        (status = 202, description = "Email is free"),
        (status = 409, description = "Email already used", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _ctx, req))]
pub async fn check_email(
    State(state): State<Arc<AppState>>,
    _ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CheckEmailRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let email = normalize_email(&req.email);
    if state.db.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::EmailAlreadyExists(email).into());
    }
    Ok(StatusCode::ACCEPTED)
}
