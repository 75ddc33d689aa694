use crate::auth::SessionContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::present_members;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::models::{
    CompanyUser, CreateGroupRequest, Group, GroupMember, LogAction, LogInfo, LogModuleParams,
    LogType, MembersRequest, PageQuery, Permission, Status, UpdateGroupRequest,
};
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteGroupResponse {
    pub group_id: Uuid,
    /// Members dropped together with the group
    pub removed_members: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/groups",
    tag = "groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 409, description = "Group name taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AddGroup)
        .await?;

    let name = req.name.trim().to_string();
    if !state.db.groups.is_name_unique(company_id, &name, None).await? {
        return Err(AppError::GroupNameAlreadyExists(name).into());
    }
    if let Some(department_id) = req.department_id {
        state.db.departments.require(company_id, department_id).await?;
    }

    let group = Group {
        group_id: Uuid::new_v4(),
        company_id,
        department_id: req.department_id,
        search_key: name.to_lowercase(),
        name,
        description: req.description,
        status: Status::Active,
        created_by: actor,
        created_at: Utc::now(),
        updated_at: None,
    };
    state.db.groups.create(&group).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Group,
            LogAction::AddGroup,
            LogInfo {
                group: Some(group.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups",
    tag = "groups",
    params(PageQuery),
    responses((status = 200, description = "Groups of the active company", body = Vec<Group>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_groups(
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
    Ok(Json(
        state.db.groups.list(company_id, search.as_deref()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group", body = Group),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    Ok(Json(state.db.groups.require(company_id, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/groups/{id}",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = Group),
        (status = 409, description = "Group name taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateGroupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::EditGroup)
        .await?;
    let old = state.db.groups.require(company_id, id).await?;

    let mut group = old.clone();
    if let Some(name) = req.name.as_deref().map(str::trim) {
        if !state
            .db
            .groups
            .is_name_unique(company_id, name, Some(id))
            .await?
        {
            return Err(AppError::GroupNameAlreadyExists(name.to_string()).into());
        }
        group.name = name.to_string();
    }
    if let Some(description) = req.description {
        group.description = description;
    }
    group.updated_at = Some(Utc::now());
    state.db.groups.save(&group).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Group,
            LogAction::UpdateGroup,
            LogInfo {
                group: Some(LogModuleParams::changed(
                    id,
                    &json!({"Name": old.name, "Description": old.description}),
                    &json!({"Name": group.name, "Description": group.description}),
                )),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group deleted", body = DeleteGroupResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveGroup)
        .await?;
    let group = state.db.groups.require(company_id, id).await?;
    let removed_members = state.db.groups.delete(company_id, id).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Group,
            LogAction::DeleteGroup,
            LogInfo {
                group: Some(group.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(DeleteGroupResponse {
        group_id: id,
        removed_members,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/members",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses((status = 200, description = "Members of the group", body = Vec<GroupMember>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_group_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    state.db.groups.require(company_id, id).await?;
    Ok(Json(state.db.groups.members(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/members",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = MembersRequest,
    responses(
        (status = 200, description = "Members added", body = Vec<GroupMember>),
        (status = 404, description = "Group or member not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn add_group_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<MembersRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AddGroupMember)
        .await?;
    let group = state.db.groups.require(company_id, id).await?;
    let members = present_members(&state, company_id, &req.user_ids).await?;

    let added = state
        .db
        .groups
        .add_members(company_id, id, &req.user_ids, Some(actor), Utc::now())
        .await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Group,
            LogAction::AddGroupMembers,
            LogInfo {
                group: Some(group.log_entry()),
                users: members.iter().map(CompanyUser::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(added))
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}/members",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = MembersRequest,
    responses(
        (status = 204, description = "Members removed"),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn remove_group_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<MembersRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveGroupMember)
        .await?;
    let group = state.db.groups.require(company_id, id).await?;
    state.db.groups.remove_members(id, &req.user_ids).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Group,
            LogAction::RemoveGroupMembers,
            LogInfo {
                group: Some(group.log_entry()),
                users: req.user_ids.iter().map(LogModuleParams::id).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
