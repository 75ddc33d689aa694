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
    CompanyUser, CreateDepartmentRequest, Department, DepartmentMember, Group, LogAction, LogInfo,
    LogModuleParams, LogType, MembersRequest, PageQuery, Permission, Status,
    UpdateDepartmentRequest,
};
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteDepartmentResponse {
    pub department_id: Uuid,
    pub removed_members: Vec<Uuid>,
    /// Groups that were attached to the department and are now standalone
    pub detached_groups: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/departments",
    tag = "departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 409, description = "Department name taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CreateDepartmentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::AddDepartment)
        .await?;

    let name = req.name.trim().to_string();
    if !state
        .db
        .departments
        .is_name_unique(company_id, &name, None)
        .await?
    {
        return Err(AppError::DepartmentAlreadyExists(name).into());
    }

    let department = Department {
        department_id: Uuid::new_v4(),
        company_id,
        search_key: name.to_lowercase(),
        name,
        description: req.description,
        status: Status::Active,
        created_by: actor,
        created_at: Utc::now(),
        updated_at: None,
    };
    state.db.departments.create(&department).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Department,
            LogAction::AddDepartment,
            LogInfo {
                department: Some(department.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/api/v1/departments",
    tag = "departments",
    params(PageQuery),
    responses((status = 200, description = "Departments of the active company", body = Vec<Department>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_departments(
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
        state
            .db
            .departments
            .list(company_id, search.as_deref())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department", body = Department),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    Ok(Json(state.db.departments.require(company_id, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/{id}/groups",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses((status = 200, description = "Groups attached to the department", body = Vec<Group>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_department_groups(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    state.db.departments.require(company_id, id).await?;
    Ok(Json(
        state.db.groups.list_for_department(company_id, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 409, description = "Department name taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateDepartmentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::EditDepartment)
        .await?;
    let old = state.db.departments.require(company_id, id).await?;

    let mut department = old.clone();
    if let Some(name) = req.name.as_deref().map(str::trim) {
        if !state
            .db
            .departments
            .is_name_unique(company_id, name, Some(id))
            .await?
        {
            return Err(AppError::DepartmentAlreadyExists(name.to_string()).into());
        }
        department.name = name.to_string();
    }
    if let Some(description) = req.description {
        department.description = description;
    }
    department.updated_at = Some(Utc::now());
    state.db.departments.save(&department).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Department,
            LogAction::UpdateDepartment,
            LogInfo {
                department: Some(LogModuleParams::changed(
                    id,
                    &json!({"Name": old.name, "Description": old.description}),
                    &json!({"Name": department.name, "Description": department.description}),
                )),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(department))
}

#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted", body = DeleteDepartmentResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveDepartment)
        .await?;
    let department = state.db.departments.require(company_id, id).await?;

    let now = Utc::now();
    let mut detached_groups = Vec::new();
    for mut group in state.db.groups.list_for_department(company_id, id).await? {
        group.department_id = None;
        group.updated_at = Some(now);
        state.db.groups.save(&group).await?;
        detached_groups.push(group.group_id);
    }
    let removed_members = state.db.departments.delete(company_id, id).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Department,
            LogAction::DeleteDepartment,
            LogInfo {
                department: Some(department.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(DeleteDepartmentResponse {
        department_id: id,
        removed_members,
        detached_groups,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/{id}/members",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses((status = 200, description = "Members of the department", body = Vec<DepartmentMember>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_department_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    state.db.departments.require(company_id, id).await?;
    Ok(Json(state.db.departments.members(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments/{id}/members",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = MembersRequest,
    responses(
        (status = 200, description = "Members added", body = Vec<DepartmentMember>),
        (status = 404, description = "Department or member not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn add_department_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<MembersRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::EditDepartment)
        .await?;
    let department = state.db.departments.require(company_id, id).await?;
    let members = present_members(&state, company_id, &req.user_ids).await?;

    let added = state
        .db
        .departments
        .add_members(company_id, id, &req.user_ids, Some(actor), Utc::now())
        .await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Department,
            LogAction::UpdateDepartment,
            LogInfo {
                department: Some(department.log_entry()),
                users: members.iter().map(CompanyUser::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(added))
}

#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}/members",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = MembersRequest,
    responses(
        (status = 204, description = "Members removed"),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(count = req.user_ids.len()))]
pub async fn remove_department_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<MembersRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::EditDepartment)
        .await?;
    let department = state.db.departments.require(company_id, id).await?;
    state.db.departments.remove_members(id, &req.user_ids).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Department,
            LogAction::UpdateDepartment,
            LogInfo {
                department: Some(department.log_entry()),
                users: req.user_ids.iter().map(LogModuleParams::id).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
