use crate::auth::SessionContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::{list_members, MemberListQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::constants::WIZARD_STATUS_DONE;
use saasconsole_core::models::{
    company_admin_role_id, Company, CompanyUser, CreateCompanyRequest, Group, LogAction, LogInfo,
    LogModuleParams, LogType, MemberCounts, Paginated, Permission, SetActiveCompanyRequest, Status,
    UpdateCompanyLogoRequest, UpdateCompanyRequest, UserCompany, UserRole, UserType,
};
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Active company plus a token scoped to it
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveCompanyResponse {
    pub company: Company,
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/companies",
    tag = "companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company established", body = Company),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Caller already has a company with this name", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(user_id = %ctx.user_id()))]
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CreateCompanyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user_id = ctx.user_id();
    let name = req.name.trim().to_string();
    if !state
        .db
        .companies
        .is_name_unique_for_user(&name, user_id, None)
        .await?
    {
        return Err(AppError::CompanyAlreadyExists(name).into());
    }

    let now = Utc::now();
    let company = Company {
        company_id: Uuid::new_v4(),
        name: name.clone(),
        description: req.description,
        logo: req.logo,
        status: Status::Active,
        setup_wizard_status: None,
        created_by: user_id,
        created_at: now,
        updated_at: None,
    };
    state.db.companies.create(&company).await?;

    let owner = CompanyUser::for_user(
        &ctx.user,
        company.company_id,
        &name,
        UserType::CompanyOwner,
        Status::Active,
        None,
        now,
    );
    state.db.memberships.create(&owner).await?;
    state
        .db
        .roles
        .assign(&[UserRole {
            user_id,
            role_id: company_admin_role_id(),
            company_id: company.company_id,
            assigned_by: Some(user_id),
            created_at: now,
        }])
        .await?;

    if ctx.user.active_company.is_none() {
        state
            .db
            .users
            .set_active_company(user_id, Some(company.company_id), now)
            .await?;
    }

    state
        .audit
        .record(
            user_id,
            company.company_id,
            LogType::Company,
            LogAction::EstablishCompany,
            LogInfo {
                company: Some(LogModuleParams::named(company.company_id, name)),
                ..Default::default()
            },
        )
        .await;

    tracing::info!(company_id = %company.company_id, "Company established");
    Ok((StatusCode::CREATED, Json(company)))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies",
    tag = "companies",
    responses((status = 200, description = "Companies the caller is an active member of", body = Vec<UserCompany>))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let companies = state.db.companies.list_for_user(ctx.user_id()).await?;
    Ok(Json(companies))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company", body = Company),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company = state.db.companies.require(id).await?;
    state.permissions.require_member(ctx.user_id(), id).await?;
    Ok(Json(company))
}

#[utoipa::path(
    put,
    path = "/api/v1/companies/{id}",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID")),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 403, description = "Missing EDIT_COMPANY", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_company(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user_id = ctx.user_id();
    let old = state.db.companies.require(id).await?;
    state
        .permissions
        .require(user_id, id, Permission::EditCompany)
        .await?;

    let name = req.name.as_deref().map(str::trim);
    let renamed = name.filter(|n| *n != old.name);
    if let Some(new_name) = renamed {
        if !state
            .db
            .companies
            .is_name_unique_for_user(new_name, user_id, Some(id))
            .await?
        {
            return Err(AppError::CompanyAlreadyExists(new_name.to_string()).into());
        }
    }

    let updated = state
        .db
        .companies
        .update_details(id, name, req.description.as_deref(), Utc::now())
        .await?;
    if let Some(new_name) = renamed {
        state.db.memberships.sync_company_name(id, new_name).await?;
    }

    state
        .audit
        .record(
            user_id,
            id,
            LogType::Company,
            LogAction::UpdateCompany,
            LogInfo {
                company: Some(LogModuleParams::changed(
                    id,
                    &json!({"Name": old.name, "Description": old.description}),
                    &json!({"Name": updated.name, "Description": updated.description}),
                )),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(updated))
}

#[utoipa::path(
    patch,
    path = "/api/v1/companies/{id}/logo",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID")),
    request_body = UpdateCompanyLogoRequest,
    responses(
        (status = 200, description = "Logo updated", body = Company),
        (status = 403, description = "Missing EDIT_COMPANY", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_company_logo(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCompanyLogoRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let old = state.db.companies.require(id).await?;
    state
        .permissions
        .require(ctx.user_id(), id, Permission::EditCompany)
        .await?;
    let updated = state
        .db
        .companies
        .update_logo(id, &req.logo, Utc::now())
        .await?;

    state
        .audit
        .record(
            ctx.user_id(),
            id,
            LogType::Company,
            LogAction::UpdateCompany,
            LogInfo {
                company: Some(LogModuleParams::changed(
                    id,
                    &json!({"Logo": old.logo}),
                    &json!({"Logo": updated.logo}),
                )),
                ..Default::default()
            },
        )
        .await;

    Ok(Json(updated))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/active",
    tag = "companies",
    responses(
        (status = 200, description = "Active company", body = Company),
        (status = 422, description = "No active company", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn get_active_company(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let company = state.db.companies.require(ctx.company()?).await?;
    Ok(Json(company))
}

#[utoipa::path(
    patch,
    path = "/api/v1/companies/active",
    tag = "companies",
    request_body = SetActiveCompanyRequest,
    responses(
        (status = 200, description = "Active company switched", body = ActiveCompanyResponse),
        (status = 403, description = "Not an active member", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(user_id = %ctx.user_id()))]
pub async fn set_active_company(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<SetActiveCompanyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user_id = ctx.user_id();
    let company = state.db.companies.require(req.company_id).await?;
    state
        .permissions
        .require_member(user_id, company.company_id)
        .await?;
    state
        .db
        .users
        .set_active_company(user_id, Some(company.company_id), Utc::now())
        .await?;
    let token = state.jwt.issue(user_id, Some(company.company_id))?;

    Ok(Json(ActiveCompanyResponse { company, token }))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/users",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID"), MemberListQuery),
    responses(
        (status = 200, description = "One page of members", body = Paginated<CompanyUser>),
        (status = 422, description = "Unknown status filter", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_company_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Query(query): Query<MemberListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.permissions.require_member(ctx.user_id(), id).await?;
    Ok(Json(list_members(&state, id, &query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/users/count",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses((status = 200, description = "Members per status", body = MemberCounts))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn count_company_users(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.permissions.require_member(ctx.user_id(), id).await?;
    Ok(Json(state.db.memberships.count(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/groups",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses((status = 200, description = "Groups of the company", body = Vec<Group>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_company_groups(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.permissions.require_member(ctx.user_id(), id).await?;
    Ok(Json(state.db.groups.list(id, None).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/companies/{id}/setup-wizard",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Setup wizard completed", body = Company),
        (status = 403, description = "Missing EDIT_COMPANY", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn complete_setup_wizard(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.companies.require(id).await?;
    state
        .permissions
        .require(ctx.user_id(), id, Permission::EditCompany)
        .await?;
    let company = state
        .db
        .companies
        .set_setup_wizard_status(id, WIZARD_STATUS_DONE, Utc::now())
        .await?;
    Ok(Json(company))
}
