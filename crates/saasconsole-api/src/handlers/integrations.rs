use crate::auth::SessionContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::models::{
    ConnectIntegrationRequest, Integration, LogAction, LogInfo, LogType, Permission, Status,
};
use saasconsole_core::validation::validate_slug;
use saasconsole_infra::ErrorResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/integrations",
    tag = "integrations",
    responses((status = 200, description = "Integrations of the active company", body = Vec<Integration>))
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_integrations(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    Ok(Json(state.db.integrations.list(company_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/integrations",
    tag = "integrations",
    request_body = ConnectIntegrationRequest,
    responses(
        (status = 201, description = "Integration connected", body = Integration),
        (status = 400, description = "Invalid slug", body = ErrorResponse),
        (status = 403, description = "Missing CONNECT_INTEGRATION", body = ErrorResponse),
        (status = 422, description = "Already connected", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(slug = %req.slug))]
pub async fn connect_integration(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<ConnectIntegrationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::ConnectIntegration)
        .await?;
    validate_slug(&req.slug)?;

    let integration = Integration {
        integration_id: Uuid::new_v4(),
        company_id,
        slug: req.slug,
        name: req.name.trim().to_string(),
        status: Status::Active,
        connected_by: actor,
        created_at: Utc::now(),
    };
    state.db.integrations.connect(&integration).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Integration,
            LogAction::ConnectIntegration,
            LogInfo {
                integration: Some(integration.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(integration)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/integrations/{id}",
    tag = "integrations",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 204, description = "Integration disconnected"),
        (status = 403, description = "Missing DISCONNECT_INTEGRATION", body = ErrorResponse),
        (status = 404, description = "Integration not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn disconnect_integration(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::DisconnectIntegration)
        .await?;
    let integration = state.db.integrations.require(company_id, id).await?;
    state.db.integrations.disconnect(company_id, id).await?;

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::Integration,
            LogAction::DisconnectIntegration,
            LogInfo {
                integration: Some(integration.log_entry()),
                ..Default::default()
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
