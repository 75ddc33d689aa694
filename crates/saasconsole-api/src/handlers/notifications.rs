use crate::auth::SessionContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use saasconsole_core::models::{Notification, PageQuery, Paginated};
use saasconsole_infra::ErrorResponse;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadAllResponse {
    pub updated: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    params(PageQuery),
    responses((status = 200, description = "Notifications of the caller, newest first", body = Paginated<Notification>))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let page = state
        .db
        .notifications
        .list(
            ctx.user_id(),
            ctx.company_id,
            query.clamped_limit(),
            query.cursor.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/seen",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked seen", body = Notification),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn mark_seen(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.notifications.require(ctx.user_id(), id).await?;
    let notification = state
        .db
        .notifications
        .mark_seen(ctx.user_id(), id, Utc::now())
        .await?;
    Ok(Json(notification))
}

#[utoipa::path(
    put,
    path = "/api/v1/notifications/read-all",
    tag = "notifications",
    responses((status = 200, description = "Unread notifications marked read", body = ReadAllResponse))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let updated = state
        .db
        .notifications
        .mark_all_read(ctx.user_id(), ctx.company_id, Utc::now())
        .await?;
    Ok(Json(ReadAllResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.notifications.require(ctx.user_id(), id).await?;
    state.db.notifications.delete(ctx.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
