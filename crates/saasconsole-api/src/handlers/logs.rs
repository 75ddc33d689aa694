use crate::auth::SessionContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use saasconsole_core::constants::DEFAULT_PAGE_LIMIT;
use saasconsole_core::models::{LogAction, LogRecord, PageQuery};
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Only records of this action, e.g. `ADD_ROLE`
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogsResponse {
    pub logs: Vec<LogRecord>,
    pub last_evaluated_key: Option<String>,
}

fn parse_action(raw: &str) -> Result<LogAction, AppError> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_uppercase()))
        .map_err(|_| AppError::InvalidInput(format!("Unknown log action '{}'", raw)))
}

#[utoipa::path(
    get,
    path = "/api/v1/logs",
    tag = "logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Audit records of the active company, newest first", body = LogsResponse),
        (status = 400, description = "Unknown action", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    state
        .permissions
        .require_member(ctx.user_id(), company_id)
        .await?;
    let action = query.action.as_deref().map(parse_action).transpose()?;
    let limit = PageQuery {
        limit: query.limit,
        ..Default::default()
    }
    .clamped_limit();

    let page = state
        .db
        .logs
        .list(company_id, action, limit, query.cursor.as_deref())
        .await?;
    Ok(Json(LogsResponse {
        logs: page.items,
        last_evaluated_key: page.last_evaluated_key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_filter_accepts_wire_names() {
        assert_eq!(parse_action("add_role").unwrap(), LogAction::AddRole);
        assert_eq!(parse_action("REMOVE_GROUP").unwrap(), LogAction::DeleteGroup);
    }

    #[test]
    fn test_unknown_action_is_invalid_input() {
        assert!(matches!(
            parse_action("DROP_TABLE"),
            Err(AppError::InvalidInput(_))
        ));
    }
}
