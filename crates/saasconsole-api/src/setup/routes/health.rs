//! Health check handlers and response types.

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub store: String,
    pub store_backend: String,
    pub version: &'static str,
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - the store answers.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.db.store.clone();
    let result = run_check(
        Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS),
        async move { store.health_check().await },
        "not_ready",
    )
    .await;

    if result == "healthy" {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "store": "ready" })),
        )
    } else {
        tracing::error!(store = %result, "Store readiness check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "not_ready", "store": result })),
        )
    }
}

/// Full health check.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.db.store.clone();
    let store_status = run_check(
        Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS),
        async move { store.health_check().await },
        "unhealthy",
    )
    .await;
    let healthy = store_status == "healthy";

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        store: store_status,
        store_backend: state.db.store.backend_type().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_check_reports_each_outcome() {
        let ok = run_check(Duration::from_secs(1), async { Ok::<(), String>(()) }, "x").await;
        assert_eq!(ok, "healthy");

        let err = run_check(
            Duration::from_secs(1),
            async { Err::<(), _>("connection refused") },
            "unhealthy",
        )
        .await;
        assert_eq!(err, "unhealthy: connection refused");

        let slow = run_check(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<(), String>(())
            },
            "x",
        )
        .await;
        assert_eq!(slow, "timeout");
    }
}
