//! Service initialization and application state setup

use crate::auth::JwtService;
use crate::email_queue::EmailJobQueue;
use crate::services::audit::AuditLogger;
use crate::services::email::EmailService;
use crate::services::integration_cleanup::{
    HttpIntegrationCleanup, IntegrationCleanup, NoopIntegrationCleanup,
};
use crate::services::permissions::PermissionChecker;
use crate::state::{AppState, DbState};
use anyhow::Result;
use saasconsole_core::Config;
use saasconsole_db::ItemStore;
use std::sync::Arc;

/// Initialize all services and repositories, returning the application state
pub fn initialize_services(config: &Config, store: Arc<dyn ItemStore>) -> Result<Arc<AppState>> {
    let db = DbState::new(store);

    let integration_cleanup: Arc<dyn IntegrationCleanup> = match config.integration_service_url() {
        Some(url) => {
            tracing::info!(url = %url, "Integration cleanup enabled");
            Arc::new(HttpIntegrationCleanup::new(url)?)
        }
        None => {
            tracing::warn!(
                "INTEGRATION_SERVICE_URL not set; integration accounts will not be removed"
            );
            Arc::new(NoopIntegrationCleanup)
        }
    };

    Ok(Arc::new(build_state(config, db, integration_cleanup)))
}

/// Assemble the state over already-built repositories.
pub fn build_state(
    config: &Config,
    db: DbState,
    integration_cleanup: Arc<dyn IntegrationCleanup>,
) -> AppState {
    let email = EmailJobQueue::new(
        EmailService::from_config(config),
        config.email_queue_size(),
        config.email_workers(),
    );

    AppState {
        config: config.clone(),
        jwt: JwtService::new(config.jwt_secret(), config.jwt_expiry_hours()),
        audit: AuditLogger::new(db.logs.clone()),
        permissions: PermissionChecker::new(db.memberships.clone(), db.roles.clone()),
        email,
        integration_cleanup,
        db,
    }
}
