//! Test helpers: build AppState over the in-memory store and serve the router.
//!
//! Run from workspace root: `cargo test -p saasconsole-api`.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use saasconsole_api::constants;
use saasconsole_api::services::integration_cleanup::IntegrationCleanup;
use saasconsole_api::setup::{routes, services};
use saasconsole_api::state::{AppState, DbState};
use saasconsole_core::models::Integration;
use saasconsole_core::{BaseConfig, Config, ConsoleConfig, StoreBackend};
use saasconsole_db::MemoryStore;
use std::sync::{Arc, Mutex};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Integration cleanup that records every call and fails for chosen slugs.
#[derive(Default)]
pub struct RecordingCleanup {
    pub calls: Mutex<Vec<(String, String)>>,
    pub accounts: Mutex<Vec<Option<String>>>,
    pub failing_slugs: Mutex<Vec<String>>,
}

impl RecordingCleanup {
    pub fn fail_for(&self, slug: &str) {
        self.failing_slugs.lock().unwrap().push(slug.to_string());
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Integration-side account names passed with each call, in call order.
    pub fn accounts(&self) -> Vec<Option<String>> {
        self.accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntegrationCleanup for RecordingCleanup {
    async fn remove_user(
        &self,
        integration: &Integration,
        email: &str,
        account: Option<&str>,
    ) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((integration.slug.clone(), email.to_string()));
        self.accounts.lock().unwrap().push(account.map(str::to_string));
        if self
            .failing_slugs
            .lock()
            .unwrap()
            .contains(&integration.slug)
        {
            anyhow::bail!("{} is unreachable", integration.slug);
        }
        Ok(())
    }
}

/// Test application: server, state and the recording integration cleanup.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub cleanup: Arc<RecordingCleanup>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// A token for `user_id`; the company claim is the fallback active company.
    pub fn token_for(&self, user_id: uuid::Uuid, company_id: Option<uuid::Uuid>) -> String {
        self.state
            .jwt
            .issue(user_id, company_id)
            .expect("Failed to issue test token")
    }
}

pub fn create_test_config() -> Config {
    Config(Box::new(ConsoleConfig {
        base: BaseConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiry_hours: 1,
            environment: "test".to_string(),
            max_body_bytes: 1024 * 1024,
            http_concurrency_limit: 64,
            log_format: "text".to_string(),
        },
        store_backend: StoreBackend::Memory,
        dynamodb_table: "saas-console-test".to_string(),
        aws_region: None,
        dynamodb_endpoint: None,
        store_timeout_ms: 1000,
        email_enabled: false,
        smtp_host: None,
        smtp_port: None,
        smtp_username: None,
        smtp_password: None,
        smtp_from: None,
        smtp_tls: false,
        email_queue_size: 16,
        email_workers: 1,
        frontend_url: Some("https://console.test".to_string()),
        integration_service_url: None,
        job_poll_interval_secs: 60,
    }))
}

/// Setup test app over a fresh in-memory store.
pub async fn setup_test_app() -> TestApp {
    let config = create_test_config();
    let cleanup = Arc::new(RecordingCleanup::default());
    let db = DbState::new(Arc::new(MemoryStore::new()));
    let state = Arc::new(services::build_state(&config, db, cleanup.clone()));

    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        cleanup,
    }
}
