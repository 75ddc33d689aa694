//! Removal of a member's account from a connected third-party integration.
//!
//! Each connected app (Slack, Jira, Google, ...) is driven by a separate
//! integration service; the console only asks it to remove one account.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use saasconsole_core::models::Integration;
use serde::Serialize;
use std::time::Duration;

#[async_trait]
pub trait IntegrationCleanup: Send + Sync {
    /// Remove `email` from `integration`. `account` is the integration-side
    /// account name when the caller knows it; otherwise the service matches by email.
    async fn remove_user(
        &self,
        integration: &Integration,
        email: &str,
        account: Option<&str>,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct RemoveAccountRequest<'a> {
    company_id: String,
    integration_id: String,
    slug: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a str>,
}

/// Posts removals to `<base_url>/integrations/<slug>/remove-user`.
pub struct HttpIntegrationCleanup {
    http_client: Client,
    base_url: String,
}

impl HttpIntegrationCleanup {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client for integration cleanup")?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IntegrationCleanup for HttpIntegrationCleanup {
    #[tracing::instrument(skip(self, integration), fields(integration.slug = %integration.slug))]
    async fn remove_user(
        &self,
        integration: &Integration,
        email: &str,
        account: Option<&str>,
    ) -> Result<()> {
        let url = format!("{}/integrations/{}/remove-user", self.base_url, integration.slug);
        let body = RemoveAccountRequest {
            company_id: integration.company_id.to_string(),
            integration_id: integration.integration_id.to_string(),
            slug: &integration.slug,
            email,
            account,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {} integration service", integration.slug))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "{} account removal failed: {} - {}",
                integration.name,
                status,
                error_text
            ));
        }
        tracing::info!("Integration account removed");
        Ok(())
    }
}

/// Used when no integration service is configured.
pub struct NoopIntegrationCleanup;

#[async_trait]
impl IntegrationCleanup for NoopIntegrationCleanup {
    async fn remove_user(
        &self,
        integration: &Integration,
        _email: &str,
        _account: Option<&str>,
    ) -> Result<()> {
        tracing::info!(
            integration.slug = %integration.slug,
            "Integration service not configured, skipping account removal"
        );
        Ok(())
    }
}
