//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is honoured) into a
//! `ConsoleConfig`, then validated once at startup.

use std::env;

use crate::store_types::StoreBackend;

const SERVER_PORT: u16 = 4000;
const JWT_EXPIRY_HOURS: i64 = 24;
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const HTTP_CONCURRENCY_LIMIT: usize = 512;
const EMAIL_QUEUE_SIZE: usize = 1000;
const EMAIL_WORKERS: usize = 4;
const JOB_POLL_INTERVAL_SECS: u64 = 60;
const STORE_TIMEOUT_MS: u64 = 5000;

/// Settings shared by every binary in the workspace
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
    pub max_body_bytes: usize,
    pub http_concurrency_limit: usize,
    pub log_format: String,
}

/// Console service configuration
#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub base: BaseConfig,
    // Store
    pub store_backend: StoreBackend,
    pub dynamodb_table: String,
    pub aws_region: Option<String>,
    pub dynamodb_endpoint: Option<String>,
    pub store_timeout_ms: u64,
    // Email
    pub email_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    pub email_queue_size: usize,
    pub email_workers: usize,
    pub frontend_url: Option<String>,
    // Integrations and scheduled jobs
    pub integration_service_url: Option<String>,
    pub job_poll_interval_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ConsoleConfig>);

impl Config {
    fn inner(&self) -> &ConsoleConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ConsoleConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_host(&self) -> &str {
        &self.inner().base.server_host
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn max_body_bytes(&self) -> usize {
        self.inner().base.max_body_bytes
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.inner().store_backend
    }

    pub fn dynamodb_table(&self) -> &str {
        &self.inner().dynamodb_table
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn dynamodb_endpoint(&self) -> Option<&str> {
        self.inner().dynamodb_endpoint.as_deref()
    }

    pub fn store_timeout_ms(&self) -> u64 {
        self.inner().store_timeout_ms
    }

    pub fn email_enabled(&self) -> bool {
        self.inner().email_enabled
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.inner().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> Option<u16> {
        self.inner().smtp_port
    }

    pub fn smtp_username(&self) -> Option<&str> {
        self.inner().smtp_username.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.inner().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.inner().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.inner().smtp_tls
    }

    pub fn email_queue_size(&self) -> usize {
        self.inner().email_queue_size
    }

    pub fn email_workers(&self) -> usize {
        self.inner().email_workers
    }

    pub fn frontend_url(&self) -> Option<&str> {
        self.inner().frontend_url.as_deref()
    }

    pub fn integration_service_url(&self) -> Option<&str> {
        self.inner().integration_service_url.as_deref()
    }

    pub fn job_poll_interval_secs(&self) -> u64 {
        self.inner().job_poll_interval_secs
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            cors_origins,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            environment,
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| MAX_BODY_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_BODY_BYTES),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        };

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "dynamodb".to_string())
            .parse::<StoreBackend>()?;

        let config = ConsoleConfig {
            base,
            store_backend,
            dynamodb_table: env::var("DYNAMODB_TABLE")
                .unwrap_or_else(|_| "saasconsole".to_string()),
            aws_region: optional_var("AWS_REGION"),
            dynamodb_endpoint: optional_var("DYNAMODB_ENDPOINT"),
            store_timeout_ms: env::var("STORE_TIMEOUT_MS")
                .unwrap_or_else(|_| STORE_TIMEOUT_MS.to_string())
                .parse()
                .unwrap_or(STORE_TIMEOUT_MS),
            email_enabled: env::var("EMAIL_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            smtp_host: optional_var("SMTP_HOST"),
            smtp_port: optional_var("SMTP_PORT").and_then(|p| p.parse().ok()),
            smtp_username: optional_var("SMTP_USERNAME"),
            smtp_password: optional_var("SMTP_PASSWORD"),
            smtp_from: optional_var("SMTP_FROM"),
            smtp_tls: env::var("SMTP_TLS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            email_queue_size: env::var("EMAIL_QUEUE_SIZE")
                .unwrap_or_else(|_| EMAIL_QUEUE_SIZE.to_string())
                .parse()
                .unwrap_or(EMAIL_QUEUE_SIZE),
            email_workers: env::var("EMAIL_WORKERS")
                .unwrap_or_else(|_| EMAIL_WORKERS.to_string())
                .parse()
                .unwrap_or(EMAIL_WORKERS),
            frontend_url: optional_var("FRONTEND_URL"),
            integration_service_url: optional_var("INTEGRATION_SERVICE_URL"),
            job_poll_interval_secs: env::var("JOB_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| JOB_POLL_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(JOB_POLL_INTERVAL_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if self.email_enabled && (self.smtp_host.is_none() || self.smtp_from.is_none()) {
            return Err(anyhow::anyhow!(
                "EMAIL_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        if self.store_backend == StoreBackend::DynamoDb && self.dynamodb_table.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "DYNAMODB_TABLE must be set when using the dynamodb store backend"
            ));
        }

        if self.store_backend == StoreBackend::Memory && is_production_env(&self.base.environment)
        {
            return Err(anyhow::anyhow!(
                "STORE_BACKEND=memory is not allowed in production"
            ));
        }

        if self.job_poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("JOB_POLL_INTERVAL_SECS must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConsoleConfig {
        ConsoleConfig {
            base: BaseConfig {
                server_host: "127.0.0.1".to_string(),
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                jwt_secret: "a".repeat(32),
                jwt_expiry_hours: 24,
                environment: "development".to_string(),
                max_body_bytes: MAX_BODY_BYTES,
                http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
                log_format: "pretty".to_string(),
            },
            store_backend: StoreBackend::Memory,
            dynamodb_table: "saasconsole".to_string(),
            aws_region: None,
            dynamodb_endpoint: None,
            store_timeout_ms: STORE_TIMEOUT_MS,
            email_enabled: false,
            smtp_host: None,
            smtp_port: None,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
            email_queue_size: EMAIL_QUEUE_SIZE,
            email_workers: EMAIL_WORKERS,
            frontend_url: None,
            integration_service_url: None,
            job_poll_interval_secs: JOB_POLL_INTERVAL_SECS,
        }
    }

    #[test]
    fn accepts_sample_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let mut config = sample();
        config.base.jwt_secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn email_requires_smtp_settings() {
        let mut config = sample();
        config.email_enabled = true;
        assert!(config.validate().is_err());

        config.smtp_host = Some("smtp.example.com".to_string());
        config.smtp_from = Some("console@example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn memory_store_rejected_in_production() {
        let mut config = sample();
        config.base.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.store_backend = StoreBackend::DynamoDb;
        assert!(config.validate().is_ok());
        assert!(Config(Box::new(config)).is_production());
    }
}
