//! Transactional email over SMTP.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::info;

use saasconsole_core::Config;

/// One outgoing message with a single recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// Invitation to join a company; `link` points at the frontend's verification page.
    pub fn invitation(recipient_name: &str, to: &str, company_name: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            recipient_name: recipient_name.to_string(),
            subject: "You have been invited!".to_string(),
            body: format!(
                "Hi {},\n\nYou have been invited to join {} on SaaS Console.\n\
                 Accept the invitation here: {}\n",
                greeting_name(recipient_name),
                company_name,
                link
            ),
        }
    }

    /// Notice that roles were assigned to or unassigned from the recipient.
    pub fn access_changed(
        recipient_name: &str,
        to: &str,
        company_name: &str,
        action: &str,
        role_names: &[String],
    ) -> Self {
        Self {
            to: to.to_string(),
            recipient_name: recipient_name.to_string(),
            subject: format!("[SaaSConsole] Your access to {} has changed", company_name),
            body: format!(
                "Hi {},\n\nThe following roles were {} in {}: {}.\n",
                greeting_name(recipient_name),
                action,
                company_name,
                role_names.join(", ")
            ),
        }
    }
}

fn greeting_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "there"
    } else {
        name
    }
}

/// SMTP sender. Absent when email is disabled or SMTP is not configured.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl EmailService {
    /// Create email service from config. Returns `None` if disabled or SMTP not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.email_enabled() {
            tracing::debug!("Email disabled (EMAIL_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host()?;
        let from = config.smtp_from()?.to_string();
        let port = config.smtp_port().unwrap_or(587);

        let mailer = if config.smtp_tls() {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).ok()?;
            let b = b.port(port);
            let b = if let (Some(u), Some(p)) = (config.smtp_username(), config.smtp_password()) {
                b.credentials(Credentials::new(u.to_string(), p.to_string()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "Email service initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = if let (Some(u), Some(p)) = (config.smtp_username(), config.smtp_password()) {
                b.credentials(Credentials::new(u.to_string(), p.to_string()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "Email service initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    pub async fn send(&self, email: &Email) -> Result<(), String> {
        let from_addr: Mailbox = self
            .from
            .parse()
            .map_err(|e| format!("Invalid SMTP_FROM: {}", e))?;
        let to_addr: Mailbox = email
            .to
            .parse()
            .map_err(|e| format!("Invalid recipient {}: {}", email.to, e))?;

        let message = Message::builder()
            .from(from_addr)
            .to(to_addr)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| e.to_string())?;

        self.mailer.send(message).await.map_err(|e| e.to_string())?;
        info!(subject = %email.subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saasconsole_core::{BaseConfig, ConsoleConfig, StoreBackend};

    fn config(email_enabled: bool) -> Config {
        Config(Box::new(ConsoleConfig {
            base: BaseConfig {
                server_host: "127.0.0.1".into(),
                server_port: 4000,
                cors_origins: vec![],
                jwt_secret: "0123456789abcdef0123456789abcdef".into(),
                jwt_expiry_hours: 1,
                environment: "development".into(),
                max_body_bytes: 1024,
                http_concurrency_limit: 8,
                log_format: "pretty".into(),
            },
            store_backend: StoreBackend::Memory,
            dynamodb_table: "test".into(),
            aws_region: None,
            dynamodb_endpoint: None,
            store_timeout_ms: 1000,
            email_enabled,
            smtp_host: None,
            smtp_port: None,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: false,
            email_queue_size: 10,
            email_workers: 1,
            frontend_url: None,
            integration_service_url: None,
            job_poll_interval_secs: 60,
        }))
    }

    #[test]
    fn test_from_config_none_when_disabled_or_unconfigured() {
        assert!(EmailService::from_config(&config(false)).is_none());
        // Enabled but without SMTP_HOST
        assert!(EmailService::from_config(&config(true)).is_none());
    }

    #[test]
    fn test_access_changed_lists_roles() {
        let email = Email::access_changed(
            "Ada Lovelace",
            "ada@example.com",
            "Acme",
            "assigned",
            &["billing".to_string(), "group admin".to_string()],
        );
        assert_eq!(email.subject, "[SaaSConsole] Your access to Acme has changed");
        assert!(email.body.contains("billing, group admin"));
    }

    #[test]
    fn test_invitation_without_name_greets_generically() {
        let email = Email::invitation("", "bob@example.com", "Acme", "https://app/verify");
        assert!(email.body.starts_with("Hi there"));
        assert!(email.body.contains("https://app/verify"));
    }
}
