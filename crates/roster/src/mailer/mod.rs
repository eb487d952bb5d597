//! Outbound email.
//!
//! The service only sends one kind of mail today: the address-verification
//! message issued at registration. Delivery sits behind the [`EmailSender`]
//! trait so tests and mail-disabled deployments can swap in [`LogMailer`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// SMTP and addressing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Whether outbound mail is enabled at all.
    pub enabled: bool,
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Sender email address.
    pub from_email: String,
    /// Sender name.
    pub from_name: String,
    /// SMTP username (optional for dev servers like Mailpit).
    pub username: Option<String>,
    /// SMTP password (optional for dev servers like Mailpit).
    pub password: Option<String>,
    /// Whether to use TLS (false for local dev servers).
    pub use_tls: bool,
    /// Public base URL used to build verification links.
    pub public_base_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 1025,
            from_email: "noreply@localhost".to_string(),
            from_name: "Roster".to_string(),
            username: None,
            password: None,
            use_tls: false,
            public_base_url: "http://localhost:8087".to_string(),
        }
    }
}

/// Sender of account emails.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send the email-verification message for a freshly created account.
    async fn send_verification(&self, to_email: &str, user_id: &str, token: &str) -> Result<()>;
}

/// SMTP-backed sender.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: MailConfig,
}

impl SmtpMailer {
    /// Create a new SMTP mailer.
    pub fn new(config: MailConfig) -> Result<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self { transport, config })
    }

    fn build_transport(config: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .context("Failed to create SMTP relay")?
                .port(config.port)
        } else {
            // Plaintext transport for local dev servers (Mailpit and friends)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn verification_link(&self, user_id: &str, token: &str) -> String {
        format!(
            "{}/auth/verify-email/{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            user_id,
            token
        )
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_verification(&self, to_email: &str, user_id: &str, token: &str) -> Result<()> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .context("Invalid from address")?;
        let to: Mailbox = to_email.parse().context("Invalid to address")?;

        let link = self.verification_link(user_id, token);
        let body = format!(
            "Welcome!\n\nPlease verify your email address by opening the link below:\n\n{}\n\n\
             If you did not create this account, you can ignore this message.\n",
            link
        );

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject("Verify your email address")
            .body(body)
            .context("Failed to build email message")?;

        debug!(to = %to_email, host = %self.config.host, "Sending verification email");

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;

        info!(to = %to_email, "Verification email sent");
        Ok(())
    }
}

/// No-op sender that only logs. Used in tests and when mail is disabled.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send_verification(&self, to_email: &str, user_id: &str, token: &str) -> Result<()> {
        info!(
            to = %to_email,
            user_id = %user_id,
            token = %token,
            "Mail disabled, skipping verification email"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_local_dev() {
        let config = MailConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.port, 1025);
        assert!(!config.use_tls);
    }

    #[test]
    fn test_verification_link_strips_trailing_slash() {
        let mailer = SmtpMailer::new(MailConfig {
            public_base_url: "https://roster.example.com/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            mailer.verification_link("usr_1", "tok_abc"),
            "https://roster.example.com/auth/verify-email/usr_1/tok_abc"
        );
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = LogMailer;
        mailer
            .send_verification("user@example.com", "usr_1", "tok")
            .await
            .unwrap();
    }
}
