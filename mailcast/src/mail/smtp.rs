//! SMTP relay backend (lettre)

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use uuid::Uuid;

use super::{Envelope, MailError, Mailer, SendOutcome};

/// SMTP settings stored in the provider's JSON config
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// TLS mode: "starttls" (default), "tls", or "none"
    #[serde(default = "default_tls")]
    pub tls: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    587
}

fn default_tls() -> String {
    "starttls".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// SMTP-based mailer
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a mailer from provider configuration
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = match config.tls.as_str() {
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }

    fn build_message(envelope: &Envelope) -> Result<Message, MailError> {
        let from: Mailbox = envelope
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(envelope.from.clone()))?;
        let to: Mailbox = envelope
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(envelope.to.clone()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(envelope.subject.clone())
            .singlepart(SinglePart::html(envelope.html.clone()))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, envelope: &Envelope) -> Result<SendOutcome, MailError> {
        let message = Self::build_message(envelope)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        // SMTP acknowledges acceptance, not a message id; synthesize one
        // so the event log has a stable reference.
        Ok(SendOutcome {
            message_id: format!("<{}@mailcast.smtp>", Uuid::new_v4()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: SmtpConfig =
            serde_json::from_value(serde_json::json!({ "host": "smtp.example.com" })).unwrap();
        assert_eq!(config.port, 587);
        assert_eq!(config.tls, "starttls");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_build_message_rejects_bad_addresses() {
        let envelope = Envelope {
            from: "not-an-address".into(),
            to: "jane@example.com".into(),
            subject: "hi".into(),
            html: "<p>hi</p>".into(),
        };
        assert!(matches!(
            SmtpMailer::build_message(&envelope),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_build_message_accepts_display_name() {
        let envelope = Envelope {
            from: "Acme <no-reply@acme.io>".into(),
            to: "jane@example.com".into(),
            subject: "hi".into(),
            html: "<p>hi</p>".into(),
        };
        assert!(SmtpMailer::build_message(&envelope).is_ok());
    }
}
