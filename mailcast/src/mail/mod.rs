//! Mail provider abstraction
//!
//! The send pipeline only needs one capability from a provider: deliver
//! an envelope and report success with a message id or an error. Concrete
//! backends are swappable implementations selected by the provider kind
//! stored with the project, not by inheritance:
//!
//! - **SMTP**: relay via lettre (production)
//! - **API**: transactional HTTP API (production)
//! - **Console**: log-only (development)

mod api;
mod console;
mod smtp;

pub use api::ApiMailer;
pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{EmailProvider, ProviderKind};

/// Errors from building or dispatching mail
#[derive(Debug, Error)]
pub enum MailError {
    /// Address failed to parse
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Provider configuration is missing or malformed
    #[error("mail provider configuration error: {0}")]
    Config(String),

    /// Message construction failed
    #[error("failed to build message: {0}")]
    Build(String),

    /// SMTP transport error
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// HTTP API transport error
    #[error("mail API error: {0}")]
    Api(String),
}

/// One outbound email, fully personalized
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Provider acknowledgement of an accepted send
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message_id: String,
}

/// Trait for dispatching mail through a provider
///
/// Implemented by all backends. The pipeline retries on error per its
/// job policy; implementations should not retry internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatch one envelope
    async fn send(&self, envelope: &Envelope) -> Result<SendOutcome, MailError>;
}

/// Build the mailer for a configured provider
///
/// Selection is by [`ProviderKind`]; backend-specific settings come from
/// the provider's JSON config.
pub fn mailer_for(provider: &EmailProvider) -> Result<Box<dyn Mailer>, MailError> {
    match provider.kind {
        ProviderKind::Smtp => {
            let config = serde_json::from_value(provider.config.clone())
                .map_err(|e| MailError::Config(e.to_string()))?;
            Ok(Box::new(SmtpMailer::from_config(&config)?))
        }
        ProviderKind::Api => {
            let config = serde_json::from_value(provider.config.clone())
                .map_err(|e| MailError::Config(e.to_string()))?;
            Ok(Box::new(ApiMailer::from_config(config)))
        }
        ProviderKind::Console => Ok(Box::new(ConsoleMailer::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_selects_console() {
        let provider = EmailProvider {
            id: 1,
            name: "dev".into(),
            kind: ProviderKind::Console,
            config: json!({}),
        };
        assert!(mailer_for(&provider).is_ok());
    }

    #[test]
    fn test_factory_rejects_bad_smtp_config() {
        let provider = EmailProvider {
            id: 1,
            name: "smtp".into(),
            kind: ProviderKind::Smtp,
            config: json!({ "port": "not-a-number" }),
        };
        assert!(matches!(
            mailer_for(&provider),
            Err(MailError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_console_mailer_acknowledges() {
        let mailer = ConsoleMailer::new();
        let outcome = mailer
            .send(&Envelope {
                from: "a@x.io".into(),
                to: "b@y.io".into(),
                subject: "hi".into(),
                html: "<p>hi</p>".into(),
            })
            .await
            .unwrap();
        assert!(!outcome.message_id.is_empty());
    }
}
