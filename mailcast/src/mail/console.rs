//! Console backend for development
//!
//! Logs the envelope instead of sending it and acknowledges immediately.

use async_trait::async_trait;
use uuid::Uuid;

use super::{Envelope, MailError, Mailer, SendOutcome};

/// Log-only mailer
#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, envelope: &Envelope) -> Result<SendOutcome, MailError> {
        let message_id = format!("<{}@mailcast.console>", Uuid::new_v4());

        tracing::info!(
            from = %envelope.from,
            to = %envelope.to,
            subject = %envelope.subject,
            html_bytes = envelope.html.len(),
            %message_id,
            "console mailer: email not actually sent"
        );

        Ok(SendOutcome { message_id })
    }
}
