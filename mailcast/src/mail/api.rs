//! Transactional HTTP API backend
//!
//! Posts JSON to a provider endpoint with bearer authentication. The
//! request/response shape follows the common transactional-mail API
//! convention: `{from, to, subject, html}` out, `{id}` back.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{Envelope, MailError, Mailer, SendOutcome};

/// HTTP API settings stored in the provider's JSON config
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Full URL of the send endpoint
    pub endpoint: String,

    /// Bearer token
    pub api_key: String,
}

/// HTTP API mailer
pub struct ApiMailer {
    client: reqwest::Client,
    config: ApiConfig,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: Option<String>,
}

impl ApiMailer {
    /// Create a mailer from provider configuration
    #[must_use]
    pub fn from_config(config: ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for ApiMailer {
    async fn send(&self, envelope: &Envelope) -> Result<SendOutcome, MailError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": envelope.from,
                "to": envelope.to,
                "subject": envelope.subject,
                "html": envelope.html,
            }))
            .send()
            .await
            .map_err(|e| MailError::Api(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api(format!("{status}: {body}")));
        }

        let body: ApiResponse = response
            .json()
            .await
            .unwrap_or(ApiResponse { id: None });

        Ok(SendOutcome {
            message_id: body
                .id
                .unwrap_or_else(|| format!("<{}@mailcast.api>", Uuid::new_v4())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_endpoint_and_key() {
        let missing_key = serde_json::json!({ "endpoint": "https://api.example.com/send" });
        assert!(serde_json::from_value::<ApiConfig>(missing_key).is_err());

        let complete = serde_json::json!({
            "endpoint": "https://api.example.com/send",
            "apiKey": "sk-test"
        });
        // Field names are snake_case in the stored config
        assert!(serde_json::from_value::<ApiConfig>(complete).is_err());

        let snake = serde_json::json!({
            "endpoint": "https://api.example.com/send",
            "api_key": "sk-test"
        });
        assert!(serde_json::from_value::<ApiConfig>(snake).is_ok());
    }
}
