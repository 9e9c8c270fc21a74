//! API key authentication
//!
//! Extractor for the `Authorization: Bearer <key>` header. Keys are
//! project-scoped; handlers use the extracted project id to fence every
//! lookup.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::domain::ApiKey;
use crate::error::MailcastError;
use crate::state::AppState;

/// A validated API key and the project it belongs to
#[derive(Debug, Clone)]
pub struct AuthenticatedKey(pub ApiKey);

impl AuthenticatedKey {
    #[must_use]
    pub fn project_id(&self) -> i64 {
        self.0.project_id
    }
}

impl FromRequestParts<AppState> for AuthenticatedKey {
    type Rejection = MailcastError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| MailcastError::Unauthorized("missing API key".to_string()))?;

        let key = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| MailcastError::Unauthorized("malformed Authorization header".to_string()))?
            .trim();

        let api_key = state
            .store
            .api_key(key)
            .await?
            .ok_or_else(|| MailcastError::Unauthorized("invalid API key".to_string()))?;

        Ok(Self(api_key))
    }
}
