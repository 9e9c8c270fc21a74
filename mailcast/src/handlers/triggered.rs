//! Triggered send API
//!
//! `POST /api/triggered` sends one email through a triggered campaign,
//! personalized with the request's `data` payload. The send is queued,
//! not synchronous; the response only acknowledges enqueueing.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::ValidateEmail;

use crate::error::{MailcastError, Result};
use crate::state::AppState;

use super::auth::AuthenticatedKey;
use super::Ack;

/// Body for `POST /api/triggered`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredSendRequest {
    pub campaign_id: i64,
    pub email: String,
    /// Merge-tag values for this send, also exposed as contact metadata
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

pub async fn send(
    State(state): State<AppState>,
    key: AuthenticatedKey,
    Json(req): Json<TriggeredSendRequest>,
) -> Result<Json<Ack>> {
    if !req.email.validate_email() {
        return Err(MailcastError::Validation(format!(
            "invalid email address: {}",
            req.email
        )));
    }

    let campaign = state
        .store
        .campaign(req.campaign_id)
        .await?
        .ok_or_else(|| MailcastError::NotFound(format!("campaign {}", req.campaign_id)))?;
    if campaign.project_id != key.project_id() {
        return Err(MailcastError::NotFound(format!(
            "campaign {}",
            req.campaign_id
        )));
    }

    state
        .campaigns
        .send_triggered(req.campaign_id, &req.email, req.data)
        .await?;

    tracing::info!(
        campaign_id = req.campaign_id,
        to = %req.email,
        "triggered send queued"
    );
    Ok(Json(Ack { success: true }))
}
