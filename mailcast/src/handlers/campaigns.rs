//! Campaign send API
//!
//! `POST /api/v1/campaigns/{id}/send` kicks off fan-out for a draft
//! campaign. Fan-out is synchronous (jobs are enqueued before the
//! response) but delivery happens in the worker.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::{MailcastError, Result};
use crate::state::AppState;

use super::auth::AuthenticatedKey;

/// Response for a campaign send request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    /// Jobs enqueued for this campaign
    pub recipients: usize,
}

pub async fn send(
    State(state): State<AppState>,
    key: AuthenticatedKey,
    Path(campaign_id): Path<i64>,
) -> Result<Json<SendResponse>> {
    let campaign = state
        .store
        .campaign(campaign_id)
        .await?
        .ok_or_else(|| MailcastError::NotFound(format!("campaign {campaign_id}")))?;
    if campaign.project_id != key.project_id() {
        return Err(MailcastError::NotFound(format!("campaign {campaign_id}")));
    }

    let report = state.campaigns.send_campaign(campaign_id).await?;

    Ok(Json(SendResponse {
        success: true,
        recipients: report.recipients,
    }))
}
