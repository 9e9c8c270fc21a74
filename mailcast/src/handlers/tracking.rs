//! Open and click tracking endpoints
//!
//! Both endpoints are best-effort: a failed event write is logged and
//! swallowed so the pixel always renders and the redirect always fires.
//! Campaign id 0 is the "untracked" sentinel and records nothing.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::domain::{EventRecord, EventType};
use crate::state::AppState;

/// Smallest valid transparent GIF, served as the open pixel
const TRANSPARENT_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Query string for the click endpoint
#[derive(Debug, Deserialize)]
pub struct ClickParams {
    /// Destination the link originally pointed at
    pub url: Option<String>,
}

async fn record(state: &AppState, campaign_id: i64, email: &str, event_type: EventType, metadata: serde_json::Value) {
    if campaign_id == 0 {
        return;
    }
    let record = EventRecord {
        campaign_id,
        contact_id: 0,
        email: email.to_string(),
        event_type,
        metadata,
    };
    if let Err(error) = state.store.log_event(record).await {
        tracing::error!(campaign_id, %event_type, %error, "failed to record tracking event");
    }
}

/// `GET /api/track/open/{campaign_id}/{email}`
pub async fn open(
    State(state): State<AppState>,
    Path((campaign_id, email)): Path<(i64, String)>,
) -> Response {
    record(&state, campaign_id, &email, EventType::Opened, serde_json::json!({})).await;

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, max-age=0"),
        ],
        TRANSPARENT_GIF.to_vec(),
    )
        .into_response()
}

/// `GET /api/track/click/{campaign_id}/{email}?url=...`
pub async fn click(
    State(state): State<AppState>,
    Path((campaign_id, email)): Path<(i64, String)>,
    Query(params): Query<ClickParams>,
) -> Response {
    let destination = params
        .url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| state.config.service.base_url.clone());

    record(
        &state,
        campaign_id,
        &email,
        EventType::Clicked,
        serde_json::json!({ "url": destination }),
    )
    .await;

    Redirect::temporary(&destination).into_response()
}
