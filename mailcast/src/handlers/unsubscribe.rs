//! One-click unsubscribe page
//!
//! The token binds one contact to one campaign and is verified before
//! anything is written. The flow is idempotent: a second visit with the
//! same token reports success without logging a duplicate event.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::domain::{EventRecord, EventType};
use crate::error::Result;
use crate::state::AppState;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"font-family: sans-serif; max-width: 480px; margin: 80px auto; text-align: center;\">\
         <h1>{title}</h1><p>{body}</p></body></html>"
    )
}

/// `GET /unsubscribe/{token}`
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response> {
    let Some(decoded) = state.codec.decode(&token) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Html(page(
                "Invalid link",
                "This unsubscribe link is invalid or has been tampered with.",
            )),
        )
            .into_response());
    };

    let Some(contact) = state.store.contact(decoded.contact_id).await? else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Html(page(
                "Invalid link",
                "This unsubscribe link no longer matches a known recipient.",
            )),
        )
            .into_response());
    };

    if contact.unsubscribed {
        return Ok(Html(page(
            "Already unsubscribed",
            "You were already unsubscribed. No further emails will be sent.",
        ))
        .into_response());
    }

    state.store.mark_unsubscribed(contact.id).await?;
    state
        .store
        .log_event(EventRecord {
            campaign_id: decoded.campaign_id,
            contact_id: contact.id,
            email: contact.email.clone(),
            event_type: EventType::Unsubscribe,
            metadata: serde_json::json!({}),
        })
        .await?;

    tracing::info!(
        contact_id = contact.id,
        campaign_id = decoded.campaign_id,
        "contact unsubscribed"
    );

    Ok(Html(page(
        "Unsubscribed",
        "You have been unsubscribed and will not receive further emails.",
    ))
    .into_response())
}
