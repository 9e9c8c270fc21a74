//! HTTP surface
//!
//! Public endpoints (unsubscribe page, tracking) take no credentials;
//! the JSON API under `/api` requires a project-scoped key via
//! `Authorization: Bearer <key>`.

pub mod audience;
pub mod auth;
pub mod campaigns;
pub mod tracking;
pub mod triggered;
pub mod unsubscribe;

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Generic acknowledgement body
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    #[must_use]
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/unsubscribe/{token}", get(unsubscribe::unsubscribe))
        .route(
            "/api/track/open/{campaign_id}/{email}",
            get(tracking::open),
        )
        .route(
            "/api/track/click/{campaign_id}/{email}",
            get(tracking::click),
        )
        .route("/api/triggered", post(triggered::send))
        .route("/api/v1/campaigns/{id}/send", post(campaigns::send))
        .route(
            "/api/v1/audience/lists",
            get(audience::list_lists).post(audience::create_list),
        )
        .route("/api/v1/audience/lists/{id}", delete(audience::delete_list))
        .route(
            "/api/v1/audience/lists/{id}/contacts",
            post(audience::add_contacts).delete(audience::remove_contacts),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Ack> {
    Ack::ok()
}
