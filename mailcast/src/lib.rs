//! mailcast: self-hosted email campaign delivery
//!
//! The crate's core is the composition and delivery pipeline: templates
//! carry merge tags and a structured design document; fan-out
//! personalizes each recipient's copy (unsubscribe token, merge
//! resolution, click/open tracking) and enqueues one job per recipient;
//! a worker drains the queue through the configured mail provider with
//! retry and backoff, recording delivery events along the way.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mailcast::config::MailcastConfig;
//! use mailcast::handlers;
//! use mailcast::jobs::MemoryQueue;
//! use mailcast::state::AppState;
//! use mailcast::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MailcastConfig::load()?;
//!     let state = AppState::new(
//!         config,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryQueue::new()),
//!     );
//!
//!     let app = handlers::router(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`campaign`] validates and fans out sends
//! - [`merge`], [`tracking`], [`unsubscribe`], [`design`] and [`render`]
//!   are pure composition stages
//! - [`jobs`] is the queue port plus the delivery worker
//! - [`store`] is the persistence port (memory and Postgres backends)
//! - [`handlers`] is the HTTP surface

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::missing_errors_doc)]

pub mod campaign;
pub mod config;
pub mod design;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod mail;
pub mod merge;
pub mod observability;
pub mod render;
pub mod state;
pub mod store;
pub mod tracking;
pub mod unsubscribe;

/// Commonly used items
pub mod prelude {
    pub use crate::campaign::{CampaignService, SendReport};
    pub use crate::config::MailcastConfig;
    pub use crate::domain::{
        Campaign, CampaignKind, CampaignStatus, Contact, EmailTemplate, EventType, Project,
        RecipientList,
    };
    pub use crate::error::{MailcastError, Result};
    pub use crate::jobs::{EmailJob, JobQueue, MemoryQueue, PgQueue, Worker};
    pub use crate::state::AppState;
    pub use crate::store::{MemoryStore, PgStore, Store};
}
