//! Application state
//!
//! One [`AppState`] is built at startup and cloned into every handler.
//! Storage and queue are held behind trait objects so the server can run
//! against Postgres in production and the in-memory backends in tests.

use std::sync::Arc;

use crate::campaign::CampaignService;
use crate::config::MailcastConfig;
use crate::jobs::JobQueue;
use crate::store::Store;
use crate::unsubscribe::UnsubscribeCodec;

/// Shared state for the HTTP surface
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MailcastConfig>,
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn JobQueue>,
    pub campaigns: Arc<CampaignService>,
    pub codec: UnsubscribeCodec,
}

impl AppState {
    /// Wire the service layer over the chosen backends
    ///
    /// # Panics
    ///
    /// Panics if the configured tracking secret is shorter than the
    /// signing key minimum.
    #[must_use]
    pub fn new(config: MailcastConfig, store: Arc<dyn Store>, queue: Arc<dyn JobQueue>) -> Self {
        let campaigns = Arc::new(CampaignService::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            &config,
        ));
        let codec = UnsubscribeCodec::new(&config.tracking.secret);
        Self {
            config: Arc::new(config),
            store,
            queue,
            campaigns,
            codec,
        }
    }
}
