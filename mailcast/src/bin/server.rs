//! HTTP server binary
//!
//! Serves the JSON API, unsubscribe page and tracking endpoints against
//! Postgres. Run the delivery worker separately (`mailcast-worker`-style
//! deployments) or alongside in development.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use mailcast::config::MailcastConfig;
use mailcast::handlers;
use mailcast::jobs::PgQueue;
use mailcast::state::AppState;
use mailcast::store::PgStore;
use mailcast::{jobs::JobQueue, observability, store::Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init()?;

    let config = MailcastConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    let store = PgStore::new(pool.clone());
    store.migrate().await?;

    let queue = PgQueue::new(pool);
    let port = config.service.port;
    let state = AppState::new(
        config,
        Arc::new(store) as Arc<dyn Store>,
        Arc::new(queue) as Arc<dyn JobQueue>,
    );

    let app = handlers::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "mailcast server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
