//! Delivery worker binary
//!
//! Drains the Postgres job queue. Safe to run multiple instances; the
//! queue claims entries with `FOR UPDATE SKIP LOCKED`.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use mailcast::config::MailcastConfig;
use mailcast::jobs::{JobQueue, PgQueue, Worker};
use mailcast::observability;
use mailcast::store::{PgStore, Store};

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

    let worker = Worker::new(
        Arc::new(PgQueue::new(pool)) as Arc<dyn JobQueue>,
        Arc::new(store) as Arc<dyn Store>,
        config.queue,
    );
    Arc::new(worker).start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    Ok(())
}
