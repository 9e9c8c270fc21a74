//! Delivery job queue
//!
//! Campaign fan-out produces one [`EmailJob`] per recipient. Jobs are
//! enqueued through the [`JobQueue`] port and drained by the
//! [`Worker`], which sends through the configured mail provider and
//! records delivery events.
//!
//! Retry policy: a failed attempt is rescheduled with exponential
//! backoff (`base * 2^(attempts - 1)`) until `max_attempts` is reached,
//! at which point the entry is marked failed and exactly one `FAILED`
//! event is recorded for the recipient.

mod entry;
mod queue;
mod worker;

pub use entry::{JobEntry, JobStatus, EMAIL_JOB_NAME};
pub use queue::{JobQueue, MemoryQueue, PgQueue};
pub use worker::{MailerFactory, Worker};

use serde::{Deserialize, Serialize};

/// Fully personalized email, ready to hand to a provider
///
/// All merge tags are resolved and tracking is applied before the job
/// is enqueued; the worker performs no templating of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub campaign_id: i64,
    /// 0 for sends without a tracked contact (triggered API)
    pub contact_id: i64,
    pub email: String,
    /// Sender in `Name <addr>` or bare address form
    pub from: String,
    pub subject: String,
    pub html: String,
    /// Provider to send through, resolved at fan-out time
    pub provider_id: i64,
}

/// Errors surfaced by queue backends
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("failed to serialize job payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("queue backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
