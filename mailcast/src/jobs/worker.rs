//! Delivery worker
//!
//! Polls a [`JobQueue`], sends each claimed [`EmailJob`] through the
//! campaign's provider and records the outcome in the event log:
//!
//! - success: one `SENT` event (provider name, message id) followed by
//!   one `DELIVERED` event; the entry is removed from the queue
//! - retryable failure: entry is rescheduled with exponential backoff
//! - terminal failure: exactly one `FAILED` event, recorded only when
//!   the last attempt is exhausted; the entry is retained for inspection
//!
//! Jobs with `campaign_id == 0` are sent but produce no events at all;
//! the triggered API uses that sentinel for sends that should not
//! pollute campaign analytics.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::QueueSettings;
use crate::domain::{EmailProvider, EventRecord, EventType};
use crate::mail::{mailer_for, Envelope, MailError, Mailer};
use crate::store::Store;

use super::entry::{JobEntry, JobStatus};
use super::queue::JobQueue;
use super::EmailJob;

/// Builds a mailer for a provider; injectable so tests can substitute
/// a failing or recording backend
pub type MailerFactory =
    Arc<dyn Fn(&EmailProvider) -> Result<Box<dyn Mailer>, MailError> + Send + Sync>;

/// Queue-draining delivery worker
///
/// ```ignore
/// Worker::new(queue, store, config.queue.clone()).start();
/// ```
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn Store>,
    mailer_factory: MailerFactory,
    settings: QueueSettings,
    worker_id: String,
}

impl Worker {
    #[must_use]
    pub fn new(queue: Arc<dyn JobQueue>, store: Arc<dyn Store>, settings: QueueSettings) -> Self {
        Self {
            queue,
            store,
            mailer_factory: Arc::new(mailer_for),
            settings,
            worker_id: Uuid::new_v4().to_string(),
        }
    }

    /// Replace the provider-to-mailer factory
    #[must_use]
    pub fn with_mailer_factory(mut self, factory: MailerFactory) -> Self {
        self.mailer_factory = factory;
        self
    }

    /// Start the polling loop on a background task and return immediately
    pub fn start(self: Arc<Self>) {
        let concurrency = self.settings.concurrency.max(1);
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);

        tokio::spawn(async move {
            let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
            tracing::info!(worker_id = %self.worker_id, concurrency, "delivery worker running");

            loop {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    return;
                };

                let entry = match self.queue.claim_next(&self.worker_id).await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => {
                        drop(permit);
                        tokio::time::sleep(poll_interval).await;
                        continue;
                    }
                    Err(error) => {
                        drop(permit);
                        tracing::error!(%error, "failed to poll job queue");
                        tokio::time::sleep(poll_interval).await;
                        continue;
                    }
                };

                let worker = Arc::clone(&self);
                tokio::spawn(async move {
                    let _permit = permit;
                    let span = tracing::info_span!("email_job", job_id = %entry.id);
                    worker.process(entry).instrument(span).await;
                });
            }
        });
    }

    /// Claim and process a single entry; returns whether one was found
    ///
    /// Drives the same transition logic as the polling loop, inline.
    pub async fn tick(&self) -> Result<bool, super::JobError> {
        match self.queue.claim_next(&self.worker_id).await? {
            Some(entry) => {
                self.process(entry).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn process(&self, mut entry: JobEntry) {
        let job: EmailJob = match serde_json::from_value(entry.payload.clone()) {
            Ok(job) => job,
            Err(error) => {
                // Malformed payload can never succeed; fail without retry
                tracing::error!(job_id = %entry.id, %error, "unparseable job payload");
                entry.status = JobStatus::Failed;
                entry.last_error = Some(format!("invalid payload: {error}"));
                if let Err(error) = self.queue.update(&entry).await {
                    tracing::error!(job_id = %entry.id, %error, "failed to update job entry");
                }
                return;
            }
        };

        match self.attempt(&job).await {
            Ok((provider_name, message_id)) => {
                tracing::info!(
                    job_id = %entry.id,
                    campaign_id = job.campaign_id,
                    to = %job.email,
                    %message_id,
                    "email sent"
                );

                self.log_event(&job, EventType::Sent, serde_json::json!({
                    "provider": provider_name,
                    "messageId": message_id,
                }))
                .await;
                self.log_event(&job, EventType::Delivered, serde_json::json!({
                    "deliveryTime": "0.1s",
                }))
                .await;

                // completed entries are not retained
                if let Err(error) = self.queue.remove(entry.id).await {
                    tracing::error!(job_id = %entry.id, %error, "failed to remove completed job");
                }
            }
            Err(error) => {
                let message = error.to_string();
                entry.last_error = Some(message.clone());
                entry.locked_at = None;
                entry.locked_by = None;
                entry.updated_at = Utc::now();

                if entry.attempts < entry.max_attempts {
                    let backoff_secs = self
                        .settings
                        .backoff_base_secs
                        .saturating_mul(2_u64.saturating_pow(entry.attempts.unsigned_abs() - 1))
                        .min(300);
                    entry.status = JobStatus::Queued;
                    entry.run_at = Utc::now() + chrono::Duration::seconds(backoff_secs as i64);
                    tracing::warn!(
                        job_id = %entry.id,
                        to = %job.email,
                        attempt = entry.attempts,
                        backoff_secs,
                        error = %message,
                        "send failed, retry scheduled"
                    );
                } else {
                    entry.status = JobStatus::Failed;
                    tracing::error!(
                        job_id = %entry.id,
                        to = %job.email,
                        attempts = entry.attempts,
                        error = %message,
                        "send permanently failed"
                    );
                    self.log_event(&job, EventType::Failed, serde_json::json!({
                        "error": message,
                    }))
                    .await;
                }

                if let Err(error) = self.queue.update(&entry).await {
                    tracing::error!(job_id = %entry.id, %error, "failed to update job entry");
                }
            }
        }
    }

    /// One delivery attempt; returns the provider name and message id
    async fn attempt(&self, job: &EmailJob) -> Result<(String, String), MailError> {
        let provider = self
            .store
            .provider(job.provider_id)
            .await
            .map_err(|e| MailError::Config(e.to_string()))?
            .ok_or_else(|| MailError::Config(format!("provider {} not found", job.provider_id)))?;

        let mailer = (self.mailer_factory)(&provider)?;
        let envelope = Envelope {
            from: job.from.clone(),
            to: job.email.clone(),
            subject: job.subject.clone(),
            html: job.html.clone(),
        };

        let outcome = mailer.send(&envelope).await?;
        Ok((provider.name, outcome.message_id))
    }

    async fn log_event(&self, job: &EmailJob, event_type: EventType, metadata: serde_json::Value) {
        if job.campaign_id == 0 {
            return;
        }
        let record = EventRecord {
            campaign_id: job.campaign_id,
            contact_id: job.contact_id,
            email: job.email.clone(),
            event_type,
            metadata,
        };
        if let Err(error) = self.store.log_event(record).await {
            tracing::error!(
                campaign_id = job.campaign_id,
                %event_type,
                %error,
                "failed to record delivery event"
            );
        }
    }
}
