//! Queue backends
//!
//! [`MemoryQueue`] keeps entries in a `Vec` behind a mutex for
//! development and tests. [`PgQueue`] stores entries in the `jobs`
//! table and claims with `FOR UPDATE SKIP LOCKED` so multiple worker
//! processes can drain the same queue.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::entry::{JobEntry, JobStatus};
use super::JobError;

/// Queue operations required by fan-out and the worker
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, entry: &JobEntry) -> Result<(), JobError>;

    /// Enqueue a batch; the default loops over [`JobQueue::enqueue`]
    async fn enqueue_bulk(&self, entries: &[JobEntry]) -> Result<(), JobError> {
        for entry in entries {
            self.enqueue(entry).await?;
        }
        Ok(())
    }

    /// Claim the next due entry, marking it running and bumping `attempts`
    async fn claim_next(&self, worker_id: &str) -> Result<Option<JobEntry>, JobError>;

    /// Persist a state transition decided by the worker
    async fn update(&self, entry: &JobEntry) -> Result<(), JobError>;

    /// Delete an entry; called after a successful send so only failed
    /// entries are retained
    async fn remove(&self, id: Uuid) -> Result<(), JobError>;
}

/// In-memory queue; not durable, all entries are lost on restart
#[derive(Clone, Default)]
pub struct MemoryQueue {
    entries: Arc<Mutex<Vec<JobEntry>>>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries, in insertion order
    pub async fn snapshot(&self) -> Vec<JobEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, entry: &JobEntry) -> Result<(), JobError> {
        let mut entries = self.entries.lock().await;
        entries.push(entry.clone());
        Ok(())
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<JobEntry>, JobError> {
        let mut entries = self.entries.lock().await;
        let now = Utc::now();

        let pos = entries
            .iter()
            .position(|e| e.status == JobStatus::Queued && e.run_at <= now);

        if let Some(idx) = pos {
            let entry = &mut entries[idx];
            entry.status = JobStatus::Running;
            entry.locked_at = Some(now);
            entry.locked_by = Some(worker_id.to_string());
            entry.attempts += 1;
            entry.updated_at = now;
            Ok(Some(entry.clone()))
        } else {
            Ok(None)
        }
    }

    async fn update(&self, entry: &JobEntry) -> Result<(), JobError> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), JobError> {
        let mut entries = self.entries.lock().await;
        entries.retain(|e| e.id != id);
        Ok(())
    }
}

/// Postgres-backed queue
#[derive(Clone)]
pub struct PgQueue {
    pool: PgPool,
}

impl PgQueue {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<JobEntry, JobError> {
    let status: String = row.try_get("status")?;
    Ok(JobEntry {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        payload: row.try_get("payload")?,
        status: JobStatus::from_str(&status).map_err(JobError::Backend)?,
        attempts: row.try_get("attempts")?,
        max_attempts: row.try_get("max_attempts")?,
        run_at: row.try_get("run_at")?,
        locked_at: row.try_get("locked_at")?,
        locked_by: row.try_get("locked_by")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl JobQueue for PgQueue {
    async fn enqueue(&self, entry: &JobEntry) -> Result<(), JobError> {
        sqlx::query(
            "INSERT INTO jobs (id, name, payload, status, attempts, max_attempts, run_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(&entry.name)
        .bind(&entry.payload)
        .bind(entry.status.to_string())
        .bind(entry.attempts)
        .bind(entry.max_attempts)
        .bind(entry.run_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn enqueue_bulk(&self, entries: &[JobEntry]) -> Result<(), JobError> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO jobs (id, name, payload, status, attempts, max_attempts, run_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(entry.id)
            .bind(&entry.name)
            .bind(&entry.payload)
            .bind(entry.status.to_string())
            .bind(entry.attempts)
            .bind(entry.max_attempts)
            .bind(entry.run_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<JobEntry>, JobError> {
        let row = sqlx::query(
            "WITH next AS (\
                SELECT id FROM jobs \
                WHERE status = 'QUEUED' AND run_at <= now() \
                ORDER BY run_at \
                LIMIT 1 \
                FOR UPDATE SKIP LOCKED\
             ) \
             UPDATE jobs SET \
                status = 'RUNNING', \
                attempts = attempts + 1, \
                locked_at = now(), \
                locked_by = $1, \
                updated_at = now() \
             WHERE id IN (SELECT id FROM next) \
             RETURNING id, name, payload, status, attempts, max_attempts, run_at, \
                       locked_at, locked_by, last_error, created_at, updated_at",
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn update(&self, entry: &JobEntry) -> Result<(), JobError> {
        sqlx::query(
            "UPDATE jobs SET \
                status = $2, run_at = $3, locked_at = $4, locked_by = $5, \
                last_error = $6, updated_at = now() \
             WHERE id = $1",
        )
        .bind(entry.id)
        .bind(entry.status.to_string())
        .bind(entry.run_at)
        .bind(entry.locked_at)
        .bind(&entry.locked_by)
        .bind(&entry.last_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), JobError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::EmailJob;
    use chrono::Duration;

    fn job(email: &str) -> JobEntry {
        JobEntry::for_email(
            &EmailJob {
                campaign_id: 1,
                contact_id: 1,
                email: email.into(),
                from: "no-reply@acme.io".into(),
                subject: "s".into(),
                html: "<p>h</p>".into(),
                provider_id: 1,
            },
            3,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_claim_marks_running_and_bumps_attempts() {
        let queue = MemoryQueue::new();
        queue.enqueue(&job("a@example.com")).await.unwrap();

        let claimed = queue.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.locked_by.as_deref(), Some("w1"));

        // already claimed, nothing left
        assert!(queue.claim_next("w2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_future_run_at_is_not_claimable() {
        let queue = MemoryQueue::new();
        let mut entry = job("a@example.com");
        entry.run_at = Utc::now() + Duration::minutes(5);
        queue.enqueue(&entry).await.unwrap();

        assert!(queue.claim_next("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_removed_entry_is_gone() {
        let queue = MemoryQueue::new();
        let entry = job("a@example.com");
        queue.enqueue(&entry).await.unwrap();

        queue.remove(entry.id).await.unwrap();
        assert!(queue.claim_next("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bulk_enqueue_preserves_order() {
        let queue = MemoryQueue::new();
        let entries = vec![job("a@example.com"), job("b@example.com")];
        queue.enqueue_bulk(&entries).await.unwrap();

        let first = queue.claim_next("w1").await.unwrap().unwrap();
        let job: EmailJob = serde_json::from_value(first.payload).unwrap();
        assert_eq!(job.email, "a@example.com");
    }
}
