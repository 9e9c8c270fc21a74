//! Queue entries
//!
//! [`JobEntry`] is the unit of work a queue backend stores. Fields map
//! directly to the `jobs` table columns in the Postgres backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EmailJob;

/// Job name used for campaign delivery entries
pub const EMAIL_JOB_NAME: &str = "send-email";

/// Status of a job in the queue
///
/// There is no terminal "sent" state: entries that deliver successfully
/// are removed from the queue, only failed ones are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting for a worker (initial state, and after a retryable failure)
    Queued,
    /// Claimed by a worker
    Running,
    /// Attempts exhausted; kept for inspection
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Serialized representation of a queued job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    pub id: Uuid,
    pub name: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    /// Incremented when a worker claims the entry
    pub attempts: i32,
    pub max_attempts: i32,
    /// Entry is not claimable before this instant
    pub run_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobEntry {
    /// Build a fresh entry for an email delivery job
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn for_email(job: &EmailJob, max_attempts: i32) -> Result<Self, serde_json::Error> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: EMAIL_JOB_NAME.to_string(),
            payload: serde_json::to_value(job)?,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts,
            run_at: now,
            locked_at: None,
            locked_by: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }
}
