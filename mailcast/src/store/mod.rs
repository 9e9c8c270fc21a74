//! Persistence port
//!
//! The pipeline and HTTP handlers talk to storage through the [`Store`]
//! trait. Two implementations ship: [`MemoryStore`] for development and
//! tests, and [`PgStore`] backed by Postgres.
//!
//! Write semantics the rest of the crate relies on:
//! - the event log is append-only; events are never mutated or deleted
//! - campaign status updates are single-row, last-writer-wins
//! - contact upserts key on `(project_id, lowercase email)`

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ApiKey, Campaign, CampaignEvent, CampaignStatus, Contact, EmailProvider, EmailTemplate,
    EventRecord, NewContact, Project, RecipientList, TriggeredSendStatus,
};
use crate::error::Result;

/// Storage operations required by the pipeline and HTTP surface
#[async_trait]
pub trait Store: Send + Sync {
    // Projects and providers

    async fn project(&self, id: i64) -> Result<Option<Project>>;

    async fn provider(&self, id: i64) -> Result<Option<EmailProvider>>;

    // Templates

    async fn template(&self, id: i64) -> Result<Option<EmailTemplate>>;

    // Campaigns and the event log

    async fn campaign(&self, id: i64) -> Result<Option<Campaign>>;

    /// Single-row status update; `sent_at` is set only when provided
    async fn set_campaign_status(
        &self,
        id: i64,
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Append one event; the store assigns id and timestamp
    async fn log_event(&self, event: EventRecord) -> Result<()>;

    async fn events_for_campaign(&self, campaign_id: i64) -> Result<Vec<CampaignEvent>>;

    // Recipient lists

    async fn list(&self, id: i64) -> Result<Option<RecipientList>>;

    async fn lists_for_project(&self, project_id: i64) -> Result<Vec<RecipientList>>;

    async fn create_list(
        &self,
        project_id: i64,
        name: String,
        description: Option<String>,
    ) -> Result<RecipientList>;

    async fn delete_list(&self, id: i64) -> Result<()>;

    async fn add_contacts_to_list(&self, list_id: i64, contact_ids: &[i64]) -> Result<()>;

    async fn remove_contacts_from_list(&self, list_id: i64, contact_ids: &[i64]) -> Result<()>;

    /// Contacts in a list; `active_only` filters out unsubscribed contacts
    async fn contacts_for_list(&self, list_id: i64, active_only: bool) -> Result<Vec<Contact>>;

    async fn contact_count(&self, list_id: i64) -> Result<u64>;

    // Contacts

    async fn contact(&self, id: i64) -> Result<Option<Contact>>;

    /// Insert or update contacts by `(project_id, lowercase email)`,
    /// returning the stored rows in input order
    async fn upsert_contacts(
        &self,
        project_id: i64,
        contacts: Vec<NewContact>,
    ) -> Result<Vec<Contact>>;

    async fn contacts_by_emails(&self, project_id: i64, emails: &[String]) -> Result<Vec<Contact>>;

    /// Mark a contact globally unsubscribed for its project
    async fn mark_unsubscribed(&self, contact_id: i64) -> Result<()>;

    // Triggered send log (separate from the campaign event log)

    async fn log_triggered_send(
        &self,
        campaign_id: i64,
        email: &str,
        status: TriggeredSendStatus,
        error: Option<String>,
        data: Option<serde_json::Value>,
    ) -> Result<()>;

    // API keys

    async fn api_key(&self, key: &str) -> Result<Option<ApiKey>>;
}
