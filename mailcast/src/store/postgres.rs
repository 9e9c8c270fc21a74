//! Postgres store (sqlx)
//!
//! Runtime-bound queries against the schema in `migrations/`. Enum
//! columns are TEXT holding the same wire strings the API serializes;
//! metadata and design documents are JSONB.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::{
    ApiKey, Campaign, CampaignEvent, CampaignKind, CampaignStatus, Contact, EmailProvider,
    EmailTemplate, EventRecord, EventType, NewContact, Project, ProviderKind, RecipientList,
    TriggeredSendStatus,
};
use crate::error::{MailcastError, Result};

use super::Store;

/// Postgres-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MailcastError::Config(format!("migration failed: {e}")))?;
        Ok(())
    }
}

fn parse_enum<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| MailcastError::Database(sqlx::Error::Decode(e.into())))
}

fn campaign_from_row(row: &PgRow) -> Result<Campaign> {
    Ok(Campaign {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        template_id: row.try_get("template_id")?,
        list_id: row.try_get("list_id")?,
        kind: parse_enum(row.try_get::<String, _>("kind")?.as_str())?,
        name: row.try_get("name")?,
        from_name: row.try_get("from_name")?,
        from_email: row.try_get("from_email")?,
        subject: row.try_get("subject")?,
        status: parse_enum(row.try_get::<String, _>("status")?.as_str())?,
        sent_at: row.try_get("sent_at")?,
    })
}

fn contact_from_row(row: &PgRow) -> Result<Contact> {
    let meta: serde_json::Value = row.try_get("meta")?;
    let meta: HashMap<String, serde_json::Value> =
        serde_json::from_value(meta).unwrap_or_default();
    Ok(Contact {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        meta,
        unsubscribed: row.try_get("unsubscribed")?,
    })
}

fn list_from_row(row: &PgRow) -> Result<RecipientList> {
    Ok(RecipientList {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn project(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT id, name, provider_id FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(Project {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                provider_id: row.try_get("provider_id")?,
            })
        })
        .transpose()
    }

    async fn provider(&self, id: i64) -> Result<Option<EmailProvider>> {
        let row = sqlx::query("SELECT id, name, kind, config FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(EmailProvider {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                kind: parse_enum::<ProviderKind>(row.try_get::<String, _>("kind")?.as_str())?,
                config: row.try_get("config")?,
            })
        })
        .transpose()
    }

    async fn template(&self, id: i64) -> Result<Option<EmailTemplate>> {
        let row = sqlx::query(
            "SELECT id, project_id, name, subject, html, design FROM templates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| {
            let design: Option<serde_json::Value> = row.try_get("design")?;
            Ok(EmailTemplate {
                id: row.try_get("id")?,
                project_id: row.try_get("project_id")?,
                name: row.try_get("name")?,
                subject: row.try_get("subject")?,
                html: row.try_get("html")?,
                design: design.and_then(|d| serde_json::from_value(d).ok()),
            })
        })
        .transpose()
    }

    async fn campaign(&self, id: i64) -> Result<Option<Campaign>> {
        let row = sqlx::query(
            "SELECT id, project_id, template_id, list_id, kind, name, from_name, from_email, \
             subject, status, sent_at FROM campaigns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| campaign_from_row(&row)).transpose()
    }

    async fn set_campaign_status(
        &self,
        id: i64,
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE campaigns SET status = $2, sent_at = COALESCE($3, sent_at) WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn log_event(&self, event: EventRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO campaign_events (campaign_id, contact_id, email, event_type, metadata) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event.campaign_id)
        .bind(event.contact_id)
        .bind(&event.email)
        .bind(event.event_type.to_string())
        .bind(&event.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn events_for_campaign(&self, campaign_id: i64) -> Result<Vec<CampaignEvent>> {
        let rows = sqlx::query(
            "SELECT id, campaign_id, contact_id, email, event_type, metadata, created_at \
             FROM campaign_events WHERE campaign_id = $1 ORDER BY created_at, id",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CampaignEvent {
                    id: row.try_get("id")?,
                    campaign_id: row.try_get("campaign_id")?,
                    contact_id: row.try_get("contact_id")?,
                    email: row.try_get("email")?,
                    event_type: parse_enum::<EventType>(
                        row.try_get::<String, _>("event_type")?.as_str(),
                    )?,
                    metadata: row.try_get("metadata")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn list(&self, id: i64) -> Result<Option<RecipientList>> {
        let row = sqlx::query(
            "SELECT id, project_id, name, description FROM recipient_lists WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| list_from_row(&row)).transpose()
    }

    async fn lists_for_project(&self, project_id: i64) -> Result<Vec<RecipientList>> {
        let rows = sqlx::query(
            "SELECT id, project_id, name, description FROM recipient_lists \
             WHERE project_id = $1 ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(list_from_row).collect()
    }

    async fn create_list(
        &self,
        project_id: i64,
        name: String,
        description: Option<String>,
    ) -> Result<RecipientList> {
        let row = sqlx::query(
            "INSERT INTO recipient_lists (project_id, name, description) \
             VALUES ($1, $2, $3) RETURNING id, project_id, name, description",
        )
        .bind(project_id)
        .bind(&name)
        .bind(&description)
        .fetch_one(&self.pool)
        .await?;
        list_from_row(&row)
    }

    async fn delete_list(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM list_contacts WHERE list_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM recipient_lists WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_contacts_to_list(&self, list_id: i64, contact_ids: &[i64]) -> Result<()> {
        sqlx::query(
            "INSERT INTO list_contacts (list_id, contact_id) \
             SELECT $1, unnest($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(list_id)
        .bind(contact_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_contacts_from_list(&self, list_id: i64, contact_ids: &[i64]) -> Result<()> {
        sqlx::query("DELETE FROM list_contacts WHERE list_id = $1 AND contact_id = ANY($2)")
            .bind(list_id)
            .bind(contact_ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn contacts_for_list(&self, list_id: i64, active_only: bool) -> Result<Vec<Contact>> {
        let rows = sqlx::query(
            "SELECT c.id, c.project_id, c.email, c.name, c.meta, c.unsubscribed \
             FROM contacts c JOIN list_contacts lc ON lc.contact_id = c.id \
             WHERE lc.list_id = $1 AND ($2 = FALSE OR c.unsubscribed = FALSE) \
             ORDER BY c.id",
        )
        .bind(list_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(contact_from_row).collect()
    }

    async fn contact_count(&self, list_id: i64) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM list_contacts WHERE list_id = $1")
            .bind(list_id)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.unsigned_abs())
    }

    async fn contact(&self, id: i64) -> Result<Option<Contact>> {
        let row = sqlx::query(
            "SELECT id, project_id, email, name, meta, unsubscribed FROM contacts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| contact_from_row(&row)).transpose()
    }

    async fn upsert_contacts(
        &self,
        project_id: i64,
        contacts: Vec<NewContact>,
    ) -> Result<Vec<Contact>> {
        let mut result = Vec::with_capacity(contacts.len());
        for new in contacts {
            let meta = serde_json::to_value(&new.meta)
                .map_err(|e| MailcastError::Validation(e.to_string()))?;
            let row = sqlx::query(
                "INSERT INTO contacts (project_id, email, name, meta) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (project_id, email) DO UPDATE SET \
                 name = COALESCE(EXCLUDED.name, contacts.name), \
                 meta = contacts.meta || EXCLUDED.meta \
                 RETURNING id, project_id, email, name, meta, unsubscribed",
            )
            .bind(project_id)
            .bind(new.email.to_lowercase())
            .bind(&new.name)
            .bind(&meta)
            .fetch_one(&self.pool)
            .await?;
            result.push(contact_from_row(&row)?);
        }
        Ok(result)
    }

    async fn contacts_by_emails(&self, project_id: i64, emails: &[String]) -> Result<Vec<Contact>> {
        let wanted: Vec<String> = emails.iter().map(|e| e.to_lowercase()).collect();
        let rows = sqlx::query(
            "SELECT id, project_id, email, name, meta, unsubscribed FROM contacts \
             WHERE project_id = $1 AND email = ANY($2)",
        )
        .bind(project_id)
        .bind(&wanted)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(contact_from_row).collect()
    }

    async fn mark_unsubscribed(&self, contact_id: i64) -> Result<()> {
        sqlx::query("UPDATE contacts SET unsubscribed = TRUE WHERE id = $1")
            .bind(contact_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn log_triggered_send(
        &self,
        campaign_id: i64,
        email: &str,
        status: TriggeredSendStatus,
        error: Option<String>,
        data: Option<serde_json::Value>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO triggered_send_logs (campaign_id, email, status, error, data) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(campaign_id)
        .bind(email)
        .bind(status.to_string())
        .bind(&error)
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query("SELECT id, project_id, key, name FROM api_keys WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(ApiKey {
                id: row.try_get("id")?,
                project_id: row.try_get("project_id")?,
                key: row.try_get("key")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }
}
