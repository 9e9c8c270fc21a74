//! Campaign orchestration
//!
//! [`CampaignService`] turns a draft campaign into queued delivery jobs.
//! Fan-out personalizes the template once per recipient (unsubscribe
//! token, merge tags, click tracking, open pixel) and hands the whole
//! batch to the queue in one call, then marks the campaign completed.
//!
//! Status semantics: `SENDING` covers only the fan-out window;
//! `COMPLETED` means every job was enqueued, not delivered. Delivery
//! outcomes live in the event log, written by the worker.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::config::MailcastConfig;
use crate::domain::{
    Campaign, CampaignKind, CampaignStatus, Contact, EmailTemplate, TriggeredSendStatus,
};
use crate::error::{MailcastError, Result};
use crate::jobs::{EmailJob, JobEntry, JobQueue};
use crate::merge::{self, MergeCampaign, MergeContact, MergeContext};
use crate::render::{self, RenderOptions};
use crate::store::Store;
use crate::tracking::{click_tracking_base, open_tracking_pixel, wrap_links_with_tracking};
use crate::unsubscribe::{UnsubscribeCodec, UnsubscribeToken};

/// Summary returned by a successful fan-out
#[derive(Debug, Clone, Copy)]
pub struct SendReport {
    /// Number of jobs handed to the queue
    pub recipients: usize,
}

/// Validates, personalizes and enqueues campaign sends
pub struct CampaignService {
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    codec: UnsubscribeCodec,
    base_url: String,
    default_from: String,
    max_attempts: i32,
}

impl CampaignService {
    /// # Panics
    ///
    /// Panics if the configured tracking secret is shorter than the
    /// signing key minimum.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn JobQueue>, config: &MailcastConfig) -> Self {
        Self {
            store,
            queue,
            codec: UnsubscribeCodec::new(&config.tracking.secret),
            base_url: config.service.base_url.trim_end_matches('/').to_string(),
            default_from: config.service.default_from.clone(),
            max_attempts: i32::try_from(config.queue.max_attempts).unwrap_or(i32::MAX),
        }
    }

    /// Fan a draft campaign out to its recipient list
    ///
    /// Preconditions are checked before any state changes: the campaign
    /// must be a draft with a template, a resolvable project provider
    /// and at least one active (not unsubscribed) contact. A failed
    /// precondition leaves the campaign in `DRAFT`.
    pub async fn send_campaign(&self, campaign_id: i64) -> Result<SendReport> {
        let campaign = self
            .store
            .campaign(campaign_id)
            .await?
            .ok_or_else(|| MailcastError::NotFound(format!("campaign {campaign_id}")))?;

        if campaign.status != CampaignStatus::Draft {
            return Err(MailcastError::Validation(format!(
                "campaign {campaign_id} is {} and cannot be sent again",
                campaign.status
            )));
        }

        let (template, project, provider_id) = self.resolve_send_inputs(&campaign).await?;

        let list_id = campaign.list_id.ok_or_else(|| {
            MailcastError::Validation("campaign has no recipient list".to_string())
        })?;
        let contacts = self.store.contacts_for_list(list_id, true).await?;
        if contacts.is_empty() {
            return Err(MailcastError::Validation(
                "recipient list has no active contacts".to_string(),
            ));
        }

        self.store
            .set_campaign_status(campaign.id, CampaignStatus::Sending, None)
            .await?;

        tracing::info!(
            campaign_id = campaign.id,
            recipients = contacts.len(),
            "campaign fan-out started"
        );

        let from = campaign.from_address(&self.default_from);
        let mut entries = Vec::with_capacity(contacts.len());
        for contact in &contacts {
            let (subject, html) = self.personalize(&campaign, &template, &project, contact);
            let job = EmailJob {
                campaign_id: campaign.id,
                contact_id: contact.id,
                email: contact.email.clone(),
                from: from.clone(),
                subject,
                html,
                provider_id,
            };
            entries.push(
                JobEntry::for_email(&job, self.max_attempts)
                    .map_err(|e| MailcastError::Queue(e.to_string()))?,
            );
        }

        self.queue
            .enqueue_bulk(&entries)
            .await
            .map_err(|e| MailcastError::Queue(e.to_string()))?;

        self.store
            .set_campaign_status(campaign.id, CampaignStatus::Completed, Some(Utc::now()))
            .await?;

        tracing::info!(
            campaign_id = campaign.id,
            recipients = entries.len(),
            "campaign fan-out completed"
        );

        Ok(SendReport {
            recipients: entries.len(),
        })
    }

    /// Send one email through a triggered campaign
    ///
    /// `data` feeds merge tags two ways: as flat custom overrides and as
    /// the pseudo-contact's metadata. The outcome is recorded in the
    /// triggered send log; delivery events still flow through the worker.
    pub async fn send_triggered(
        &self,
        campaign_id: i64,
        email: &str,
        data: HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        let campaign = self
            .store
            .campaign(campaign_id)
            .await?
            .ok_or_else(|| MailcastError::NotFound(format!("campaign {campaign_id}")))?;

        let result = self.enqueue_triggered(&campaign, email, &data).await;

        let (status, error) = match &result {
            Ok(()) => (TriggeredSendStatus::Success, None),
            Err(e) => (TriggeredSendStatus::Failure, Some(e.to_string())),
        };
        let payload = if data.is_empty() {
            None
        } else {
            serde_json::to_value(&data).ok()
        };
        self.store
            .log_triggered_send(campaign.id, email, status, error, payload)
            .await?;

        result
    }

    async fn enqueue_triggered(
        &self,
        campaign: &Campaign,
        email: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        if campaign.kind != CampaignKind::Triggered {
            return Err(MailcastError::Validation(format!(
                "campaign {} is not a triggered campaign",
                campaign.id
            )));
        }

        let (template, project, provider_id) = self.resolve_send_inputs(campaign).await?;

        // Pseudo-contact assembled from the request payload. There is
        // no stored contact, so no unsubscribe link is generated.
        let contact = MergeContact {
            email: email.to_string(),
            name: data
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            meta: data.clone(),
        };
        let ctx = MergeContext {
            contact: Some(contact),
            project_name: Some(project.name.clone()),
            campaign: Some(MergeCampaign {
                id: Some(campaign.id),
                name: campaign.name.clone(),
            }),
            unsubscribe_url: Some("#".to_string()),
            custom: data.clone(),
        };

        let subject_template = campaign
            .subject
            .clone()
            .unwrap_or_else(|| template.subject.clone());
        let subject = merge::resolve(&subject_template, &ctx);
        let mut html = merge::resolve(&self.template_html(&template), &ctx)
            .replace(merge::UNSUBSCRIBE_PLACEHOLDER, "#");

        // Tracking applies to triggered sends too; the bare "#"
        // unsubscribe href is skipped by the link wrapper.
        let click_base = click_tracking_base(&self.base_url, campaign.id, email);
        html = wrap_links_with_tracking(&html, &click_base);
        html.push_str(&open_tracking_pixel(&self.base_url, campaign.id, email));

        let job = EmailJob {
            campaign_id: campaign.id,
            contact_id: 0,
            email: email.to_string(),
            from: campaign.from_address(&self.default_from),
            subject,
            html,
            provider_id,
        };
        let entry = JobEntry::for_email(&job, self.max_attempts)
            .map_err(|e| MailcastError::Queue(e.to_string()))?;
        self.queue
            .enqueue(&entry)
            .await
            .map_err(|e| MailcastError::Queue(e.to_string()))?;

        Ok(())
    }

    /// Source HTML for a template: the stored render, or a fresh render
    /// of the design document when no HTML was saved with it
    fn template_html(&self, template: &EmailTemplate) -> String {
        if template.html.is_empty() {
            if let Some(design) = &template.design {
                return render::render(
                    design,
                    &RenderOptions {
                        base_url: Some(self.base_url.clone()),
                    },
                );
            }
        }
        template.html.clone()
    }

    /// Template, project and provider id shared by both send paths
    async fn resolve_send_inputs(
        &self,
        campaign: &Campaign,
    ) -> Result<(EmailTemplate, crate::domain::Project, i64)> {
        let template = self
            .store
            .template(campaign.template_id)
            .await?
            .ok_or_else(|| MailcastError::Validation("campaign template not found".to_string()))?;

        let project = self
            .store
            .project(campaign.project_id)
            .await?
            .ok_or_else(|| MailcastError::NotFound(format!("project {}", campaign.project_id)))?;

        let provider_id = project.provider_id.ok_or_else(|| {
            MailcastError::Validation("project has no mail provider configured".to_string())
        })?;
        if self.store.provider(provider_id).await?.is_none() {
            return Err(MailcastError::Validation(format!(
                "mail provider {provider_id} not found"
            )));
        }

        Ok((template, project, provider_id))
    }

    /// Build the final subject and HTML for one recipient
    fn personalize(
        &self,
        campaign: &Campaign,
        template: &EmailTemplate,
        project: &crate::domain::Project,
        contact: &Contact,
    ) -> (String, String) {
        let token = self.codec.encode(UnsubscribeToken {
            contact_id: contact.id,
            campaign_id: campaign.id,
        });
        let unsubscribe_url = format!("{}/unsubscribe/{token}", self.base_url);

        let ctx = MergeContext {
            contact: Some(MergeContact::from(contact)),
            project_name: Some(project.name.clone()),
            campaign: Some(MergeCampaign {
                id: Some(campaign.id),
                name: campaign.name.clone(),
            }),
            unsubscribe_url: Some(unsubscribe_url.clone()),
            custom: HashMap::new(),
        };

        let subject_template = campaign
            .subject
            .clone()
            .unwrap_or_else(|| template.subject.clone());
        let subject = merge::resolve(&subject_template, &ctx);

        let mut html = merge::resolve(&self.template_html(template), &ctx)
            .replace(merge::UNSUBSCRIBE_PLACEHOLDER, &unsubscribe_url);

        let click_base = click_tracking_base(&self.base_url, campaign.id, &contact.email);
        html = wrap_links_with_tracking(&html, &click_base);
        html.push_str(&open_tracking_pixel(&self.base_url, campaign.id, &contact.email));

        (subject, html)
    }
}
