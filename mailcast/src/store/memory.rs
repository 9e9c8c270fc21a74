//! In-memory store for development and tests
//!
//! Everything lives in a `parking_lot` mutexed interior; cloning the
//! store shares the same data. Not durable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    ApiKey, Campaign, CampaignEvent, CampaignKind, CampaignStatus, Contact, EmailProvider,
    EmailTemplate,
    EventRecord, NewContact, Project, RecipientList, TriggeredSendLog, TriggeredSendStatus,
};
use crate::error::Result;

use super::Store;

#[derive(Default)]
struct Inner {
    next_id: i64,
    projects: HashMap<i64, Project>,
    providers: HashMap<i64, EmailProvider>,
    templates: HashMap<i64, EmailTemplate>,
    campaigns: HashMap<i64, Campaign>,
    lists: HashMap<i64, RecipientList>,
    contacts: HashMap<i64, Contact>,
    /// list id -> contact ids, insertion-ordered
    memberships: HashMap<i64, Vec<i64>>,
    events: Vec<CampaignEvent>,
    triggered_logs: Vec<TriggeredSendLog>,
    api_keys: Vec<ApiKey>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory [`Store`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers used by tests and the development server. These are
    // not part of the Store port; campaign/template/provider creation
    // belongs to the management UI, which is out of scope here.

    pub fn seed_project(&self, name: &str, provider_id: Option<i64>) -> Project {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let project = Project {
            id,
            name: name.to_string(),
            provider_id,
        };
        inner.projects.insert(id, project.clone());
        project
    }

    pub fn seed_provider(&self, provider: EmailProvider) -> EmailProvider {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let provider = EmailProvider { id, ..provider };
        inner.providers.insert(id, provider.clone());
        provider
    }

    pub fn seed_template(&self, template: EmailTemplate) -> EmailTemplate {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let template = EmailTemplate { id, ..template };
        inner.templates.insert(id, template.clone());
        template
    }

    pub fn seed_campaign(&self, campaign: Campaign) -> Campaign {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let campaign = Campaign { id, ..campaign };
        inner.campaigns.insert(id, campaign.clone());
        campaign
    }

    pub fn seed_list(&self, project_id: i64, name: &str) -> RecipientList {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let list = RecipientList {
            id,
            project_id,
            name: name.to_string(),
            description: None,
        };
        inner.lists.insert(id, list.clone());
        inner.memberships.entry(id).or_default();
        list
    }

    pub fn seed_contact(&self, list_id: i64, contact: Contact) -> Contact {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let contact = Contact { id, ..contact };
        inner.contacts.insert(id, contact.clone());
        inner.memberships.entry(list_id).or_default().push(id);
        contact
    }

    pub fn seed_api_key(&self, project_id: i64, key: &str) -> ApiKey {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let api_key = ApiKey {
            id,
            project_id,
            key: key.to_string(),
            name: "test".to_string(),
        };
        inner.api_keys.push(api_key.clone());
        api_key
    }

    /// Triggered-send log entries, newest last (test observability)
    #[must_use]
    pub fn triggered_logs(&self) -> Vec<TriggeredSendLog> {
        self.inner.read().triggered_logs.clone()
    }

    /// Rewrite a seeded campaign's kind
    pub fn set_campaign_kind(&self, campaign_id: i64, kind: CampaignKind) {
        let mut inner = self.inner.write();
        if let Some(campaign) = inner.campaigns.get_mut(&campaign_id) {
            campaign.kind = kind;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.inner.read().projects.get(&id).cloned())
    }

    async fn provider(&self, id: i64) -> Result<Option<EmailProvider>> {
        Ok(self.inner.read().providers.get(&id).cloned())
    }

    async fn template(&self, id: i64) -> Result<Option<EmailTemplate>> {
        Ok(self.inner.read().templates.get(&id).cloned())
    }

    async fn campaign(&self, id: i64) -> Result<Option<Campaign>> {
        Ok(self.inner.read().campaigns.get(&id).cloned())
    }

    async fn set_campaign_status(
        &self,
        id: i64,
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(campaign) = inner.campaigns.get_mut(&id) {
            campaign.status = status;
            if sent_at.is_some() {
                campaign.sent_at = sent_at;
            }
        }
        Ok(())
    }

    async fn log_event(&self, event: EventRecord) -> Result<()> {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        inner.events.push(CampaignEvent {
            id,
            campaign_id: event.campaign_id,
            contact_id: event.contact_id,
            email: event.email,
            event_type: event.event_type,
            metadata: event.metadata,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn events_for_campaign(&self, campaign_id: i64) -> Result<Vec<CampaignEvent>> {
        Ok(self
            .inner
            .read()
            .events
            .iter()
            .filter(|e| e.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn list(&self, id: i64) -> Result<Option<RecipientList>> {
        Ok(self.inner.read().lists.get(&id).cloned())
    }

    async fn lists_for_project(&self, project_id: i64) -> Result<Vec<RecipientList>> {
        let mut lists: Vec<_> = self
            .inner
            .read()
            .lists
            .values()
            .filter(|l| l.project_id == project_id)
            .cloned()
            .collect();
        lists.sort_by_key(|l| l.id);
        Ok(lists)
    }

    async fn create_list(
        &self,
        project_id: i64,
        name: String,
        description: Option<String>,
    ) -> Result<RecipientList> {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let list = RecipientList {
            id,
            project_id,
            name,
            description,
        };
        inner.lists.insert(id, list.clone());
        inner.memberships.entry(id).or_default();
        Ok(list)
    }

    async fn delete_list(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        inner.lists.remove(&id);
        inner.memberships.remove(&id);
        Ok(())
    }

    async fn add_contacts_to_list(&self, list_id: i64, contact_ids: &[i64]) -> Result<()> {
        let mut inner = self.inner.write();
        let members = inner.memberships.entry(list_id).or_default();
        for id in contact_ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        Ok(())
    }

    async fn remove_contacts_from_list(&self, list_id: i64, contact_ids: &[i64]) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(members) = inner.memberships.get_mut(&list_id) {
            members.retain(|id| !contact_ids.contains(id));
        }
        Ok(())
    }

    async fn contacts_for_list(&self, list_id: i64, active_only: bool) -> Result<Vec<Contact>> {
        let inner = self.inner.read();
        let members = inner.memberships.get(&list_id);
        Ok(members
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.contacts.get(id))
                    .filter(|c| !active_only || !c.unsubscribed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn contact_count(&self, list_id: i64) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .memberships
            .get(&list_id)
            .map_or(0, |m| m.len() as u64))
    }

    async fn contact(&self, id: i64) -> Result<Option<Contact>> {
        Ok(self.inner.read().contacts.get(&id).cloned())
    }

    async fn upsert_contacts(
        &self,
        project_id: i64,
        contacts: Vec<NewContact>,
    ) -> Result<Vec<Contact>> {
        let mut inner = self.inner.write();
        let mut result = Vec::with_capacity(contacts.len());

        for new in contacts {
            let email = new.email.to_lowercase();
            let existing_id = inner
                .contacts
                .values()
                .find(|c| c.project_id == project_id && c.email.to_lowercase() == email)
                .map(|c| c.id);

            let contact = match existing_id {
                Some(id) => {
                    let contact = inner
                        .contacts
                        .get_mut(&id)
                        .unwrap_or_else(|| unreachable!("id came from the map"));
                    if new.name.is_some() {
                        contact.name = new.name;
                    }
                    contact.meta.extend(new.meta);
                    contact.clone()
                }
                None => {
                    let id = inner.next_id();
                    let contact = Contact {
                        id,
                        project_id,
                        email,
                        name: new.name,
                        meta: new.meta,
                        unsubscribed: false,
                    };
                    inner.contacts.insert(id, contact.clone());
                    contact
                }
            };
            result.push(contact);
        }

        Ok(result)
    }

    async fn contacts_by_emails(&self, project_id: i64, emails: &[String]) -> Result<Vec<Contact>> {
        let wanted: Vec<String> = emails.iter().map(|e| e.to_lowercase()).collect();
        Ok(self
            .inner
            .read()
            .contacts
            .values()
            .filter(|c| c.project_id == project_id && wanted.contains(&c.email.to_lowercase()))
            .cloned()
            .collect())
    }

    async fn mark_unsubscribed(&self, contact_id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(contact) = inner.contacts.get_mut(&contact_id) {
            contact.unsubscribed = true;
        }
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
        let mut inner = self.inner.write();
        let id = inner.next_id();
        inner.triggered_logs.push(TriggeredSendLog {
            id,
            campaign_id,
            email: email.to_string(),
            status,
            error,
            data,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        Ok(self
            .inner
            .read()
            .api_keys
            .iter()
            .find(|k| k.key == key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventType;
    use std::collections::HashMap;

    fn contact(email: &str, unsubscribed: bool) -> Contact {
        Contact {
            id: 0,
            project_id: 1,
            email: email.to_string(),
            name: None,
            meta: HashMap::new(),
            unsubscribed,
        }
    }

    #[tokio::test]
    async fn test_active_filter_excludes_unsubscribed() {
        let store = MemoryStore::new();
        let project = store.seed_project("p", None);
        let list = store.seed_list(project.id, "subscribers");
        store.seed_contact(list.id, contact("a@x.io", false));
        store.seed_contact(list.id, contact("b@x.io", true));

        let active = store.contacts_for_list(list.id, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "a@x.io");

        let all = store.contacts_for_list(list.id, false).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_on_lowercase_email() {
        let store = MemoryStore::new();
        let project = store.seed_project("p", None);

        let first = store
            .upsert_contacts(
                project.id,
                vec![NewContact {
                    email: "Jane@Example.com".into(),
                    name: Some("Jane".into()),
                    meta: HashMap::new(),
                }],
            )
            .await
            .unwrap();

        let second = store
            .upsert_contacts(
                project.id,
                vec![NewContact {
                    email: "jane@example.com".into(),
                    name: Some("Jane Doe".into()),
                    meta: HashMap::new(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_event_log_is_append_only() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            store
                .log_event(EventRecord {
                    campaign_id: 7,
                    contact_id: 1,
                    email: "a@x.io".into(),
                    event_type: EventType::Unsubscribe,
                    metadata: serde_json::Value::Null,
                })
                .await
                .unwrap();
        }
        // Duplicate UNSUBSCRIBE events are tolerated, not deduplicated.
        let events = store.events_for_campaign(7).await.unwrap();
        assert_eq!(events.len(), 2);
    }
}
