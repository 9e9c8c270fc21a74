//! Domain model
//!
//! The entities the campaign pipeline operates on. Serialized names match
//! the wire/database conventions of the HTTP API (camelCase fields,
//! SCREAMING_SNAKE_CASE enums).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::design::EmailDesignDocument;

/// A project groups templates, lists, campaigns and provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    /// Mail provider used for all sends in this project
    pub provider_id: Option<i64>,
}

/// Campaign lifecycle state
///
/// `Sending` means jobs have been enqueued, not that anything was
/// delivered. `Completed` means the fan-out batch was handed to the
/// queue in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Completed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Sending => write!(f, "SENDING"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "SENDING" => Ok(Self::Sending),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

/// How a campaign is initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignKind {
    /// Bulk send to a recipient list
    Standard,
    /// Single-recipient sends via the triggered API
    Triggered,
}

impl std::fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "STANDARD"),
            Self::Triggered => write!(f, "TRIGGERED"),
        }
    }
}

impl std::str::FromStr for CampaignKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(Self::Standard),
            "TRIGGERED" => Ok(Self::Triggered),
            other => Err(format!("unknown campaign kind: {other}")),
        }
    }
}

/// An email campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    pub project_id: i64,
    pub template_id: i64,
    /// Recipient list; `None` for triggered campaigns
    pub list_id: Option<i64>,
    pub kind: CampaignKind,
    pub name: String,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub subject: Option<String>,
    pub status: CampaignStatus,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Sender address in `Name <addr>` form when a display name is set
    #[must_use]
    pub fn from_address(&self, fallback: &str) -> String {
        let email = self.from_email.as_deref().unwrap_or(fallback);
        match &self.from_name {
            Some(name) => format!("{name} <{email}>"),
            None => email.to_string(),
        }
    }
}

/// A stored email template: the editable design plus its rendered HTML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub subject: String,
    /// Rendered HTML, regenerated whenever the design is saved
    pub html: String,
    /// Structured design document; absent for templates imported as raw HTML
    pub design: Option<EmailDesignDocument>,
}

/// A named set of contacts a standard campaign sends to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientList {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub project_id: i64,
    pub email: String,
    pub name: Option<String>,
    /// Arbitrary per-contact metadata, addressable from merge tags
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>,
    /// Globally unsubscribed contacts never receive campaign sends
    #[serde(default)]
    pub unsubscribed: bool,
}

/// Contact payload accepted by the audience API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>,
}

/// Mail provider backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// SMTP relay
    Smtp,
    /// Transactional HTTP API
    Api,
    /// Log-only backend for development
    Console,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smtp => write!(f, "smtp"),
            Self::Api => write!(f, "api"),
            Self::Console => write!(f, "console"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smtp" => Ok(Self::Smtp),
            "api" => Ok(Self::Api),
            "console" => Ok(Self::Console),
            other => Err(format!("unknown provider kind: {other}")),
        }
    }
}

/// A configured mail provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailProvider {
    pub id: i64,
    pub name: String,
    pub kind: ProviderKind,
    /// Backend-specific settings (SMTP host/credentials, API endpoint/key)
    pub config: serde_json::Value,
}

/// Delivery event kinds recorded against a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Sent,
    Delivered,
    Failed,
    Unsubscribe,
    Opened,
    Clicked,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => write!(f, "SENT"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Unsubscribe => write!(f, "UNSUBSCRIBE"),
            Self::Opened => write!(f, "OPENED"),
            Self::Clicked => write!(f, "CLICKED"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SENT" => Ok(Self::Sent),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "OPENED" => Ok(Self::Opened),
            "CLICKED" => Ok(Self::Clicked),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// Append-only delivery event log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignEvent {
    pub id: i64,
    pub campaign_id: i64,
    /// 0 sentinel for sends without a tracked contact
    pub contact_id: i64,
    pub email: String,
    pub event_type: EventType,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Event payload before the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub campaign_id: i64,
    pub contact_id: i64,
    pub email: String,
    pub event_type: EventType,
    pub metadata: serde_json::Value,
}

/// Outcome recorded for a triggered API send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggeredSendStatus {
    Success,
    Failure,
}

impl std::fmt::Display for TriggeredSendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

impl std::str::FromStr for TriggeredSendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            other => Err(format!("unknown triggered send status: {other}")),
        }
    }
}

/// Lightweight log of triggered API sends, separate from the event log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredSendLog {
    pub id: i64,
    pub campaign_id: i64,
    pub email: String,
    pub status: TriggeredSendStatus,
    pub error: Option<String>,
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A project-scoped API key for the public endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: i64,
    pub project_id: i64,
    pub key: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_address_with_display_name() {
        let campaign = Campaign {
            id: 1,
            project_id: 1,
            template_id: 1,
            list_id: None,
            kind: CampaignKind::Triggered,
            name: "Welcome".into(),
            from_name: Some("Acme".into()),
            from_email: Some("no-reply@acme.io".into()),
            subject: None,
            status: CampaignStatus::Draft,
            sent_at: None,
        };
        assert_eq!(
            campaign.from_address("hello@mailcast.local"),
            "Acme <no-reply@acme.io>"
        );
    }

    #[test]
    fn test_from_address_fallback() {
        let campaign = Campaign {
            id: 1,
            project_id: 1,
            template_id: 1,
            list_id: Some(2),
            kind: CampaignKind::Standard,
            name: "Launch".into(),
            from_name: None,
            from_email: None,
            subject: None,
            status: CampaignStatus::Draft,
            sent_at: None,
        };
        assert_eq!(
            campaign.from_address("hello@mailcast.local"),
            "hello@mailcast.local"
        );
    }

    #[test]
    fn test_status_serializes_screaming() {
        let json = serde_json::to_string(&CampaignStatus::Sending).unwrap();
        assert_eq!(json, "\"SENDING\"");
        let json = serde_json::to_string(&EventType::Unsubscribe).unwrap();
        assert_eq!(json, "\"UNSUBSCRIBE\"");
    }
}
