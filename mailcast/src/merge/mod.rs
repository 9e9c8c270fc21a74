//! Merge-tag resolution
//!
//! Substitutes `{{...}}` placeholders in template text with
//! per-recipient, per-project, and per-campaign data. Resolution is a
//! pure function of text and context; unknown or malformed tags are
//! never errors, they are simply left in place.

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::Contact;

/// Lazy match between `{{` and the next `}}`
static MERGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("merge tag pattern is valid"));

/// Placeholder emitted when no unsubscribe URL is available
pub const UNSUBSCRIBE_PLACEHOLDER: &str = "[[Unsubscribe Link]]";

/// Recipient data visible to merge tags
#[derive(Debug, Clone, Default)]
pub struct MergeContact {
    pub email: String,
    pub name: Option<String>,
    pub meta: HashMap<String, serde_json::Value>,
}

impl From<&Contact> for MergeContact {
    fn from(contact: &Contact) -> Self {
        Self {
            email: contact.email.clone(),
            name: contact.name.clone(),
            meta: contact.meta.clone(),
        }
    }
}

/// Campaign data visible to merge tags
#[derive(Debug, Clone, Default)]
pub struct MergeCampaign {
    pub id: Option<i64>,
    pub name: String,
}

/// Transient per-render substitution context
///
/// Constructed fresh for each recipient; never persisted.
#[derive(Debug, Clone, Default)]
pub struct MergeContext {
    pub contact: Option<MergeContact>,
    pub project_name: Option<String>,
    pub campaign: Option<MergeCampaign>,
    pub unsubscribe_url: Option<String>,
    /// Flat key/value overrides checked before any namespace lookup
    pub custom: HashMap<String, serde_json::Value>,
}

/// Replace every `{{tag}}` in `text` using `ctx`
///
/// Tags that cannot be resolved are echoed back unchanged. Empty input
/// returns unchanged.
#[must_use]
pub fn resolve(text: &str, ctx: &MergeContext) -> String {
    if text.is_empty() {
        return text.to_string();
    }

    MERGE_TAG
        .replace_all(text, |caps: &Captures<'_>| {
            let original = caps[0].to_string();
            let tag = caps[1].trim();
            resolve_tag(tag, ctx).unwrap_or(original)
        })
        .into_owned()
}

fn resolve_tag(tag: &str, ctx: &MergeContext) -> Option<String> {
    if tag == "unsubscribe_url" {
        return Some(
            ctx.unsubscribe_url
                .clone()
                .unwrap_or_else(|| UNSUBSCRIBE_PLACEHOLDER.to_string()),
        );
    }

    // Custom tags win, checked against the raw tag with no dot-splitting.
    if let Some(value) = ctx.custom.get(tag) {
        return stringify(value).map(Cow::into_owned);
    }

    let (namespace, key) = tag.split_once('.')?;

    match namespace {
        "contact" => resolve_contact(key, ctx.contact.as_ref()?),
        "project" => match key {
            "name" => ctx.project_name.clone(),
            _ => None,
        },
        "campaign" => {
            let campaign = ctx.campaign.as_ref()?;
            match key {
                "name" => Some(campaign.name.clone()),
                "id" => campaign.id.map(|id| id.to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

fn resolve_contact(key: &str, contact: &MergeContact) -> Option<String> {
    // Direct fields first, then the metadata map, then name derivations.
    match key {
        "email" => return Some(contact.email.clone()),
        "name" => {
            if let Some(name) = &contact.name {
                return Some(name.clone());
            }
        }
        _ => {}
    }

    if let Some(value) = contact.meta.get(key) {
        if let Some(s) = stringify(value) {
            return Some(s.into_owned());
        }
    }

    let name = contact.name.as_deref()?;
    match key {
        "first_name" => name.split_whitespace().next().map(str::to_string),
        "last_name" => {
            let mut tokens = name.split_whitespace();
            tokens.next()?;
            Some(tokens.collect::<Vec<_>>().join(" "))
        }
        _ => None,
    }
}

/// Stringify a JSON value the way template output expects: bare strings
/// without quotes, everything else in its JSON form. Nulls count as
/// missing.
fn stringify(value: &serde_json::Value) -> Option<Cow<'_, str>> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(Cow::Borrowed(s)),
        other => Some(Cow::Owned(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with_name(name: &str) -> MergeContext {
        MergeContext {
            contact: Some(MergeContact {
                email: "jane@example.com".into(),
                name: Some(name.into()),
                meta: HashMap::new(),
            }),
            ..MergeContext::default()
        }
    }

    #[test]
    fn test_unknown_tags_are_identity() {
        let ctx = MergeContext::default();
        let inputs = [
            "Hello {{contact.first_name}}",
            "{{nonsense}}",
            "{{project.name}} and {{campaign.name}}",
            "{{contact.favorite_color}}",
            "no tags at all",
            "",
        ];
        for input in inputs {
            assert_eq!(resolve(input, &ctx), input);
        }
    }

    #[test]
    fn test_first_and_last_name_derivation() {
        let ctx = ctx_with_name("Jane Doe");
        assert_eq!(resolve("Hi {{contact.first_name}}", &ctx), "Hi Jane");
        assert_eq!(resolve("{{contact.last_name}}", &ctx), "Doe");
    }

    #[test]
    fn test_multi_token_last_name() {
        let ctx = ctx_with_name("Ana Maria da Silva");
        assert_eq!(resolve("{{contact.first_name}}", &ctx), "Ana");
        assert_eq!(resolve("{{contact.last_name}}", &ctx), "Maria da Silva");
    }

    #[test]
    fn test_single_token_name_has_empty_last_name() {
        let ctx = ctx_with_name("Prince");
        assert_eq!(resolve("{{contact.last_name}}", &ctx), "");
        assert_eq!(resolve("{{contact.first_name}}", &ctx), "Prince");
    }

    #[test]
    fn test_contact_direct_fields_and_meta() {
        let mut ctx = ctx_with_name("Jane Doe");
        ctx.contact
            .as_mut()
            .unwrap()
            .meta
            .insert("plan".into(), json!("pro"));
        assert_eq!(resolve("{{contact.email}}", &ctx), "jane@example.com");
        assert_eq!(resolve("{{contact.name}}", &ctx), "Jane Doe");
        assert_eq!(resolve("{{contact.plan}}", &ctx), "pro");
    }

    #[test]
    fn test_meta_wins_over_name_derivation() {
        let mut ctx = ctx_with_name("Jane Doe");
        ctx.contact
            .as_mut()
            .unwrap()
            .meta
            .insert("first_name".into(), json!("Janet"));
        assert_eq!(resolve("{{contact.first_name}}", &ctx), "Janet");
    }

    #[test]
    fn test_custom_tags_are_flat_and_win() {
        let mut ctx = ctx_with_name("Jane Doe");
        ctx.custom.insert("contact.first_name".into(), json!("Override"));
        ctx.custom.insert("order_id".into(), json!(1042));
        assert_eq!(resolve("{{contact.first_name}}", &ctx), "Override");
        assert_eq!(resolve("Order #{{order_id}}", &ctx), "Order #1042");
    }

    #[test]
    fn test_unsubscribe_url() {
        let mut ctx = MergeContext::default();
        assert_eq!(resolve("{{unsubscribe_url}}", &ctx), UNSUBSCRIBE_PLACEHOLDER);
        ctx.unsubscribe_url = Some("https://x.io/unsubscribe/tok".into());
        assert_eq!(
            resolve("{{unsubscribe_url}}", &ctx),
            "https://x.io/unsubscribe/tok"
        );
    }

    #[test]
    fn test_project_and_campaign_namespaces() {
        let ctx = MergeContext {
            project_name: Some("Acme".into()),
            campaign: Some(MergeCampaign {
                id: Some(9),
                name: "Spring Sale".into(),
            }),
            ..MergeContext::default()
        };
        assert_eq!(
            resolve("{{project.name}}: {{campaign.name}} ({{campaign.id}})", &ctx),
            "Acme: Spring Sale (9)"
        );
        assert_eq!(resolve("{{campaign.budget}}", &ctx), "{{campaign.budget}}");
    }

    #[test]
    fn test_whitespace_inside_tag_is_trimmed() {
        let ctx = ctx_with_name("Jane Doe");
        assert_eq!(resolve("{{ contact.first_name }}", &ctx), "Jane");
    }

    #[test]
    fn test_adjacent_tags_are_lazy_matched() {
        let ctx = ctx_with_name("Jane Doe");
        assert_eq!(
            resolve("{{contact.first_name}}{{contact.last_name}}", &ctx),
            "JaneDoe"
        );
    }
}
