//! Audience management API
//!
//! CRUD for recipient lists and list membership, scoped to the
//! authenticated key's project. Contacts are upserted by lowercase
//! email, so re-importing the same address updates instead of
//! duplicating.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::domain::{NewContact, RecipientList};
use crate::error::{MailcastError, Result};
use crate::state::AppState;

use super::auth::AuthenticatedKey;
use super::Ack;

/// List plus its membership count
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub contact_count: u64,
}

/// Body for `POST /api/v1/audience/lists`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// Body for `POST /api/v1/audience/lists/{id}/contacts`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactsRequest {
    pub contacts: Vec<NewContact>,
}

/// Body for `DELETE /api/v1/audience/lists/{id}/contacts`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveContactsRequest {
    pub emails: Vec<String>,
}

/// Response for membership additions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactsResponse {
    pub added: usize,
}

/// Response for membership removals
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveContactsResponse {
    pub removed: usize,
    /// Requested addresses with no matching contact in the project
    pub missing_emails: Vec<String>,
}

/// Fetch a list and verify it belongs to the key's project
async fn scoped_list(state: &AppState, key: &AuthenticatedKey, list_id: i64) -> Result<RecipientList> {
    let list = state
        .store
        .list(list_id)
        .await?
        .ok_or_else(|| MailcastError::NotFound(format!("list {list_id}")))?;
    if list.project_id != key.project_id() {
        return Err(MailcastError::NotFound(format!("list {list_id}")));
    }
    Ok(list)
}

pub async fn list_lists(
    State(state): State<AppState>,
    key: AuthenticatedKey,
) -> Result<Json<Vec<ListSummary>>> {
    let lists = state.store.lists_for_project(key.project_id()).await?;
    let mut out = Vec::with_capacity(lists.len());
    for list in lists {
        let contact_count = state.store.contact_count(list.id).await?;
        out.push(ListSummary {
            id: list.id,
            name: list.name,
            description: list.description,
            contact_count,
        });
    }
    Ok(Json(out))
}

pub async fn create_list(
    State(state): State<AppState>,
    key: AuthenticatedKey,
    Json(req): Json<CreateListRequest>,
) -> Result<Json<RecipientList>> {
    req.validate()
        .map_err(|e| MailcastError::Validation(e.to_string()))?;

    let list = state
        .store
        .create_list(key.project_id(), req.name, req.description)
        .await?;

    tracing::info!(list_id = list.id, project_id = list.project_id, "list created");
    Ok(Json(list))
}

pub async fn delete_list(
    State(state): State<AppState>,
    key: AuthenticatedKey,
    Path(list_id): Path<i64>,
) -> Result<Json<Ack>> {
    let list = scoped_list(&state, &key, list_id).await?;
    state.store.delete_list(list.id).await?;
    tracing::info!(list_id, "list deleted");
    Ok(Json(Ack { success: true }))
}

pub async fn add_contacts(
    State(state): State<AppState>,
    key: AuthenticatedKey,
    Path(list_id): Path<i64>,
    Json(req): Json<AddContactsRequest>,
) -> Result<Json<AddContactsResponse>> {
    if req.contacts.is_empty() {
        return Err(MailcastError::Validation(
            "contacts must not be empty".to_string(),
        ));
    }
    for contact in &req.contacts {
        if !contact.email.validate_email() {
            return Err(MailcastError::Validation(format!(
                "invalid email address: {}",
                contact.email
            )));
        }
    }

    let list = scoped_list(&state, &key, list_id).await?;
    let stored = state
        .store
        .upsert_contacts(key.project_id(), req.contacts)
        .await?;
    let ids: Vec<i64> = stored.iter().map(|c| c.id).collect();
    state.store.add_contacts_to_list(list.id, &ids).await?;

    tracing::info!(list_id, added = ids.len(), "contacts added to list");
    Ok(Json(AddContactsResponse { added: ids.len() }))
}

pub async fn remove_contacts(
    State(state): State<AppState>,
    key: AuthenticatedKey,
    Path(list_id): Path<i64>,
    Json(req): Json<RemoveContactsRequest>,
) -> Result<Json<RemoveContactsResponse>> {
    if req.emails.is_empty() {
        return Err(MailcastError::Validation(
            "emails must not be empty".to_string(),
        ));
    }

    let list = scoped_list(&state, &key, list_id).await?;
    let found = state
        .store
        .contacts_by_emails(key.project_id(), &req.emails)
        .await?;

    let found_emails: std::collections::HashSet<String> =
        found.iter().map(|c| c.email.to_lowercase()).collect();
    let missing_emails: Vec<String> = req
        .emails
        .iter()
        .filter(|e| !found_emails.contains(&e.to_lowercase()))
        .cloned()
        .collect();

    let ids: Vec<i64> = found.iter().map(|c| c.id).collect();
    state.store.remove_contacts_from_list(list.id, &ids).await?;

    tracing::info!(list_id, removed = ids.len(), "contacts removed from list");
    Ok(Json(RemoveContactsResponse {
        removed: ids.len(),
        missing_emails,
    }))
}
