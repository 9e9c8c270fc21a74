//! HTTP surface tests over the in-memory backends.

use std::collections::HashMap;
use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;

use mailcast::config::MailcastConfig;
use mailcast::domain::{
    Campaign, CampaignKind, CampaignStatus, Contact, EmailProvider, EmailTemplate, EventType,
    ProviderKind,
};
use mailcast::handlers;
use mailcast::jobs::{JobQueue, MemoryQueue};
use mailcast::state::AppState;
use mailcast::store::{MemoryStore, Store};
use mailcast::unsubscribe::UnsubscribeToken;

const API_KEY: &str = "test-key-1234";

struct TestApp {
    server: TestServer,
    store: MemoryStore,
    queue: Arc<MemoryQueue>,
    state: AppState,
    project_id: i64,
}

fn app() -> TestApp {
    let store = MemoryStore::new();
    let queue = Arc::new(MemoryQueue::new());
    let provider = store.seed_provider(EmailProvider {
        id: 0,
        name: "dev".into(),
        kind: ProviderKind::Console,
        config: json!({}),
    });
    let project = store.seed_project("Acme", Some(provider.id));
    store.seed_api_key(project.id, API_KEY);

    let state = AppState::new(
        MailcastConfig::default(),
        Arc::new(store.clone()),
        Arc::clone(&queue) as Arc<dyn JobQueue>,
    );
    let server = TestServer::new(handlers::router(state.clone())).unwrap();

    TestApp {
        server,
        store,
        queue,
        state,
        project_id: project.id,
    }
}

fn seed_triggered_campaign(app: &TestApp) -> Campaign {
    let template = app.store.seed_template(EmailTemplate {
        id: 0,
        project_id: app.project_id,
        name: "receipt".into(),
        subject: "Receipt {{order_id}}".into(),
        html: "<p>Thanks, {{contact.email}}</p>".into(),
        design: None,
    });
    app.store.seed_campaign(Campaign {
        id: 0,
        project_id: app.project_id,
        template_id: template.id,
        list_id: None,
        kind: CampaignKind::Triggered,
        name: "Receipts".into(),
        from_name: None,
        from_email: Some("billing@acme.io".into()),
        subject: None,
        status: CampaignStatus::Draft,
        sent_at: None,
    })
}

#[tokio::test]
async fn test_api_requires_bearer_key() {
    let app = app();

    let res = app.server.get("/api/v1/audience/lists").await;
    res.assert_status_unauthorized();

    let res = app
        .server
        .get("/api/v1/audience/lists")
        .authorization_bearer("wrong-key")
        .await;
    res.assert_status_unauthorized();
}

#[tokio::test]
async fn test_list_lifecycle() {
    let app = app();

    // create
    let res = app
        .server
        .post("/api/v1/audience/lists")
        .authorization_bearer(API_KEY)
        .json(&json!({ "name": "Newsletter", "description": "weekly" }))
        .await;
    res.assert_status_ok();
    let created: serde_json::Value = res.json();
    let list_id = created["id"].as_i64().unwrap();

    // add contacts
    let res = app
        .server
        .post(&format!("/api/v1/audience/lists/{list_id}/contacts"))
        .authorization_bearer(API_KEY)
        .json(&json!({
            "contacts": [
                { "email": "Ana@Example.com", "name": "Ana" },
                { "email": "bo@example.com" }
            ]
        }))
        .await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["added"], 2);

    // visible with count
    let res = app
        .server
        .get("/api/v1/audience/lists")
        .authorization_bearer(API_KEY)
        .await;
    res.assert_status_ok();
    let lists: serde_json::Value = res.json();
    assert_eq!(lists[0]["contactCount"], 2);

    // remove one known, one unknown
    let res = app
        .server
        .delete(&format!("/api/v1/audience/lists/{list_id}/contacts"))
        .authorization_bearer(API_KEY)
        .json(&json!({ "emails": ["ana@example.com", "ghost@example.com"] }))
        .await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["removed"], 1);
    assert_eq!(body["missingEmails"], json!(["ghost@example.com"]));

    // delete the list
    let res = app
        .server
        .delete(&format!("/api/v1/audience/lists/{list_id}"))
        .authorization_bearer(API_KEY)
        .await;
    res.assert_status_ok();

    let res = app
        .server
        .get("/api/v1/audience/lists")
        .authorization_bearer(API_KEY)
        .await;
    let lists: serde_json::Value = res.json();
    assert_eq!(lists, json!([]));
}

#[tokio::test]
async fn test_invalid_contact_email_rejected() {
    let app = app();
    let res = app
        .server
        .post("/api/v1/audience/lists")
        .authorization_bearer(API_KEY)
        .json(&json!({ "name": "L" }))
        .await;
    let list_id = res.json::<serde_json::Value>()["id"].as_i64().unwrap();

    let res = app
        .server
        .post(&format!("/api/v1/audience/lists/{list_id}/contacts"))
        .authorization_bearer(API_KEY)
        .json(&json!({ "contacts": [{ "email": "not-an-email" }] }))
        .await;
    res.assert_status_bad_request();
}

#[tokio::test]
async fn test_foreign_project_list_is_invisible() {
    let app = app();
    let other_project = app.store.seed_project("Rival", None);
    let other_list = app.store.seed_list(other_project.id, "theirs");

    let res = app
        .server
        .delete(&format!("/api/v1/audience/lists/{}", other_list.id))
        .authorization_bearer(API_KEY)
        .await;
    res.assert_status_not_found();
}

#[tokio::test]
async fn test_triggered_send_enqueues_job() {
    let app = app();
    let campaign = seed_triggered_campaign(&app);

    let res = app
        .server
        .post("/api/triggered")
        .authorization_bearer(API_KEY)
        .json(&json!({
            "campaignId": campaign.id,
            "email": "buyer@example.com",
            "data": { "order_id": "A-77" }
        }))
        .await;
    res.assert_status_ok();

    let entries = app.queue.snapshot().await;
    assert_eq!(entries.len(), 1);
    let job: mailcast::jobs::EmailJob =
        serde_json::from_value(entries[0].payload.clone()).unwrap();
    assert_eq!(job.contact_id, 0);
    assert_eq!(job.subject, "Receipt A-77");
    assert!(job.html.contains("Thanks, buyer@example.com"));
}

#[tokio::test]
async fn test_triggered_rejects_bad_email() {
    let app = app();
    let campaign = seed_triggered_campaign(&app);

    let res = app
        .server
        .post("/api/triggered")
        .authorization_bearer(API_KEY)
        .json(&json!({ "campaignId": campaign.id, "email": "nope" }))
        .await;
    res.assert_status_bad_request();
    assert!(app.queue.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_unsubscribe_flow_is_idempotent() {
    let app = app();
    let list = app.store.seed_list(app.project_id, "subscribers");
    let contact = app.store.seed_contact(
        list.id,
        Contact {
            id: 0,
            project_id: app.project_id,
            email: "ana@example.com".into(),
            name: None,
            meta: HashMap::new(),
            unsubscribed: false,
        },
    );

    let token = app.state.codec.encode(UnsubscribeToken {
        contact_id: contact.id,
        campaign_id: 31,
    });

    let res = app.server.get(&format!("/unsubscribe/{token}")).await;
    res.assert_status_ok();
    assert!(res.text().contains("Unsubscribed"));

    let stored = app.store.contact(contact.id).await.unwrap().unwrap();
    assert!(stored.unsubscribed);
    let events = app.store.events_for_campaign(31).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Unsubscribe);

    // second visit: still a success page, no duplicate event
    let res = app.server.get(&format!("/unsubscribe/{token}")).await;
    res.assert_status_ok();
    assert!(res.text().contains("Already unsubscribed"));
    assert_eq!(app.store.events_for_campaign(31).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unsubscribe_rejects_tampered_token() {
    let app = app();
    let res = app.server.get("/unsubscribe/bm90LXJlYWw.c2ln").await;
    res.assert_status_bad_request();
    assert!(res.text().contains("Invalid link"));
}

#[tokio::test]
async fn test_open_pixel_serves_gif_and_records_event() {
    let app = app();

    let res = app
        .server
        .get("/api/track/open/12/ana%40example.com")
        .await;
    res.assert_status_ok();
    assert_eq!(res.header("content-type"), "image/gif");
    assert_eq!(res.as_bytes()[0..3], *b"GIF");

    let events = app.store.events_for_campaign(12).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Opened);
    assert_eq!(events[0].email, "ana@example.com");
}

#[tokio::test]
async fn test_click_redirects_and_records_event() {
    let app = app();

    let res = app
        .server
        .get("/api/track/click/12/ana%40example.com")
        .add_query_param("url", "https://acme.io/blog")
        .await;
    res.assert_status(axum::http::StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.header("location"), "https://acme.io/blog");

    let events = app.store.events_for_campaign(12).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Clicked);
    assert_eq!(events[0].metadata["url"], "https://acme.io/blog");
}

#[tokio::test]
async fn test_tracking_campaign_zero_records_nothing() {
    let app = app();

    let res = app.server.get("/api/track/open/0/ana%40example.com").await;
    res.assert_status_ok();
    assert!(app.store.events_for_campaign(0).await.unwrap().is_empty());
}
