//! End-to-end webhook deliveries through the Axum router

use std::sync::{Arc, Mutex};

use axum::{Router, middleware::from_fn};
use serde_json::json;
use vortex_axum::testing;
use vortex_axum::webhooks::{
    RAW_BODY_LIMIT, VortexWebhooks, WebhookError, WebhookEvent, WebhookEventKind, capture_raw_body,
    error_hook_fn, handler_fn, sign, webhook_router,
};

const SECRET: &str = "whsec_integration_secret";
const PATH: &str = "/webhooks/vortex";
const ACCEPTED: &str = r#"{"id":"evt_123","type":"invitation.accepted","timestamp":"2025-01-15T10:30:00Z","accountId":"acc_1","environmentId":null,"sourceTable":"invitations","operation":"update","data":{"invitationId":"inv_9"}}"#;

#[derive(Default, Clone)]
struct Recorded {
    calls: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<WebhookEvent>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

/// Generic handler, a handler for `invitation.accepted`, and an error hook,
/// all writing into `recorded`.
fn app(recorded: &Recorded, fail_specific: bool) -> Router {
    let generic = recorded.clone();
    let specific = recorded.clone();
    let hook = recorded.clone();

    let webhooks = VortexWebhooks::builder(SECRET)
        .on_event(handler_fn(move |event: WebhookEvent| {
            let recorded = generic.clone();
            async move {
                recorded.calls.lock().unwrap().push(format!("generic:{}", event.id));
                Ok(())
            }
        }))
        .on(
            WebhookEventKind::InvitationAccepted,
            handler_fn(move |event: WebhookEvent| {
                let recorded = specific.clone();
                async move {
                    recorded.calls.lock().unwrap().push(format!("specific:{}", event.id));
                    recorded.events.lock().unwrap().push(event);
                    if fail_specific {
                        anyhow::bail!("downstream unavailable");
                    }
                    Ok(())
                }
            }),
        )
        .on_error(error_hook_fn(move |error: &WebhookError| {
            hook.errors.lock().unwrap().push(error.public_message());
        }))
        .build();

    webhook_router(PATH, webhooks)
}

#[tokio::test]
async fn missing_signature_is_unauthorized() {
    let recorded = Recorded::default();

    testing::webhook(app(&recorded, false), PATH)
        .bytes_body(ACCEPTED)
        .execute()
        .await
        .assert_unauthorized()
        .assert_error("Missing X-Vortex-Signature header")
        .await;

    assert!(recorded.calls().is_empty());
    assert!(recorded.errors().is_empty());
}

#[tokio::test]
async fn two_signature_values_are_rejected() {
    let recorded = Recorded::default();
    let signature = sign(ACCEPTED.as_bytes(), SECRET.as_bytes());

    testing::webhook(app(&recorded, false), PATH)
        .bytes_body(ACCEPTED)
        .signature(&signature)
        .signature(&signature)
        .execute()
        .await
        .assert_bad_request()
        .assert_error("Multiple X-Vortex-Signature headers are not allowed")
        .await;

    assert!(recorded.calls().is_empty());
}

#[tokio::test]
async fn valid_delivery_reaches_handlers_once() {
    let recorded = Recorded::default();

    testing::webhook(app(&recorded, false), PATH)
        .signed_body(SECRET, ACCEPTED)
        .execute()
        .await
        .assert_ok()
        .assert_json_path("received", json!(true))
        .await;

    assert_eq!(recorded.calls(), vec!["generic:evt_123", "specific:evt_123"]);

    let events = recorded.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), WebhookEventKind::InvitationAccepted);
    assert_eq!(events[0].account_id.as_deref(), Some("acc_1"));
    assert!(events[0].environment_id.is_none());
    assert_eq!(events[0].data["invitationId"], "inv_9");
    assert!(recorded.errors().is_empty());
}

#[tokio::test]
async fn signature_over_other_bytes_is_rejected() {
    let recorded = Recorded::default();
    let signature = sign(br#"{"id":"evt_123","type":"invitation.revoked"}"#, SECRET.as_bytes());

    testing::webhook(app(&recorded, false), PATH)
        .bytes_body(ACCEPTED)
        .signature(&signature)
        .execute()
        .await
        .assert_unauthorized()
        .assert_error("Invalid signature")
        .await;

    assert!(recorded.calls().is_empty());
    assert_eq!(recorded.errors(), vec!["Invalid signature"]);
}

#[tokio::test]
async fn whitespace_changes_break_the_signature() {
    let recorded = Recorded::default();
    let compact = r#"{"id":"evt_1","type":"invitation.created"}"#;
    let spaced = r#"{ "id": "evt_1", "type": "invitation.created" }"#;

    testing::webhook(app(&recorded, false), PATH)
        .bytes_body(spaced)
        .signature(&sign(compact.as_bytes(), SECRET.as_bytes()))
        .execute()
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged() {
    let recorded = Recorded::default();

    testing::webhook(app(&recorded, false), PATH)
        .signed_body(SECRET, r#"{"id":"evt_7","type":"member.joined","data":{}}"#)
        .execute()
        .await
        .assert_ok();

    assert_eq!(recorded.calls(), vec!["generic:evt_7"]);
    assert!(recorded.errors().is_empty());
}

#[tokio::test]
async fn handler_failure_is_isolated() {
    let recorded = Recorded::default();

    testing::webhook(app(&recorded, true), PATH)
        .signed_body(SECRET, ACCEPTED)
        .execute()
        .await
        .assert_server_error()
        .assert_error("Webhook handler error")
        .await;

    assert_eq!(recorded.calls(), vec!["generic:evt_123", "specific:evt_123"]);
    assert_eq!(recorded.errors(), vec!["Webhook handler error"]);
}

#[tokio::test]
async fn verified_garbage_is_a_bad_request() {
    let recorded = Recorded::default();

    testing::webhook(app(&recorded, false), PATH)
        .signed_body(SECRET, "definitely not json")
        .execute()
        .await
        .assert_bad_request()
        .assert_error("Invalid webhook payload")
        .await;

    assert!(recorded.calls().is_empty());
    assert_eq!(recorded.errors(), vec!["Invalid webhook payload"]);
}

#[tokio::test]
async fn captured_body_verifies_behind_capture_layer() {
    let recorded = Recorded::default();
    let app = app(&recorded, false).layer(from_fn(capture_raw_body));

    testing::webhook(app, PATH)
        .signed_body(SECRET, ACCEPTED)
        .execute()
        .await
        .assert_ok();

    assert_eq!(recorded.calls().len(), 2);
}

#[tokio::test]
async fn oversized_unsigned_body_behind_capture_layer_is_missing_header() {
    let recorded = Recorded::default();
    let app = app(&recorded, false).layer(from_fn(capture_raw_body));

    let body: serde_json::Value = testing::post(app, PATH)
        .bytes_body(vec![b'x'; RAW_BODY_LIMIT + 1024])
        .execute()
        .await
        .assert_unauthorized()
        .json()
        .await;

    assert_eq!(body, json!({"error": "Missing X-Vortex-Signature header"}));

    assert!(recorded.calls().is_empty());
    assert!(recorded.errors().is_empty());
}

#[tokio::test]
async fn oversized_signed_body_is_too_large() {
    let recorded = Recorded::default();
    let payload = "x".repeat(RAW_BODY_LIMIT + 1024);

    for app in [
        app(&recorded, false),
        app(&recorded, false).layer(from_fn(capture_raw_body)),
    ] {
        testing::webhook(app, PATH)
            .signed_body(SECRET, &payload)
            .execute()
            .await
            .assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
            .assert_error("Webhook payload too large")
            .await;
    }

    assert!(recorded.calls().is_empty());
    assert!(recorded.errors().is_empty());
}

#[tokio::test]
async fn concurrent_deliveries_are_independent() {
    let recorded = Recorded::default();
    let app = app(&recorded, false);

    let deliveries = (0..8).map(|i| {
        let app = app.clone();
        async move {
            let payload = format!(r#"{{"id":"evt_{i}","type":"invitation.created"}}"#);
            testing::webhook(app, PATH)
                .signed_body(SECRET, &payload)
                .execute()
                .await
                .status()
        }
    });

    let mut handles = Vec::new();
    for delivery in deliveries {
        handles.push(tokio::spawn(delivery));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    assert_eq!(recorded.calls().len(), 8);
}

#[tokio::test]
async fn failing_generic_handler_runs_before_the_hook() {
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let handler_log = log.clone();
    let specific_log = log.clone();
    let hook_log = log.clone();

    let webhooks = VortexWebhooks::builder(SECRET)
        .on_event(handler_fn(move |_event: WebhookEvent| {
            let log = handler_log.clone();
            async move {
                log.lock().unwrap().push("generic");
                Err::<(), _>(anyhow::anyhow!("generic handler failed"))
            }
        }))
        .on(
            "invitation.accepted",
            handler_fn(move |_event: WebhookEvent| {
                let log = specific_log.clone();
                async move {
                    log.lock().unwrap().push("specific");
                    Ok(())
                }
            }),
        )
        .on_error(error_hook_fn(move |_error: &WebhookError| {
            hook_log.lock().unwrap().push("hook");
        }))
        .build();

    testing::webhook(webhook_router(PATH, webhooks), PATH)
        .signed_body(SECRET, ACCEPTED)
        .execute()
        .await
        .assert_server_error();

    assert_eq!(*log.lock().unwrap(), vec!["generic", "hook"]);
}
