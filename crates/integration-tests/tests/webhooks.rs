//! Integration tests for the Stripe webhook endpoint.
//!
//! Deliveries are signed with the shared test secret and posted through the
//! router, so signature checks, dispatch and store writes run end to end.

use axum::http::StatusCode;
use serde_json::json;

use coachlink_core::{AccountId, Email};
use coachlink_integration_tests::{
    TestApp, account_updated_event, application_authorized_event, now, signature_header,
};
use coachlink_server::db::CoachStore;
use coachlink_server::models::Coach;
use coachlink_server::services::Outcome;

const ACK: &str = "Webhook handled successfully";

/// Register `a@x.com` and return the stored coach.
async fn registered(app: &TestApp) -> Coach {
    app.reconciler()
        .register_or_reuse(&Email::parse("a@x.com").expect("valid email"), "Alex")
        .await
        .expect("registration succeeds")
        .coach
}

async fn stored(app: &TestApp, account_id: &AccountId) -> Coach {
    app.store
        .find_by_account_id(account_id)
        .await
        .expect("store reachable")
        .expect("coach stored")
}

fn account_id(coach: &Coach) -> AccountId {
    coach
        .external_account_id
        .clone()
        .expect("registered coach has an account")
}

// =============================================================================
// Signature Verification
// =============================================================================

#[tokio::test]
async fn test_missing_signature_is_rejected_without_writes() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let payload = account_updated_event(account_id(&coach).as_str(), true, true);

    let (status, body) = app.deliver_webhook_with_header(&payload, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let after = stored(&app, &account_id(&coach)).await;
    assert!(!after.onboarding_complete);
    assert_eq!(after.updated_at, coach.updated_at);
}

#[tokio::test]
async fn test_wrong_signature_is_rejected_without_writes() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let payload = account_updated_event(account_id(&coach).as_str(), true, true);
    let header = format!("t={},v1={}", now(), "0".repeat(64));

    let (status, _) = app
        .deliver_webhook_with_header(&payload, Some(&header))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let after = stored(&app, &account_id(&coach)).await;
    assert!(!after.onboarding_complete);
    assert_eq!(after.updated_at, coach.updated_at);
}

#[tokio::test]
async fn test_signature_over_different_payload_is_rejected() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let id = account_id(&coach);
    let signed = account_updated_event(id.as_str(), false, false);
    let tampered = account_updated_event(id.as_str(), true, true);

    let (status, _) = app
        .deliver_webhook_with_header(&tampered, Some(&signature_header(&signed, now())))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!stored(&app, &id).await.payouts_enabled);
}

#[tokio::test]
async fn test_stale_signature_is_rejected() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let payload = account_updated_event(account_id(&coach).as_str(), true, true);
    let stale = signature_header(&payload, now() - 3600);

    let (status, _) = app.deliver_webhook_with_header(&payload, Some(&stale)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!stored(&app, &account_id(&coach)).await.onboarding_complete);
}

#[tokio::test]
async fn test_malformed_signature_header_is_rejected() {
    let app = TestApp::new();
    let payload = account_updated_event("acct_1", true, true);

    let (status, _) = app
        .deliver_webhook_with_header(&payload, Some("not-a-signature"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// account.updated
// =============================================================================

#[tokio::test]
async fn test_account_updated_overwrites_flags() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let id = account_id(&coach);

    let (status, body) = app
        .deliver_webhook(&account_updated_event(id.as_str(), true, true))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(ACK));
    let after = stored(&app, &id).await;
    assert!(after.onboarding_complete);
    assert!(after.payouts_enabled);
    assert!(after.updated_at > coach.updated_at);
}

#[tokio::test]
async fn test_account_updated_twice_converges() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let id = account_id(&coach);
    let payload = account_updated_event(id.as_str(), true, false);

    let (first, _) = app.deliver_webhook(&payload).await;
    let once = stored(&app, &id).await;
    let (second, _) = app.deliver_webhook(&payload).await;
    let twice = stored(&app, &id).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(once.onboarding_complete, twice.onboarding_complete);
    assert_eq!(once.payouts_enabled, twice.payouts_enabled);
    assert!(twice.onboarding_complete);
    assert!(!twice.payouts_enabled);
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_account_updated_for_unknown_account_is_acknowledged() {
    let app = TestApp::new();

    let (status, body) = app
        .deliver_webhook(&account_updated_event("acct_nobody", true, true))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(ACK));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_account_updated_with_malformed_object_is_acknowledged() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let payload = json!({
        "id": "evt_bad_object",
        "type": "account.updated",
        "data": { "object": { "details_submitted": "yes" } }
    })
    .to_string();

    let (status, _) = app.deliver_webhook(&payload).await;

    assert_eq!(status, StatusCode::OK);
    let after = stored(&app, &account_id(&coach)).await;
    assert_eq!(after.updated_at, coach.updated_at);
}

// =============================================================================
// account.application.authorized
// =============================================================================

#[tokio::test]
async fn test_application_authorized_touches_coach() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let id = account_id(&coach);

    let (status, _) = app
        .deliver_webhook(&application_authorized_event(id.as_str()))
        .await;

    assert_eq!(status, StatusCode::OK);
    let after = stored(&app, &id).await;
    assert!(after.updated_at > coach.updated_at);
    assert_eq!(after.onboarding_complete, coach.onboarding_complete);
    assert_eq!(after.payouts_enabled, coach.payouts_enabled);
}

#[tokio::test]
async fn test_application_authorized_for_unknown_account_writes_nothing() {
    let app = TestApp::new();

    let (status, _) = app
        .deliver_webhook(&application_authorized_event("acct_nobody"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.store.is_empty().await);
}

// =============================================================================
// Other Deliveries
// =============================================================================

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let payload = json!({
        "id": "evt_payout",
        "type": "payout.paid",
        "data": { "object": { "id": "po_1" } }
    })
    .to_string();

    let (status, body) = app.deliver_webhook(&payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(ACK));
    let after = stored(&app, &account_id(&coach)).await;
    assert_eq!(after.updated_at, coach.updated_at);
}

#[tokio::test]
async fn test_verified_garbage_payload_is_acknowledged() {
    let app = TestApp::new();

    let (status, _) = app.deliver_webhook("{not json").await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Handler Outcomes
// =============================================================================

#[tokio::test]
async fn test_handler_reports_outcomes() {
    let app = TestApp::new();
    let coach = registered(&app).await;
    let id = account_id(&coach);
    let webhooks = app.state.webhooks();

    let handle = |payload: String| async move {
        let header = signature_header(&payload, now());
        webhooks
            .handle(&payload, Some(&header))
            .await
            .expect("signature verifies")
    };

    assert_eq!(
        handle(account_updated_event(id.as_str(), true, true)).await,
        Outcome::Updated
    );
    assert_eq!(
        handle(application_authorized_event(id.as_str())).await,
        Outcome::Touched
    );
    assert_eq!(
        handle(account_updated_event("acct_nobody", true, true)).await,
        Outcome::NoMatch
    );
    assert_eq!(
        handle(json!({"id": "evt_x", "type": "charge.succeeded", "data": {"object": {}}}).to_string())
            .await,
        Outcome::Ignored
    );
    assert_eq!(handle("[]".to_string()).await, Outcome::Failed);
}

#[tokio::test]
async fn test_handler_rejects_missing_signature() {
    let app = TestApp::new();

    let result = app
        .state
        .webhooks()
        .handle(&account_updated_event("acct_1", true, true), None)
        .await;

    assert!(result.is_err());
}
