//! Behavior when the coach store is unreachable.
//!
//! Account routes surface a generic 500; webhook deliveries that verify are
//! still acknowledged.

use axum::http::StatusCode;
use serde_json::json;

use coachlink_integration_tests::{TestApp, account_updated_event, now, signature_header};
use coachlink_server::services::Outcome;

// =============================================================================
// Account Routes
// =============================================================================

#[tokio::test]
async fn test_create_account_with_store_down_is_server_error() {
    let app = TestApp::with_failing_store();

    let (status, body) = app
        .post_json("/accounts", &json!({ "email": "a@x.com", "name": "Alex" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Storage unavailable" })
    );
    assert_eq!(app.gateway.create_calls(), 0);
}

#[tokio::test]
async fn test_lookup_with_store_down_is_server_error() {
    let app = TestApp::with_failing_store();

    let (status, body) = app.get("/accounts/lookup?email=a@x.com").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Storage unavailable");
}

#[tokio::test]
async fn test_readiness_with_store_down() {
    let app = TestApp::with_failing_store();

    let (status, _) = app.get("/health/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn test_signed_webhook_with_store_down_is_acknowledged() {
    let app = TestApp::with_failing_store();

    let (status, body) = app
        .deliver_webhook(&account_updated_event("acct_1", true, true))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Webhook handled successfully"));
}

#[tokio::test]
async fn test_handler_reports_failure_with_store_down() {
    let app = TestApp::with_failing_store();
    let payload = account_updated_event("acct_1", true, true);
    let header = signature_header(&payload, now());

    let outcome = app
        .state
        .webhooks()
        .handle(&payload, Some(&header))
        .await
        .expect("signature verifies");

    assert_eq!(outcome, Outcome::Failed);
}
