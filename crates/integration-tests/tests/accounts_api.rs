//! HTTP round trips through the CoachLink router.
//!
//! Each test builds a fresh in-memory app, so ordering does not matter.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use coachlink_core::{AccountId, AccountStatus};
use coachlink_integration_tests::TestApp;

fn account(s: &str) -> AccountId {
    AccountId::parse(s).expect("valid account ID")
}

async fn register(app: &TestApp, email: &str, name: &str) -> serde_json::Value {
    let (status, body) = app
        .post_json("/accounts", &json!({ "email": email, "name": name }))
        .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {body}");
    body
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_up() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["service"], "coachlink-server");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_readiness_with_memory_store() {
    let app = TestApp::new();

    let (status, _) = app.get("/health/ready").await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// POST /accounts
// =============================================================================

#[tokio::test]
async fn test_create_account_response_shape() {
    let app = TestApp::new();

    let body = register(&app, "a@x.com", "Alex").await;

    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["name"], "Alex");
    assert_eq!(body["externalAccountId"], "acct_1");
    assert_eq!(body["status"], "incomplete");
    assert_eq!(body["isRegistered"], true);
    assert_eq!(body["message"], "Stripe account created successfully");
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn test_create_account_trims_and_reuses() {
    let app = TestApp::new();

    let first = register(&app, "  a@x.com ", " Alex ").await;
    let second = register(&app, "a@x.com", "Alex").await;

    assert_eq!(first["email"], "a@x.com");
    assert_eq!(first["name"], "Alex");
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["externalAccountId"], first["externalAccountId"]);
    assert_eq!(
        second["message"],
        "Stripe account already exists, please complete onboarding"
    );
    assert_eq!(app.gateway.create_calls(), 1);
}

#[tokio::test]
async fn test_create_account_reports_complete_after_onboarding() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;
    app.gateway
        .set_status(&account("acct_1"), AccountStatus::new(true, false));

    let body = register(&app, "a@x.com", "Alex").await;

    assert_eq!(body["status"], "complete");
    assert_eq!(
        body["message"],
        "Stripe account already exists and is complete"
    );
}

#[tokio::test]
async fn test_create_account_validation_errors() {
    let app = TestApp::new();

    let cases = [
        (json!({ "name": "Alex" }), "Email is required"),
        (json!({ "email": "   ", "name": "Alex" }), "Email is required"),
        (json!({ "email": "a@x.com" }), "Name is required"),
        (json!({ "email": "a@x.com", "name": "" }), "Name is required"),
    ];

    for (payload, expected) in cases {
        let (status, body) = app.post_json("/accounts", &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload}");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], expected);
    }

    let (status, body) = app
        .post_json("/accounts", &json!({ "email": "not-an-email", "name": "Alex" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .expect("message is a string")
            .starts_with("Invalid email")
    );

    assert!(app.store.is_empty().await);
    assert_eq!(app.gateway.create_calls(), 0);
}

#[tokio::test]
async fn test_create_account_rejects_malformed_json() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Request::post("/accounts")
                .header("content-type", "application/json")
                .body(Body::from("{\"email\":"))
                .expect("request builds"),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_account_stripe_failure_is_server_error() {
    let app = TestApp::new();
    app.gateway.fail_account_creation(true);

    let (status, body) = app
        .post_json("/accounts", &json!({ "email": "a@x.com", "name": "Alex" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Stripe error: Account creation unavailable"
    );
    assert!(app.store.is_empty().await);
}

// =============================================================================
// POST /accounts/onboarding-link
// =============================================================================

#[tokio::test]
async fn test_onboarding_link_uses_configured_urls() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;

    let (status, body) = app
        .post_json(
            "/accounts/onboarding-link",
            &json!({ "externalAccountId": "acct_1" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        body["onboardingUrl"]
            .as_str()
            .expect("url is a string")
            .contains("acct_1")
    );

    let links = app.gateway.onboarding_links();
    let (id, refresh, ret) = links.first().expect("one link requested");
    assert_eq!(id.as_str(), "acct_1");
    assert_eq!(refresh.as_str(), "http://localhost:3000/onboarding/refresh");
    assert_eq!(
        ret.as_str(),
        "http://localhost:3000/onboarding/complete?accountId=acct_1"
    );
}

#[tokio::test]
async fn test_onboarding_link_requires_account_id() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/accounts/onboarding-link", &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Account ID is required");

    let (status, body) = app
        .post_json(
            "/accounts/onboarding-link",
            &json!({ "externalAccountId": "cus_123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .expect("message is a string")
            .starts_with("Invalid account ID")
    );
    assert!(app.gateway.onboarding_links().is_empty());
}

// =============================================================================
// GET /accounts/status
// =============================================================================

#[tokio::test]
async fn test_status_refreshes_stored_coach() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;
    app.gateway
        .set_status(&account("acct_1"), AccountStatus::new(true, true));

    let (status, body) = app
        .get("/accounts/status?externalAccountId=acct_1")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["externalAccountId"], "acct_1");
    assert_eq!(body["detailsSubmitted"], true);
    assert_eq!(body["payoutsEnabled"], true);
    assert_eq!(body["onboardingComplete"], true);

    let (_, lookup) = app.get("/accounts/lookup?email=a@x.com").await;
    assert_eq!(lookup["status"], "complete");
}

#[tokio::test]
async fn test_status_for_unbound_account_still_reports() {
    let app = TestApp::new();
    app.gateway
        .set_status(&account("acct_elsewhere"), AccountStatus::new(true, false));

    let (status, body) = app
        .get("/accounts/status?externalAccountId=acct_elsewhere")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detailsSubmitted"], true);
    assert_eq!(body["payoutsEnabled"], false);
    assert_eq!(body["onboardingComplete"], false);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_status_requires_account_id() {
    let app = TestApp::new();

    let (status, body) = app.get("/accounts/status").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Account ID is required");
    assert_eq!(app.gateway.status_calls(), 0);
}

#[tokio::test]
async fn test_status_stripe_failure_is_server_error() {
    let app = TestApp::new();
    app.gateway.fail_status_checks(true);

    let (status, body) = app
        .get("/accounts/status?externalAccountId=acct_1")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

// =============================================================================
// GET /accounts/dashboard-link
// =============================================================================

#[tokio::test]
async fn test_dashboard_link_rejected_until_details_submitted() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;

    let (status, body) = app
        .get("/accounts/dashboard-link?externalAccountId=acct_1")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Account onboarding not complete");
    assert_eq!(app.gateway.login_link_calls(), 0);
}

#[tokio::test]
async fn test_dashboard_link_after_onboarding() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;
    app.gateway
        .set_status(&account("acct_1"), AccountStatus::new(true, false));

    let (status, body) = app
        .get("/accounts/dashboard-link?externalAccountId=acct_1")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        body["dashboardUrl"]
            .as_str()
            .expect("url is a string")
            .contains("acct_1")
    );
    assert_eq!(app.gateway.login_link_calls(), 1);
}

// =============================================================================
// GET /accounts/lookup
// =============================================================================

#[tokio::test]
async fn test_lookup_unknown_email_is_not_registered() {
    let app = TestApp::new();

    let (status, body) = app.get("/accounts/lookup?email=nobody@x.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_registered");
    assert_eq!(body["isRegistered"], false);
    assert_eq!(body["email"], "nobody@x.com");
    assert!(body["externalAccountId"].is_null());
}

#[tokio::test]
async fn test_lookup_registered_email() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;

    let (status, body) = app.get("/accounts/lookup?email=a@x.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "incomplete");
    assert_eq!(body["isRegistered"], true);
    assert_eq!(body["name"], "Alex");
    assert_eq!(body["externalAccountId"], "acct_1");
}

#[tokio::test]
async fn test_lookup_reports_unknown_when_stripe_fails() {
    let app = TestApp::new();
    register(&app, "a@x.com", "Alex").await;
    app.gateway.fail_status_checks(true);

    let (status, body) = app.get("/accounts/lookup?email=a@x.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unknown");
    assert_eq!(body["isRegistered"], true);
}

#[tokio::test]
async fn test_lookup_requires_email() {
    let app = TestApp::new();

    let (status, body) = app.get("/accounts/lookup").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is required");
}
