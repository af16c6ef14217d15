//! Integration test support for CoachLink.
//!
//! Tests drive the library and the axum router in-process: the coach store is
//! an [`InMemoryCoachStore`] (or a [`FailingStore`]) and Stripe is replaced by
//! a [`StubGateway`] that records every call.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p coachlink-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `reconciliation` - Registration and status reconciliation
//! - `webhooks` - Signed webhook deliveries
//! - `accounts_api` - HTTP round trips through the router
//! - `storage_failures` - Routes and webhooks with the store down

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use secrecy::SecretString;
use tower::ServiceExt;
use url::Url;

use coachlink_core::{AccountId, AccountStatus, Email};
use coachlink_server::config::{
    DEFAULT_WEBHOOK_TOLERANCE, OnboardingConfig, ServerConfig, StoreBackend, StripeConfig,
    WebhookConfig,
};
use coachlink_server::db::{CoachStore, InMemoryCoachStore, RepositoryError};
use coachlink_server::models::{Coach, CoachUpsert};
use coachlink_server::routes;
use coachlink_server::services::{ReconciliationService, RemoteStatusPolicy};
use coachlink_server::state::AppState;
use coachlink_server::stripe::webhook::{SIGNATURE_HEADER, compute_signature};
use coachlink_server::stripe::{AccountGateway, CreateAccountParams, StripeError};

/// Signing secret shared by [`test_config`] and [`signature_header`].
pub const WEBHOOK_SECRET: &str = "whsec_integration_test_secret";

// =============================================================================
// Stub Gateway
// =============================================================================

/// In-process stand-in for Stripe.
///
/// New accounts are numbered `acct_1`, `acct_2`, ... Status calls return the
/// status set for the account (or the default), unless failures are switched on.
#[derive(Debug, Default)]
pub struct StubGateway {
    next_id: AtomicUsize,
    created: Mutex<Vec<CreateAccountParams>>,
    statuses: Mutex<HashMap<AccountId, AccountStatus>>,
    default_status: Mutex<AccountStatus>,
    fail_status: AtomicBool,
    fail_create: AtomicBool,
    status_calls: AtomicUsize,
    onboarding_links: Mutex<Vec<(AccountId, Url, Url)>>,
    login_links: Mutex<Vec<AccountId>>,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report `status` for `account_id` from now on.
    pub fn set_status(&self, account_id: &AccountId, status: AccountStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(account_id.clone(), status);
    }

    /// Report `status` for accounts without a specific status.
    pub fn set_default_status(&self, status: AccountStatus) {
        *self.default_status.lock().unwrap() = status;
    }

    /// Make every status call fail.
    pub fn fail_status_checks(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    /// Make every account creation fail.
    pub fn fail_account_creation(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Parameters of every `create_account` call so far.
    #[must_use]
    pub fn created(&self) -> Vec<CreateAccountParams> {
        self.created.lock().unwrap().clone()
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn onboarding_links(&self) -> Vec<(AccountId, Url, Url)> {
        self.onboarding_links.lock().unwrap().clone()
    }

    #[must_use]
    pub fn login_link_calls(&self) -> usize {
        self.login_links.lock().unwrap().len()
    }
}

fn stub_error(message: &str) -> StripeError {
    StripeError::Api {
        status: 500,
        code: Some("api_error".to_string()),
        message: message.to_string(),
    }
}

#[async_trait]
impl AccountGateway for StubGateway {
    async fn create_account(&self, params: &CreateAccountParams) -> Result<AccountId, StripeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(stub_error("Account creation unavailable"));
        }
        self.created.lock().unwrap().push(params.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccountId::parse(&format!("acct_{n}")).unwrap())
    }

    async fn create_onboarding_link(
        &self,
        account_id: &AccountId,
        refresh_url: &Url,
        return_url: &Url,
    ) -> Result<String, StripeError> {
        self.onboarding_links.lock().unwrap().push((
            account_id.clone(),
            refresh_url.clone(),
            return_url.clone(),
        ));
        Ok(format!("https://connect.stripe.com/setup/e/{account_id}/onboarding"))
    }

    async fn create_login_link(&self, account_id: &AccountId) -> Result<String, StripeError> {
        self.login_links.lock().unwrap().push(account_id.clone());
        Ok(format!("https://connect.stripe.com/express/{account_id}/login"))
    }

    async fn get_account_status(&self, account_id: &AccountId) -> Result<AccountStatus, StripeError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(stub_error("Status lookup unavailable"));
        }
        let statuses = self.statuses.lock().unwrap();
        Ok(statuses
            .get(account_id)
            .copied()
            .unwrap_or_else(|| *self.default_status.lock().unwrap()))
    }
}

// =============================================================================
// Failing Store
// =============================================================================

/// Coach store whose every call fails as if the pool were exhausted.
#[derive(Debug, Default)]
pub struct FailingStore;

fn pool_timed_out() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl CoachStore for FailingStore {
    async fn find_by_email(&self, _email: &Email) -> Result<Option<Coach>, RepositoryError> {
        Err(pool_timed_out())
    }

    async fn find_by_account_id(
        &self,
        _account_id: &AccountId,
    ) -> Result<Option<Coach>, RepositoryError> {
        Err(pool_timed_out())
    }

    async fn upsert(&self, _upsert: CoachUpsert) -> Result<Coach, RepositoryError> {
        Err(pool_timed_out())
    }

    async fn list_all(&self) -> Result<Vec<Coach>, RepositoryError> {
        Err(pool_timed_out())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Err(pool_timed_out())
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// Server configuration pointing at nothing real.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        store: StoreBackend::Memory,
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_integration"),
            api_base: Url::parse("http://127.0.0.1:12111").unwrap(),
            account_country: "US".to_string(),
        },
        webhook: WebhookConfig {
            signing_secret: SecretString::from(WEBHOOK_SECRET),
            tolerance: DEFAULT_WEBHOOK_TOLERANCE,
        },
        onboarding: OnboardingConfig {
            refresh_url: Url::parse("http://localhost:3000/onboarding/refresh").unwrap(),
            return_url: Url::parse("http://localhost:3000/onboarding/complete").unwrap(),
        },
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        remote_status_policy: RemoteStatusPolicy::AssumeIncomplete,
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Everything a test needs: state, router, and handles on the fakes.
pub struct TestApp<S = InMemoryCoachStore> {
    pub state: AppState,
    pub router: Router,
    pub store: Arc<S>,
    pub gateway: Arc<StubGateway>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryCoachStore::new()))
    }
}

impl TestApp<FailingStore> {
    /// An app whose coach store is down.
    #[must_use]
    pub fn with_failing_store() -> Self {
        Self::with_store(test_config(), Arc::new(FailingStore))
    }
}

impl<S: CoachStore + 'static> TestApp<S> {
    #[must_use]
    pub fn with_store(config: ServerConfig, store: Arc<S>) -> Self {
        let gateway = StubGateway::new();
        let state = AppState::new(config, store.clone(), gateway.clone());
        let router = routes::app(state.clone());
        Self {
            state,
            router,
            store,
            gateway,
        }
    }

    #[must_use]
    pub fn reconciler(&self) -> &ReconciliationService {
        self.state.reconciler()
    }

    /// Send a request through the router and decode the JSON body.
    ///
    /// Non-JSON bodies come back as a JSON string.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Deliver a webhook payload signed with [`WEBHOOK_SECRET`].
    pub async fn deliver_webhook(&self, payload: &str) -> (StatusCode, serde_json::Value) {
        self.deliver_webhook_with_header(payload, Some(&signature_header(payload, now())))
            .await
    }

    pub async fn deliver_webhook_with_header(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::post("/webhooks/remote-account")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        self.send(request.body(Body::from(payload.to_owned())).unwrap())
            .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Webhook Helpers
// =============================================================================

/// Current Unix time in seconds.
#[must_use]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A valid `Stripe-Signature` header for `payload` at `timestamp`.
#[must_use]
pub fn signature_header(payload: &str, timestamp: i64) -> String {
    let secret = SecretString::from(WEBHOOK_SECRET);
    let signature = compute_signature(payload, &secret, timestamp).unwrap();
    format!("t={timestamp},v1={signature}")
}

/// An `account.updated` event body.
#[must_use]
pub fn account_updated_event(
    account_id: &str,
    details_submitted: bool,
    payouts_enabled: bool,
) -> String {
    serde_json::json!({
        "id": "evt_account_updated",
        "object": "event",
        "type": "account.updated",
        "account": account_id,
        "data": {
            "object": {
                "id": account_id,
                "object": "account",
                "details_submitted": details_submitted,
                "payouts_enabled": payouts_enabled,
                "charges_enabled": payouts_enabled,
            }
        }
    })
    .to_string()
}

/// An `account.application.authorized` event body.
#[must_use]
pub fn application_authorized_event(account_id: &str) -> String {
    serde_json::json!({
        "id": "evt_application_authorized",
        "object": "event",
        "type": "account.application.authorized",
        "account": account_id,
        "data": {
            "object": {
                "id": "ca_platform",
                "object": "application",
            }
        }
    })
    .to_string()
}
