//! Stripe REST API client.
//!
//! Requests are form-encoded with bearer authentication; responses are JSON.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use coachlink_core::{AccountId, AccountStatus};

use super::AccountGateway;
use super::error::StripeError;
use super::types::{Account, CreateAccountParams, ErrorEnvelope, LinkResponse};
use crate::config::StripeConfig;

/// Stripe API version pinned for every request.
const STRIPE_API_VERSION: &str = "2024-06-20";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: Url,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.inner.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Config` if the secret key cannot be used as a
    /// header value, or `StripeError::Http` if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.secret_key.expose_secret()))
                .map_err(|e| StripeError::Config(format!("Invalid secret key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        headers.insert("Stripe-Version", HeaderValue::from_static(STRIPE_API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        endpoint(&self.inner.api_base, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let response = self.inner.client.get(self.endpoint(path)).send().await?;
        Self::handle_response(response).await
    }

    async fn post_form<T, F>(&self, path: &str, form: &F) -> Result<T, StripeError>
    where
        T: DeserializeOwned,
        F: serde::Serialize + ?Sized + Sync,
    {
        let response = self
            .inner
            .client
            .post(self.endpoint(path))
            .form(form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| StripeError::Parse(format!("Failed to parse response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let error = parse_error(status.as_u16(), &body);
        warn!(status = status.as_u16(), code = ?error.code(), error = %error, "Stripe API error");
        Err(error)
    }
}

/// Join the configured base URL and an API path.
fn endpoint(api_base: &Url, path: &str) -> String {
    format!("{}/v1/{path}", api_base.as_str().trim_end_matches('/'))
}

/// Turn a non-success response body into a `StripeError::Api`.
fn parse_error(status: u16, body: &str) -> StripeError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            debug!(error_type = ?envelope.error.error_type, "Parsed Stripe error envelope");
            StripeError::Api {
                status,
                code: envelope.error.code,
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe returned HTTP {status}")),
            }
        }
        Err(_) => StripeError::Api {
            status,
            code: None,
            message: format!("Stripe returned HTTP {status}"),
        },
    }
}

/// Validate the account ID Stripe handed back.
fn parse_account_id(id: &str) -> Result<AccountId, StripeError> {
    AccountId::parse(id).map_err(|e| StripeError::Parse(format!("unexpected account ID '{id}': {e}")))
}

#[async_trait]
impl AccountGateway for StripeClient {
    #[instrument(skip(self, params), fields(email = %params.email, country = %params.country))]
    async fn create_account(&self, params: &CreateAccountParams) -> Result<AccountId, StripeError> {
        let account: Account = self.post_form("accounts", &params.to_form()).await?;
        let account_id = parse_account_id(&account.id)?;
        debug!(account_id = %account_id, "Express account created");
        Ok(account_id)
    }

    #[instrument(skip(self, refresh_url, return_url), fields(account_id = %account_id))]
    async fn create_onboarding_link(
        &self,
        account_id: &AccountId,
        refresh_url: &Url,
        return_url: &Url,
    ) -> Result<String, StripeError> {
        let form = [
            ("account", account_id.as_str()),
            ("refresh_url", refresh_url.as_str()),
            ("return_url", return_url.as_str()),
            ("type", "account_onboarding"),
        ];
        let link: LinkResponse = self.post_form("account_links", &form).await?;
        Ok(link.url)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn create_login_link(&self, account_id: &AccountId) -> Result<String, StripeError> {
        let form: [(&str, &str); 0] = [];
        let link: LinkResponse = self
            .post_form(&format!("accounts/{account_id}/login_links"), &form)
            .await?;
        Ok(link.url)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn get_account_status(&self, account_id: &AccountId) -> Result<AccountStatus, StripeError> {
        let account: Account = self.get(&format!("accounts/{account_id}")).await?;
        let status = account.status();
        debug!(
            details_submitted = status.details_submitted,
            payouts_enabled = status.payouts_enabled,
            "Account status retrieved"
        );
        Ok(status)
    }
}
