//! Account-state reconciliation.
//!
//! Keeps the stored coach flags in line with Stripe's account state. Three
//! paths write through here:
//! 1. Registration, which reuses an existing account when one is bound
//! 2. Synchronous status checks (status, lookup, dashboard link)
//! 3. Webhook deliveries, via [`ReconciliationService::apply_status`] and
//!    [`ReconciliationService::touch`]
//!
//! A coach only ever moves forward when a refresh observes
//! `details_submitted = true`; otherwise the flags simply mirror Stripe.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use coachlink_core::{AccountId, AccountStatus, Email, OnboardingStatus};

use crate::config::OnboardingConfig;
use crate::db::{CoachStore, RepositoryError};
use crate::models::{Coach, CoachUpsert};
use crate::stripe::{AccountGateway, CreateAccountParams, StripeError};

const MSG_CREATED: &str = "Stripe account created successfully";
const MSG_EXISTS_COMPLETE: &str = "Stripe account already exists and is complete";
const MSG_EXISTS_INCOMPLETE: &str = "Stripe account already exists, please complete onboarding";

const DEFAULT_ACCOUNT_COUNTRY: &str = "US";

/// Errors surfaced by the reconciliation service.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Stripe call failed.
    #[error(transparent)]
    Remote(#[from] StripeError),

    /// Coach store failed.
    #[error(transparent)]
    Storage(#[from] RepositoryError),

    /// The account has not submitted its details yet.
    #[error("Account onboarding not complete")]
    OnboardingIncomplete,

    /// An invariant of the stored data did not hold.
    #[error("{0}")]
    Internal(String),
}

/// What registration does when the status check for an existing account fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteStatusPolicy {
    /// Report `incomplete`, write nothing, log a warning.
    #[default]
    AssumeIncomplete,
    /// Surface the Stripe error to the caller.
    Fail,
}

impl std::str::FromStr for RemoteStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "assume_incomplete" => Ok(Self::AssumeIncomplete),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "expected 'assume_incomplete' or 'fail', got '{other}'"
            )),
        }
    }
}

/// Outcome of [`ReconciliationService::register_or_reuse`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub coach: Coach,
    pub account_id: AccountId,
    pub status: OnboardingStatus,
    pub message: &'static str,
    /// Whether a new Stripe account was created by this call.
    pub created: bool,
}

/// Outcome of [`ReconciliationService::lookup`].
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Present only for coaches bound to a Stripe account.
    pub coach: Option<Coach>,
    pub status: OnboardingStatus,
}

impl Lookup {
    const fn not_registered() -> Self {
        Self {
            coach: None,
            status: OnboardingStatus::NotRegistered,
        }
    }

    /// Whether the email belongs to a coach with a Stripe account.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.coach.is_some()
    }
}

/// Merges Stripe account state into the coach store.
pub struct ReconciliationService {
    store: Arc<dyn CoachStore>,
    gateway: Arc<dyn AccountGateway>,
    onboarding: OnboardingConfig,
    account_country: String,
    policy: RemoteStatusPolicy,
}

impl std::fmt::Debug for ReconciliationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationService")
            .field("onboarding", &self.onboarding)
            .field("account_country", &self.account_country)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ReconciliationService {
    /// Create a service with the default policy and a US account country.
    #[must_use]
    pub fn new(
        store: Arc<dyn CoachStore>,
        gateway: Arc<dyn AccountGateway>,
        onboarding: OnboardingConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            onboarding,
            account_country: DEFAULT_ACCOUNT_COUNTRY.to_string(),
            policy: RemoteStatusPolicy::default(),
        }
    }

    /// Set the failure policy for registration status checks.
    #[must_use]
    pub const fn with_policy(mut self, policy: RemoteStatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the country new Express accounts are created in.
    #[must_use]
    pub fn with_account_country(mut self, country: impl Into<String>) -> Self {
        self.account_country = country.into();
        self
    }

    /// Register a coach, or reuse the Stripe account already bound to the email.
    ///
    /// An email bound to an account never causes a second `create_account`.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Storage` if the store fails and
    /// `ReconcileError::Remote` if account creation fails (or the status check
    /// fails under [`RemoteStatusPolicy::Fail`]).
    #[instrument(skip(self, name), fields(email = %email))]
    pub async fn register_or_reuse(
        &self,
        email: &Email,
        name: &str,
    ) -> Result<Registration, ReconcileError> {
        let existing = self.store.find_by_email(email).await?;

        if let Some(coach) = &existing
            && let Some(account_id) = &coach.external_account_id
        {
            return self.reuse(coach, account_id).await;
        }

        let params = CreateAccountParams::express(email.clone(), &self.account_country);
        let created_id = self.gateway.create_account(&params).await?;

        // An existing coach without an account keeps the name it registered with.
        let name = existing.map_or_else(|| name.to_owned(), |c| c.name);
        let coach = self
            .store
            .upsert(CoachUpsert {
                email: email.clone(),
                name,
                external_account_id: Some(created_id.clone()),
                status: AccountStatus::default(),
            })
            .await?;

        let account_id = coach.external_account_id.clone().ok_or_else(|| {
            ReconcileError::Internal("coach stored without its account ID".to_string())
        })?;
        if account_id != created_id {
            warn!(
                created = %created_id,
                kept = %account_id,
                "Coach was bound to another account concurrently; new account is orphaned"
            );
        }

        info!(coach_id = %coach.id, account_id = %account_id, "Created Stripe account for coach");

        Ok(Registration {
            coach,
            account_id,
            status: OnboardingStatus::Incomplete,
            message: MSG_CREATED,
            created: true,
        })
    }

    async fn reuse(
        &self,
        coach: &Coach,
        account_id: &AccountId,
    ) -> Result<Registration, ReconcileError> {
        let (coach, status) = match self.gateway.get_account_status(account_id).await {
            Ok(remote) => {
                let coach = self
                    .store
                    .upsert(CoachUpsert::with_status(coach, remote))
                    .await?;
                (coach, remote.onboarding_status())
            }
            Err(e) => match self.policy {
                RemoteStatusPolicy::AssumeIncomplete => {
                    warn!(
                        account_id = %account_id,
                        error = %e,
                        "Status check failed during registration; reporting incomplete"
                    );
                    (coach.clone(), OnboardingStatus::Incomplete)
                }
                RemoteStatusPolicy::Fail => return Err(e.into()),
            },
        };

        let message = if status == OnboardingStatus::Complete {
            MSG_EXISTS_COMPLETE
        } else {
            MSG_EXISTS_INCOMPLETE
        };
        debug!(account_id = %account_id, status = %status, "Reused existing Stripe account");

        Ok(Registration {
            coach,
            account_id: account_id.clone(),
            status,
            message,
            created: false,
        })
    }

    /// Fetch the account's status and mirror it onto the bound coach, if any.
    ///
    /// The fresh remote values are returned whether or not a coach matched.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Remote` if the status fetch fails and
    /// `ReconcileError::Storage` if the write fails.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn refresh_status(
        &self,
        account_id: &AccountId,
    ) -> Result<AccountStatus, ReconcileError> {
        let status = self.gateway.get_account_status(account_id).await?;
        self.apply_status(account_id, status).await?;
        Ok(status)
    }

    /// Overwrite both flags on the coach bound to `account_id`.
    ///
    /// Returns `None` without writing when no coach matches.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Storage` if the store fails.
    pub async fn apply_status(
        &self,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> Result<Option<Coach>, ReconcileError> {
        let Some(coach) = self.store.find_by_account_id(account_id).await? else {
            debug!(account_id = %account_id, "No coach bound to account");
            return Ok(None);
        };

        let updated = self
            .store
            .upsert(CoachUpsert::with_status(&coach, status))
            .await?;
        debug!(
            coach_id = %updated.id,
            onboarding_complete = updated.onboarding_complete,
            payouts_enabled = updated.payouts_enabled,
            "Coach status updated"
        );
        Ok(Some(updated))
    }

    /// Advance `updated_at` on the coach bound to `account_id`.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Storage` if the store fails.
    pub async fn touch(&self, account_id: &AccountId) -> Result<Option<Coach>, ReconcileError> {
        let Some(coach) = self.store.find_by_account_id(account_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.store.upsert(CoachUpsert::from(&coach)).await?))
    }

    /// Report whether an email is registered and how far onboarding got.
    ///
    /// A failed status check reports `unknown` and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Storage` if the store fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn lookup(&self, email: &Email) -> Result<Lookup, ReconcileError> {
        let Some(coach) = self.store.find_by_email(email).await? else {
            return Ok(Lookup::not_registered());
        };
        let Some(account_id) = coach.external_account_id.clone() else {
            return Ok(Lookup::not_registered());
        };

        match self.gateway.get_account_status(&account_id).await {
            Ok(remote) => {
                let coach = self
                    .store
                    .upsert(CoachUpsert::with_status(&coach, remote))
                    .await?;
                Ok(Lookup {
                    coach: Some(coach),
                    status: remote.onboarding_status(),
                })
            }
            Err(e) => {
                warn!(account_id = %account_id, error = %e, "Status check failed during lookup");
                Ok(Lookup {
                    coach: Some(coach),
                    status: OnboardingStatus::Unknown,
                })
            }
        }
    }

    /// Create a hosted onboarding link for the account.
    ///
    /// The return URL carries `accountId=<id>` so the frontend can resume.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Remote` if Stripe rejects the request.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn onboarding_link(&self, account_id: &AccountId) -> Result<String, ReconcileError> {
        let return_url = return_url_for(&self.onboarding.return_url, account_id);
        let url = self
            .gateway
            .create_onboarding_link(account_id, &self.onboarding.refresh_url, &return_url)
            .await?;
        info!(account_id = %account_id, "Generated onboarding link");
        Ok(url)
    }

    /// Create an Express dashboard link once the account's details are submitted.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::OnboardingIncomplete` if Stripe reports the
    /// details as not yet submitted, `ReconcileError::Remote` if a Stripe call
    /// fails, and `ReconcileError::Storage` if the refresh write fails.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn dashboard_link(&self, account_id: &AccountId) -> Result<String, ReconcileError> {
        let status = self.refresh_status(account_id).await?;
        if !status.details_submitted {
            return Err(ReconcileError::OnboardingIncomplete);
        }

        let url = self.gateway.create_login_link(account_id).await?;
        info!(account_id = %account_id, "Generated dashboard link");
        Ok(url)
    }

    /// Every stored coach, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Storage` if the store fails.
    pub async fn list_coaches(&self) -> Result<Vec<Coach>, ReconcileError> {
        Ok(self.store.list_all().await?)
    }
}

/// The configured return URL with `accountId` appended to its query.
fn return_url_for(base: &Url, account_id: &AccountId) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("accountId", account_id.as_str());
    url
}
