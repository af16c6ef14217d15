//! Stripe Connect integration.
//!
//! This module provides:
//! - [`AccountGateway`], the seam the reconciliation service calls through
//! - [`StripeClient`], its REST implementation
//! - Webhook signature verification and event typing
//!
//! # Flow
//!
//! 1. A coach registers and an Express account is created
//! 2. The coach follows a hosted onboarding link
//! 3. Stripe sends `account.updated` as the account's state changes
//! 4. Status checks and webhooks mirror the account flags onto the coach

mod client;
mod error;
mod types;
pub mod webhook;

use async_trait::async_trait;
use url::Url;

use coachlink_core::{AccountId, AccountStatus};

pub use client::StripeClient;
pub use error::StripeError;
pub use types::{Account, Capability, CreateAccountParams};
pub use webhook::{Event, EventKind, WebhookError};

/// Remote operations on Stripe Express connected accounts.
///
/// Each method is a single outbound call.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Create an Express connected account.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the call fails or Stripe rejects it.
    async fn create_account(&self, params: &CreateAccountParams) -> Result<AccountId, StripeError>;

    /// Create a single-use hosted onboarding link.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the call fails or Stripe rejects it.
    async fn create_onboarding_link(
        &self,
        account_id: &AccountId,
        refresh_url: &Url,
        return_url: &Url,
    ) -> Result<String, StripeError>;

    /// Create an Express dashboard login link.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the call fails or Stripe rejects it.
    async fn create_login_link(&self, account_id: &AccountId) -> Result<String, StripeError>;

    /// Retrieve the account's current onboarding and payout flags.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the call fails or Stripe rejects it.
    async fn get_account_status(&self, account_id: &AccountId) -> Result<AccountStatus, StripeError>;
}
