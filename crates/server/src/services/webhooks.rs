//! Stripe webhook handling.
//!
//! Only a failed signature check is reported to the sender. Once a delivery is
//! verified every processing error is logged and absorbed, so Stripe never
//! retries an event this service has already seen.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use coachlink_core::AccountId;

use super::ReconciliationService;
use crate::config::WebhookConfig;
use crate::stripe::webhook::{self, Event, EventKind, WebhookError};

/// What a verified delivery led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A coach's flags were overwritten.
    Updated,
    /// A coach's `updated_at` was advanced.
    Touched,
    /// No coach is bound to the event's account.
    NoMatch,
    /// The event type is not handled.
    Ignored,
    /// Processing failed after verification.
    Failed,
}

/// Verifies and dispatches Stripe webhook deliveries.
#[derive(Debug)]
pub struct WebhookHandler {
    config: WebhookConfig,
    reconciler: Arc<ReconciliationService>,
}

impl WebhookHandler {
    /// Create a handler that writes through `reconciler`.
    #[must_use]
    pub const fn new(config: WebhookConfig, reconciler: Arc<ReconciliationService>) -> Self {
        Self { config, reconciler }
    }

    /// Verify a delivery and apply it.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSignature` if the header is missing or
    /// does not verify. Nothing is written in that case.
    #[instrument(skip_all)]
    pub async fn handle(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> Result<Outcome, WebhookError> {
        let Some(signature) = signature else {
            return Err(WebhookError::InvalidSignature(format!(
                "missing {} header",
                webhook::SIGNATURE_HEADER
            )));
        };

        let event = match webhook::construct_event(
            payload,
            signature,
            &self.config.signing_secret,
            self.config.tolerance,
        ) {
            Ok(event) => event,
            Err(e @ WebhookError::InvalidSignature(_)) => return Err(e),
            Err(e) => {
                error!(error = %e, "Verified webhook payload could not be parsed");
                return Ok(Outcome::Failed);
            }
        };

        info!(event_id = %event.id, event_type = %event.event_type, "Received Stripe webhook event");
        Ok(self.dispatch(&event).await)
    }

    async fn dispatch(&self, event: &Event) -> Outcome {
        match event.kind() {
            Ok(EventKind::AccountUpdated(account)) => {
                let account_id = match AccountId::parse(&account.id) {
                    Ok(id) => id,
                    Err(e) => {
                        error!(event_id = %event.id, error = %e, "account.updated carries an invalid account ID");
                        return Outcome::Failed;
                    }
                };
                match self.reconciler.apply_status(&account_id, account.status()).await {
                    Ok(Some(coach)) => {
                        info!(
                            coach_id = %coach.id,
                            account_id = %account_id,
                            onboarding_complete = coach.onboarding_complete,
                            payouts_enabled = coach.payouts_enabled,
                            "Coach updated from account.updated"
                        );
                        Outcome::Updated
                    }
                    Ok(None) => {
                        warn!(account_id = %account_id, "No coach found for account.updated");
                        Outcome::NoMatch
                    }
                    Err(e) => {
                        error!(account_id = %account_id, error = %e, "Error handling account.updated event");
                        Outcome::Failed
                    }
                }
            }
            Ok(EventKind::ApplicationAuthorized { account_id }) => {
                match self.reconciler.touch(&account_id).await {
                    Ok(Some(coach)) => {
                        info!(coach_id = %coach.id, account_id = %account_id, "Application authorized for coach");
                        Outcome::Touched
                    }
                    Ok(None) => {
                        warn!(account_id = %account_id, "No coach found for account.application.authorized");
                        Outcome::NoMatch
                    }
                    Err(e) => {
                        error!(account_id = %account_id, error = %e, "Error handling account.application.authorized event");
                        Outcome::Failed
                    }
                }
            }
            Ok(EventKind::Other(event_type)) => {
                info!(event_type = %event_type, "Unhandled event type");
                Outcome::Ignored
            }
            Err(e) => {
                error!(event_id = %event.id, event_type = %event.event_type, error = %e, "Could not read webhook event object");
                Outcome::Failed
            }
        }
    }
}
