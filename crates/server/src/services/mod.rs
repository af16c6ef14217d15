//! Business logic services.
//!
//! # Services
//!
//! - `reconciliation` - Registration and status reconciliation against Stripe
//! - `webhooks` - Verified Stripe webhook dispatch

pub mod reconciliation;
pub mod webhooks;

pub use reconciliation::{
    Lookup, ReconcileError, ReconciliationService, Registration, RemoteStatusPolicy,
};
pub use webhooks::{Outcome, WebhookHandler};
