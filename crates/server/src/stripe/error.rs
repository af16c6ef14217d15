//! Stripe-related errors.

use thiserror::Error;

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed before a response arrived.
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Stripe error code (e.g., `account_invalid`), when present.
        code: Option<String>,
        /// Human-readable message from Stripe.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("Failed to parse Stripe response: {0}")]
    Parse(String),

    /// Client could not be configured.
    #[error("Stripe configuration error: {0}")]
    Config(String),
}

impl StripeError {
    /// Stripe's error code, if the API returned one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
