//! Stripe webhook signature verification and event parsing.
//!
//! Implements Stripe's scheme:
//! <https://docs.stripe.com/webhooks#verify-manually>
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! The signed payload is `"{t}.{raw_body}"`, HMAC-SHA256 keyed with the
//! endpoint secret. Any matching `v1` entry is accepted.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

use coachlink_core::AccountId;

use super::types::Account;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Errors produced while turning a webhook delivery into an [`Event`].
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Header missing, malformed, stale, or no signature matched.
    #[error("Invalid Stripe signature: {0}")]
    InvalidSignature(String),

    /// Signature was valid but the payload could not be parsed.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// A verified Stripe event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Connected account the event concerns (Connect webhooks only).
    #[serde(default)]
    pub account: Option<String>,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The event kinds this service acts on.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// `account.updated`, carrying the updated account object.
    AccountUpdated(Account),
    /// `account.application.authorized`.
    ApplicationAuthorized {
        /// Account that authorized the platform.
        account_id: AccountId,
    },
    /// Anything else; the event type is kept for logging.
    Other(String),
}

impl Event {
    /// Deserialize the embedded object for the event's kind.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidPayload` if the object does not match the
    /// shape the event type implies.
    pub fn kind(&self) -> Result<EventKind, WebhookError> {
        match self.event_type.as_str() {
            "account.updated" => {
                let account = Account::deserialize(&self.data.object).map_err(|e| {
                    WebhookError::InvalidPayload(format!("account object: {e}"))
                })?;
                Ok(EventKind::AccountUpdated(account))
            }
            "account.application.authorized" => {
                let raw = self
                    .account
                    .as_deref()
                    .or_else(|| self.data.object.get("id").and_then(serde_json::Value::as_str))
                    .ok_or_else(|| {
                        WebhookError::InvalidPayload("event carries no account ID".to_string())
                    })?;
                let account_id = AccountId::parse(raw).map_err(|e| {
                    WebhookError::InvalidPayload(format!("account ID '{raw}': {e}"))
                })?;
                Ok(EventKind::ApplicationAuthorized { account_id })
            }
            other => Ok(EventKind::Other(other.to_string())),
        }
    }
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    WebhookError::InvalidSignature("Invalid timestamp".to_string())
                })?);
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| WebhookError::InvalidSignature("Missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature(
            "No v1 signature in header".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Compute the `v1` signature for a payload at a given timestamp.
///
/// # Errors
///
/// Returns `WebhookError::InvalidSignature` if the secret cannot key the HMAC.
pub fn compute_signature(
    payload: &str,
    secret: &SecretString,
    timestamp: i64,
) -> Result<String, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(e.to_string()))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// Returns `WebhookError::InvalidSignature` if the header is malformed, the
/// timestamp is outside `tolerance`, or no `v1` signature matches.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &SecretString,
    tolerance: Duration,
    now: i64,
) -> Result<(), WebhookError> {
    let parsed = parse_header(header)?;

    if now.abs_diff(parsed.timestamp) > tolerance.as_secs() {
        return Err(WebhookError::InvalidSignature(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    let expected = compute_signature(payload, secret, parsed.timestamp)?;
    if !parsed
        .signatures
        .iter()
        .any(|sig| constant_time_compare(&expected, sig))
    {
        return Err(WebhookError::InvalidSignature(
            "No signatures found matching the expected signature".to_string(),
        ));
    }

    debug!("Stripe signature verified");
    Ok(())
}

/// Verify the signature, then parse the event envelope.
///
/// # Errors
///
/// Returns `WebhookError::InvalidSignature` on any verification failure and
/// `WebhookError::InvalidPayload` if a verified body is not an event.
#[instrument(skip_all)]
pub fn construct_event(
    payload: &str,
    header: &str,
    secret: &SecretString,
    tolerance: Duration,
) -> Result<Event, WebhookError> {
    verify_signature(payload, header, secret, tolerance, chrono::Utc::now().timestamp())?;
    serde_json::from_str(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
