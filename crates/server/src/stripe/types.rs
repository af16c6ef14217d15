//! Stripe request and response types.
//!
//! Only the fields this service reads are modelled; everything else in
//! Stripe's payloads is ignored.

use serde::Deserialize;

use coachlink_core::{AccountStatus, Email};

/// Connected-account capability to request at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Receive transfers from the platform.
    Transfers,
}

impl Capability {
    /// Stripe's name for the capability.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transfers => "transfers",
        }
    }
}

/// Parameters for `POST /v1/accounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountParams {
    pub email: Email,
    /// Two-letter country code.
    pub country: String,
    pub capabilities: Vec<Capability>,
}

impl CreateAccountParams {
    /// An Express account that can receive transfers.
    #[must_use]
    pub fn express(email: Email, country: impl Into<String>) -> Self {
        Self {
            email,
            country: country.into(),
            capabilities: vec![Capability::Transfers],
        }
    }

    /// Form-encoded body in Stripe's bracket notation.
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("type".to_string(), "express".to_string()),
            ("email".to_string(), self.email.to_string()),
            ("country".to_string(), self.country.clone()),
        ];
        form.extend(self.capabilities.iter().map(|c| {
            (
                format!("capabilities[{}][requested]", c.as_str()),
                "true".to_string(),
            )
        }));
        form
    }
}

/// A Stripe connected account, as returned by the API or embedded in events.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
}

impl Account {
    /// The pair of flags mirrored onto the coach.
    #[must_use]
    pub const fn status(&self) -> AccountStatus {
        AccountStatus::new(self.details_submitted, self.payouts_enabled)
    }
}

/// Response of the account-link and login-link endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct LinkResponse {
    pub url: String,
}

/// Stripe's error envelope: `{"error": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_express_params_request_transfers() {
        let params = CreateAccountParams::express(Email::parse("a@x.com").unwrap(), "US");
        let form = params.to_form();

        assert!(form.contains(&("type".to_string(), "express".to_string())));
        assert!(form.contains(&("email".to_string(), "a@x.com".to_string())));
        assert!(form.contains(&("country".to_string(), "US".to_string())));
        assert!(form.contains(&(
            "capabilities[transfers][requested]".to_string(),
            "true".to_string()
        )));
        assert_eq!(form.len(), 4);
    }

    #[test]
    fn test_account_missing_flags_default_false() {
        let account: Account = serde_json::from_str(r#"{"id":"acct_1","object":"account"}"#).unwrap();
        assert_eq!(account.status(), AccountStatus::default());
    }

    #[test]
    fn test_account_status_flags() {
        let account: Account = serde_json::from_str(
            r#"{"id":"acct_1","details_submitted":true,"payouts_enabled":false,"charges_enabled":true}"#,
        )
        .unwrap();
        assert_eq!(account.status(), AccountStatus::new(true, false));
    }
}
