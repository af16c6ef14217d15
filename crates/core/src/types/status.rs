//! Onboarding and payout status types.

use serde::{Deserialize, Serialize};

/// Remote account state as last reported by Stripe.
///
/// Both flags always travel together: a refresh overwrites the pair, never
/// one without the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    /// Stripe's `details_submitted` flag.
    pub details_submitted: bool,
    /// Stripe's `payouts_enabled` flag.
    pub payouts_enabled: bool,
}

impl AccountStatus {
    /// Create a status from the two remote flags.
    #[must_use]
    pub const fn new(details_submitted: bool, payouts_enabled: bool) -> Self {
        Self {
            details_submitted,
            payouts_enabled,
        }
    }

    /// Whether the coach can actually receive payouts: details submitted and
    /// payouts enabled.
    #[must_use]
    pub const fn onboarding_complete(&self) -> bool {
        self.details_submitted && self.payouts_enabled
    }

    /// The onboarding status a registration reports for this remote state.
    #[must_use]
    pub const fn onboarding_status(&self) -> OnboardingStatus {
        if self.details_submitted {
            OnboardingStatus::Complete
        } else {
            OnboardingStatus::Incomplete
        }
    }
}

/// Externally visible onboarding state of a coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    /// Stripe reports the account details as submitted.
    Complete,
    /// A Stripe account exists but onboarding has not finished.
    Incomplete,
    /// A Stripe account exists but its state could not be fetched.
    Unknown,
    /// No coach (or no Stripe account) exists for the email.
    NotRegistered,
}

impl OnboardingStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Unknown => "unknown",
            Self::NotRegistered => "not_registered",
        }
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OnboardingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "incomplete" => Ok(Self::Incomplete),
            "unknown" => Ok(Self::Unknown),
            "not_registered" => Ok(Self::NotRegistered),
            _ => Err(format!("invalid onboarding status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_onboarding_complete_requires_both_flags() {
        assert!(!AccountStatus::new(false, false).onboarding_complete());
        assert!(!AccountStatus::new(true, false).onboarding_complete());
        assert!(!AccountStatus::new(false, true).onboarding_complete());
        assert!(AccountStatus::new(true, true).onboarding_complete());
    }

    #[test]
    fn test_onboarding_status_follows_details_submitted() {
        assert_eq!(
            AccountStatus::new(true, false).onboarding_status(),
            OnboardingStatus::Complete
        );
        assert_eq!(
            AccountStatus::new(false, true).onboarding_status(),
            OnboardingStatus::Incomplete
        );
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OnboardingStatus::NotRegistered).unwrap(),
            "\"not_registered\""
        );
        assert_eq!(
            "incomplete".parse::<OnboardingStatus>().unwrap(),
            OnboardingStatus::Incomplete
        );
        assert!("pending".parse::<OnboardingStatus>().is_err());
    }
}
