//! Coach domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use coachlink_core::{AccountId, AccountStatus, CoachId, Email};

/// A coach who receives payouts through a Stripe Express account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coach {
    /// Generated on first persistence; never changes.
    pub id: CoachId,
    /// Unique per coach.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Bound once the Stripe account exists; immutable afterwards.
    pub external_account_id: Option<AccountId>,
    /// Mirrors Stripe's `details_submitted` flag.
    pub onboarding_complete: bool,
    /// Mirrors Stripe's `payouts_enabled` flag.
    pub payouts_enabled: bool,
    /// When the coach was first stored.
    pub created_at: DateTime<Utc>,
    /// When the coach was last written.
    pub updated_at: DateTime<Utc>,
}

impl Coach {
    /// The remote flags as last persisted.
    #[must_use]
    pub const fn status(&self) -> AccountStatus {
        AccountStatus::new(self.onboarding_complete, self.payouts_enabled)
    }
}

/// Input to [`CoachStore::upsert`](crate::db::CoachStore::upsert), keyed by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachUpsert {
    pub email: Email,
    pub name: String,
    pub external_account_id: Option<AccountId>,
    pub status: AccountStatus,
}

impl CoachUpsert {
    /// Rewrite an existing coach with a fresh remote status.
    #[must_use]
    pub fn with_status(coach: &Coach, status: AccountStatus) -> Self {
        Self {
            email: coach.email.clone(),
            name: coach.name.clone(),
            external_account_id: coach.external_account_id.clone(),
            status,
        }
    }
}

impl From<&Coach> for CoachUpsert {
    fn from(coach: &Coach) -> Self {
        Self::with_status(coach, coach.status())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn coach() -> Coach {
        let now = Utc::now();
        Coach {
            id: CoachId::generate(),
            email: Email::parse("a@x.com").unwrap(),
            name: "Alex".to_string(),
            external_account_id: Some(AccountId::parse("acct_1").unwrap()),
            onboarding_complete: true,
            payouts_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_reads_both_flags() {
        assert_eq!(coach().status(), AccountStatus::new(true, false));
    }

    #[test]
    fn test_upsert_from_coach_keeps_fields() {
        let coach = coach();
        let upsert = CoachUpsert::from(&coach);
        assert_eq!(upsert.email, coach.email);
        assert_eq!(upsert.external_account_id, coach.external_account_id);
        assert_eq!(upsert.status, coach.status());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(coach()).unwrap();
        assert_eq!(json["externalAccountId"], "acct_1");
        assert_eq!(json["onboardingComplete"], true);
    }
}
