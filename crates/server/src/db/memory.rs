//! Process-local coach store.
//!
//! Selected with `COACHLINK_STORE=memory`. Contents do not survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use coachlink_core::{AccountId, CoachId, Email};

use super::{CoachStore, RepositoryError};
use crate::models::{Coach, CoachUpsert};

/// Coach store holding every record in a map keyed by email.
#[derive(Debug, Default)]
pub struct InMemoryCoachStore {
    coaches: RwLock<HashMap<Email, Coach>>,
}

impl InMemoryCoachStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored coaches.
    pub async fn len(&self) -> usize {
        self.coaches.read().await.len()
    }

    /// Whether no coach has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.coaches.read().await.is_empty()
    }
}

/// A timestamp strictly after `previous`, normally just "now".
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

#[async_trait]
impl CoachStore for InMemoryCoachStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Coach>, RepositoryError> {
        Ok(self.coaches.read().await.get(email).cloned())
    }

    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Coach>, RepositoryError> {
        Ok(self
            .coaches
            .read()
            .await
            .values()
            .find(|c| c.external_account_id.as_ref() == Some(account_id))
            .cloned())
    }

    async fn upsert(&self, upsert: CoachUpsert) -> Result<Coach, RepositoryError> {
        let mut coaches = self.coaches.write().await;

        if let Some(account_id) = &upsert.external_account_id
            && coaches.values().any(|c| {
                c.email != upsert.email && c.external_account_id.as_ref() == Some(account_id)
            })
        {
            return Err(RepositoryError::Conflict(
                "account ID already bound to another coach".to_owned(),
            ));
        }

        let coach = match coaches.get(&upsert.email) {
            Some(existing) => Coach {
                id: existing.id,
                email: upsert.email,
                name: upsert.name,
                external_account_id: existing
                    .external_account_id
                    .clone()
                    .or(upsert.external_account_id),
                onboarding_complete: upsert.status.details_submitted,
                payouts_enabled: upsert.status.payouts_enabled,
                created_at: existing.created_at,
                updated_at: next_timestamp(existing.updated_at),
            },
            None => {
                let now = Utc::now();
                Coach {
                    id: CoachId::generate(),
                    email: upsert.email,
                    name: upsert.name,
                    external_account_id: upsert.external_account_id,
                    onboarding_complete: upsert.status.details_submitted,
                    payouts_enabled: upsert.status.payouts_enabled,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        coaches.insert(coach.email.clone(), coach.clone());
        drop(coaches);
        Ok(coach)
    }

    async fn list_all(&self) -> Result<Vec<Coach>, RepositoryError> {
        let mut all: Vec<Coach> = self.coaches.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(all)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
