//! `PostgreSQL` coach store.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate builds
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use coachlink_core::{AccountId, CoachId, Email};

use super::{CoachStore, RepositoryError};
use crate::models::{Coach, CoachUpsert};

const COACH_COLUMNS: &str = "id, email, name, external_account_id, onboarding_complete, \
                             payouts_enabled, created_at, updated_at";

/// Raw `coachlink.coach` row before domain validation.
#[derive(Debug, sqlx::FromRow)]
struct CoachRow {
    id: Uuid,
    email: String,
    name: String,
    external_account_id: Option<String>,
    onboarding_complete: bool,
    payouts_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CoachRow> for Coach {
    type Error = RepositoryError;

    fn try_from(row: CoachRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let external_account_id = row
            .external_account_id
            .as_deref()
            .map(AccountId::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid account ID in database: {e}"))
            })?;

        Ok(Self {
            id: CoachId::from_uuid(row.id),
            email,
            name: row.name,
            external_account_id,
            onboarding_complete: row.onboarding_complete,
            payouts_enabled: row.payouts_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Coach store backed by the `coachlink.coach` table.
#[derive(Debug, Clone)]
pub struct PgCoachStore {
    pool: PgPool,
}

impl PgCoachStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoachStore for PgCoachStore {
    #[instrument(skip(self), fields(email = %email))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<Coach>, RepositoryError> {
        let row: Option<CoachRow> = sqlx::query_as(&format!(
            "SELECT {COACH_COLUMNS} FROM coachlink.coach WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coach::try_from).transpose()
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Coach>, RepositoryError> {
        let row: Option<CoachRow> = sqlx::query_as(&format!(
            "SELECT {COACH_COLUMNS} FROM coachlink.coach WHERE external_account_id = $1"
        ))
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coach::try_from).transpose()
    }

    #[instrument(skip(self, upsert), fields(email = %upsert.email))]
    async fn upsert(&self, upsert: CoachUpsert) -> Result<Coach, RepositoryError> {
        // updated_at must move forward even when two writes share a clock tick.
        let row: CoachRow = sqlx::query_as(&format!(
            r"
            INSERT INTO coachlink.coach
                (id, email, name, external_account_id, onboarding_complete, payouts_enabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                external_account_id = COALESCE(coach.external_account_id, EXCLUDED.external_account_id),
                onboarding_complete = EXCLUDED.onboarding_complete,
                payouts_enabled = EXCLUDED.payouts_enabled,
                updated_at = GREATEST(clock_timestamp(), coach.updated_at + INTERVAL '1 microsecond')
            RETURNING {COACH_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(upsert.email.as_str())
        .bind(&upsert.name)
        .bind(upsert.external_account_id.as_ref().map(AccountId::as_str))
        .bind(upsert.status.details_submitted)
        .bind(upsert.status.payouts_enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(
                    "account ID already bound to another coach".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

        let coach = Coach::try_from(row)?;
        debug!(coach_id = %coach.id, "Coach upserted");
        Ok(coach)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Coach>, RepositoryError> {
        let rows: Vec<CoachRow> = sqlx::query_as(&format!(
            "SELECT {COACH_COLUMNS} FROM coachlink.coach ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Coach::try_from).collect()
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
