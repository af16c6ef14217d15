//! Coach persistence.
//!
//! # Database: `coachlink`
//!
//! ## Tables
//!
//! - `coach` - One row per coach, unique on `email` and `external_account_id`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p coachlink-cli -- migrate
//! ```
//!
//! Two [`CoachStore`] implementations exist: [`PgCoachStore`] for deployments
//! and [`InMemoryCoachStore`] for local development and tests.

pub mod coaches;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use coachlink_core::{AccountId, Email};

use crate::models::{Coach, CoachUpsert};

pub use coaches::PgCoachStore;
pub use memory::InMemoryCoachStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., an account ID bound to another coach).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Keyed persistence for coaches.
///
/// `upsert` is the only mutation. Concurrent upserts for the same email are
/// last-writer-wins.
#[async_trait]
pub trait CoachStore: Send + Sync {
    /// Find the coach registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be reached.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Coach>, RepositoryError>;

    /// Find the coach bound to a Stripe account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be reached.
    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Coach>, RepositoryError>;

    /// Insert or update the coach keyed by `upsert.email`.
    ///
    /// A new coach gets a fresh ID and `created_at`. Every call advances
    /// `updated_at`. An already bound account ID is never replaced.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the account ID belongs to a
    /// different coach, or `RepositoryError::Database` if the store fails.
    async fn upsert(&self, upsert: CoachUpsert) -> Result<Coach, RepositoryError>;

    /// Every stored coach, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be reached.
    async fn list_all(&self) -> Result<Vec<Coach>, RepositoryError>;

    /// Cheap round trip used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be reached.
    async fn health_check(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
