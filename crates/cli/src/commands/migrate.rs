//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! coachlink-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `COACHLINK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Server migrations: `crates/server/migrations/`
//!
//! ```text
//! migrations/
//! └── 20260101000001_create_coach.sql
//! ```

use super::{CommandError, database_url};

/// Run the server's database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the URL is missing, the connection fails, or a
/// migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to coachlink database...");
    let pool = coachlink_server::db::create_pool(&database_url).await?;

    tracing::info!("Running coachlink migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Coachlink migrations complete!");
    Ok(())
}
