//! Coach inspection commands.
//!
//! # Usage
//!
//! ```bash
//! coachlink-cli coaches list
//! coachlink-cli coaches list --json
//! ```

use coachlink_server::db::{CoachStore, PgCoachStore};
use coachlink_server::models::Coach;

use super::{CommandError, database_url};

/// Print every stored coach, oldest first.
///
/// # Errors
///
/// Returns `CommandError` if the database cannot be reached or the output
/// cannot be serialized.
pub async fn list(json: bool) -> Result<(), CommandError> {
    let pool = coachlink_server::db::create_pool(&database_url()?).await?;
    let coaches = PgCoachStore::new(pool).list_all().await?;

    tracing::info!(count = coaches.len(), "Loaded coaches");

    let output = if json {
        serde_json::to_string_pretty(&coaches)?
    } else {
        render_table(&coaches)
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }

    Ok(())
}

fn render_table(coaches: &[Coach]) -> String {
    let mut out = format!(
        "{:<36}  {:<32}  {:<24}  {:<24}  {:<10}  {:<7}",
        "ID", "EMAIL", "NAME", "ACCOUNT", "ONBOARDED", "PAYOUTS"
    );
    for coach in coaches {
        out.push('\n');
        out.push_str(&format!(
            "{:<36}  {:<32}  {:<24}  {:<24}  {:<10}  {:<7}",
            coach.id,
            coach.email,
            coach.name,
            coach
                .external_account_id
                .as_ref()
                .map_or("-", |id| id.as_str()),
            yes_no(coach.onboarding_complete),
            yes_no(coach.payouts_enabled),
        ));
    }
    out
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
