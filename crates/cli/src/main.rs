//! CoachLink CLI - Database migrations and coach management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! coachlink-cli migrate
//!
//! # List every stored coach
//! coachlink-cli coaches list
//!
//! # Same, as JSON
//! coachlink-cli coaches list --json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `coaches list` - Print stored coaches

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "coachlink-cli")]
#[command(author, version, about = "CoachLink CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect stored coaches
    Coaches {
        #[command(subcommand)]
        action: CoachAction,
    },
}

#[derive(Subcommand)]
enum CoachAction {
    /// List every coach, oldest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Coaches { action } => match action {
            CoachAction::List { json } => commands::coaches::list(json).await?,
        },
    }
    Ok(())
}
