//! CoachLink server library.
//!
//! Coaches register, get a Stripe Express connected account, complete hosted
//! onboarding, and check their payout status. Stripe webhooks keep the stored
//! status current between checks.
//!
//! The binary in `main.rs` only wires configuration, logging, and the
//! listener; everything else lives here so it can be driven from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;
