//! CoachLink Core - Shared domain types.
//!
//! This crate provides the value types used across all CoachLink components:
//! - `server` - REST API, Stripe gateway and webhook receiver
//! - `cli` - Command-line tools for migrations and inspection
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database encoding is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Validated wrappers for emails, coach IDs, Stripe account IDs
//!   and onboarding statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
