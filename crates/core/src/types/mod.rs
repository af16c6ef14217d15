//! Core types for CoachLink.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod email;
pub mod id;
pub mod status;

pub use account::{AccountId, AccountIdError};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
