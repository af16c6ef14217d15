//! Domain models for the coach store.

pub mod coach;

pub use coach::{Coach, CoachUpsert};
