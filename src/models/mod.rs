//! Core data models for the draft manager.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod draft;
pub mod object;
