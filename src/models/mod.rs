//! Core data models for the photo catalog.
//!
//! These entities mirror the `users` and `assets` tables and map onto
//! query results via `sqlx::FromRow`.

pub mod asset;
pub mod user;
