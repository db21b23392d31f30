//! foodstagram-admin: Operator CLI for a Foodstagram database.
//!
//! Opens the store described by `foodstagram.toml` (or `FOODSTAGRAM__`
//! environment variables), prints graph snapshots as JSON, and runs the
//! account-level mutations an operator needs.

pub mod commands;
pub mod config;
pub mod error;
