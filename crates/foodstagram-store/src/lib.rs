//! foodstagram-store: SQLite persistence for the social graph.
//!
//! This crate is the single read and write point for the relational tables.
//! Loads rebuild a fully linked [`SocialGraph`](foodstagram_core::SocialGraph)
//! inside one read transaction; every mutation, including the user deletion
//! cascade, is one write transaction.

pub mod client;
pub mod mutations;
pub mod queries;
mod schema;
pub mod traits;

pub use client::{SqliteStore, StoreConfig, StoreError};
pub use queries::Table;
pub use traits::SocialStore;
