//! SQLite connection management and the shared store handle.

use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;

use foodstagram_core::IntegrityError;

use crate::schema;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query failure, lost connection, or a busy timeout.
    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// A row exists but its contents cannot be turned into an entity.
    #[error("Corrupt {table} row: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Configuration for opening the Foodstagram database.
///
/// Loaded from the `[store]` section of `foodstagram.toml` or
/// `FOODSTAGRAM__STORE__` environment variables by the admin binary.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite database file (default: "foodstagram.db").
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How long a statement waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> String {
    "foodstagram.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Handle over one SQLite connection.
///
/// This is the single point of access for reading and writing the social
/// graph. Reads take `&self` and run in one deferred transaction; writes
/// take `&mut self` and run in one immediate transaction, so a call is
/// either fully applied or not at all.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database described by `config` and apply any
    /// pending migrations.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut conn = Connection::open(&config.database_path)?;
        schema::configure_and_migrate(&mut conn, config.busy_timeout())?;

        tracing::info!(path = %config.database_path, "Opened Foodstagram database");
        Ok(Self { conn })
    }

    /// A fresh in-memory database (for tests and dry runs).
    pub fn in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        schema::configure_and_migrate(&mut conn, StoreConfig::default().busy_timeout())?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection for direct operations.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a read transaction. Under WAL the first read pins a snapshot
    /// that every later query in the transaction sees.
    pub(crate) fn read_txn(&self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Begin a write transaction, taking the write lock up front.
    pub(crate) fn write_txn(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
