//! Schema migrations and connection pragmas.
//!
//! Migrations are embedded at compile time and tracked through SQLite's
//! `user_version` pragma by `rusqlite_migration`.

use std::time::Duration;

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::client::StoreError;

/// All schema migrations, applied in order.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!(
        "migrations/001_initial_schema.sql"
    ))])
}

/// Set pragmas and bring the schema up to date.
pub(crate) fn configure_and_migrate(
    conn: &mut Connection,
    busy_timeout: Duration,
) -> Result<(), StoreError> {
    conn.busy_timeout(busy_timeout)?;
    // In-memory databases answer "memory" here; that is fine.
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    migrations()
        .to_latest(conn)
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    tracing::debug!(journal_mode = %mode, "Schema is up to date");
    Ok(())
}
