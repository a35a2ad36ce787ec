//! Idempotent schema bootstrap for the diary store.
//!
//! # Responsibility
//! - Create the `users` and `diary_entries` tables when absent.
//! - Install the trigger that keeps `diary_entries.updated_at` fresh.
//!
//! # Invariants
//! - Every statement is `IF NOT EXISTS`; running the batch twice is a no-op.
//! - Schema changes are additive only. There is no version bookkeeping.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("diary.sql");

/// Tables every repository depends on.
pub const REQUIRED_TABLES: &[&str] = &["users", "diary_entries"];

/// Applies the schema batch inside one transaction.
///
/// # Errors
/// - Returns `DbError::Schema` when any DDL statement fails. Callers must
///   not continue with data access after this error.
pub fn init_schema(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction().map_err(DbError::Schema)?;
    tx.execute_batch(SCHEMA_SQL).map_err(DbError::Schema)?;
    tx.commit().map_err(DbError::Schema)?;
    Ok(())
}

/// Returns whether `table` exists in the connected database.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
