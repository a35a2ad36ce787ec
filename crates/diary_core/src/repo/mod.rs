//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for accounts and entries.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Entry repositories take the owner id explicitly on every call and put
//!   it in every `WHERE` clause.
//! - Zero affected rows is reported as a count/boolean, never as an error.

use crate::db::schema::table_exists;
use crate::db::DbError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account_repo;
pub mod entry_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for account and entry persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Storage engine or I/O failure.
    Db(DbError),
    /// Unique constraint on `users.username` rejected an insert.
    DuplicateUsername(String),
    /// Connection was not bootstrapped through `db::open_db*`.
    MissingRequiredTable(&'static str),
    /// Persisted state violates a store invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateUsername(username) => write!(f, "username already exists: {username}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table: {table}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
