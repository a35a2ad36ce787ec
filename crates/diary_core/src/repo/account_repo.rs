//! Account repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Insert and look up rows in `users`.
//! - Provide the scan and compare-and-set primitives used by the credential sweep.
//!
//! # Invariants
//! - Username uniqueness is enforced by the schema; a violation maps to
//!   `RepoError::DuplicateUsername` and leaves the existing row untouched.
//! - `replace_password_hash` only writes when the stored value still equals
//!   the value the caller read.

use crate::model::account::{Account, AccountId};
use crate::repo::{ensure_tables, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

/// Repository interface for account persistence.
pub trait AccountRepository {
    /// Inserts an account and returns its generated id.
    fn create_account(&self, username: &str, password_hash: &str) -> RepoResult<AccountId>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<Account>>;
    fn find_id_by_username(&self, username: &str) -> RepoResult<Option<AccountId>>;
    /// Returns every account ordered by id.
    fn list_accounts(&self) -> RepoResult<Vec<Account>>;
    /// Swaps `expected` for `replacement` atomically; returns whether a row changed.
    fn replace_password_hash(
        &self,
        id: AccountId,
        expected: &str,
        replacement: &str,
    ) -> RepoResult<bool>;
}

/// SQLite-backed account repository.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    /// Constructs a repository over a connection opened through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_account(&self, username: &str, password_hash: &str) -> RepoResult<AccountId> {
        let inserted = self.conn.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2);",
            params![username, password_hash],
        );

        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::DuplicateUsername(username.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT id, username, password FROM users WHERE username = ?1;",
                [username],
                parse_account_row,
            )
            .optional()?;
        Ok(account)
    }

    fn find_id_by_username(&self, username: &str) -> RepoResult<Option<AccountId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1;",
                [username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, password FROM users ORDER BY id ASC;")?;
        let accounts = stmt
            .query_map([], parse_account_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    fn replace_password_hash(
        &self,
        id: AccountId,
        expected: &str,
        replacement: &str,
    ) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2 AND password = ?3;",
            params![replacement, id, expected],
        )?;
        tx.commit()?;
        Ok(changed == 1)
    }
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        username: row.get("username")?,
        password_hash: row.get("password")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::{AccountRepository, SqliteAccountRepository};
    use crate::db::open_db_in_memory;
    use crate::repo::RepoError;
    use rusqlite::Connection;

    #[test]
    fn duplicate_username_maps_to_semantic_error() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteAccountRepository::try_new(&conn).unwrap();

        repo.create_account("alice", "hash-a").unwrap();
        let err = repo.create_account("alice", "hash-b").unwrap_err();
        assert!(matches!(err, RepoError::DuplicateUsername(name) if name == "alice"));

        let stored = repo.find_by_username("alice").unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash-a");
    }

    #[test]
    fn replace_password_hash_is_compare_and_set() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteAccountRepository::try_new(&conn).unwrap();
        let id = repo.create_account("alice", "plain").unwrap();

        assert!(!repo.replace_password_hash(id, "stale", "new").unwrap());
        assert!(repo.replace_password_hash(id, "plain", "new").unwrap());

        let stored = repo.find_by_username("alice").unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
    }

    #[test]
    fn try_new_rejects_unbootstrapped_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteAccountRepository::try_new(&conn)
            .err()
            .expect("missing users table must be rejected");
        assert!(matches!(err, RepoError::MissingRequiredTable("users")));
    }
}
