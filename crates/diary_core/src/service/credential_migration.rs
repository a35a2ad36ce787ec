//! One-shot upgrade of legacy plaintext credentials to Argon2 hashes.
//!
//! # Responsibility
//! - Scan every account and hash the rows still holding plaintext.
//! - Run as a named background task with an explicit completion signal.
//!
//! # Invariants
//! - Rows already in a recognized hash format are never rewritten.
//! - Each upgrade is its own compare-and-set transaction: a crash leaves no
//!   half-updated row and a concurrent change is never overwritten.
//! - Re-running the sweep after a complete run changes nothing.

use crate::credential::{hash_password, is_hashed};
use crate::db::open_db;
use crate::repo::account_repo::{AccountRepository, SqliteAccountRepository};
use crate::repo::RepoError;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const MIGRATION_THREAD_NAME: &str = "credential-migration";

#[derive(Debug)]
pub enum MigrationError {
    /// Storage failure while scanning or opening the database.
    Repo(RepoError),
    /// Background thread could not be started.
    Spawn(std::io::Error),
    /// Background thread panicked before reporting.
    Panicked,
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Spawn(err) => write!(f, "failed to start credential migration: {err}"),
            Self::Panicked => write!(f, "credential migration thread panicked"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Spawn(err) => Some(err),
            Self::Panicked => None,
        }
    }
}

impl From<RepoError> for MigrationError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub scanned: usize,
    pub migrated: usize,
    pub already_hashed: usize,
    /// Row changed between scan and write; left as the other writer set it.
    pub changed_concurrently: usize,
    /// Plaintext the hasher refused (e.g. empty); row left untouched.
    pub failed: usize,
}

/// Upgrades every legacy plaintext credential reachable through `accounts`.
///
/// # Errors
/// - `MigrationError::Repo` on storage failure. Rows committed before the
///   failure stay upgraded.
pub fn migrate_all(accounts: &impl AccountRepository) -> Result<MigrationReport, MigrationError> {
    let started_at = Instant::now();
    info!("event=credential_migration module=migration status=start");

    let mut report = MigrationReport::default();
    for account in accounts.list_accounts()? {
        report.scanned += 1;

        if is_hashed(&account.password_hash) {
            report.already_hashed += 1;
            continue;
        }

        let upgraded = match hash_password(&account.password_hash) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(
                    "event=credential_migration module=migration status=skipped account_id={} error={}",
                    account.id, err
                );
                report.failed += 1;
                continue;
            }
        };

        if accounts.replace_password_hash(account.id, &account.password_hash, &upgraded)? {
            report.migrated += 1;
        } else {
            report.changed_concurrently += 1;
        }
    }

    info!(
        "event=credential_migration module=migration status=ok duration_ms={} scanned={} migrated={} already_hashed={} changed_concurrently={} failed={}",
        started_at.elapsed().as_millis(),
        report.scanned,
        report.migrated,
        report.already_hashed,
        report.changed_concurrently,
        report.failed
    );
    Ok(report)
}

/// Handle to a running background sweep.
pub struct MigrationTask {
    handle: JoinHandle<Result<MigrationReport, MigrationError>>,
}

impl MigrationTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the sweep ends and returns its outcome.
    pub fn wait(self) -> Result<MigrationReport, MigrationError> {
        self.handle.join().map_err(|_| MigrationError::Panicked)?
    }
}

/// Starts the sweep on a dedicated thread with its own connection to `db_path`.
pub fn spawn_background_migration(db_path: impl Into<PathBuf>) -> Result<MigrationTask, MigrationError> {
    let db_path = db_path.into();
    let handle = thread::Builder::new()
        .name(MIGRATION_THREAD_NAME.to_string())
        .spawn(move || {
            let outcome = run_on_path(db_path);
            if let Err(err) = outcome.as_ref() {
                error!("event=credential_migration module=migration status=error error={err}");
            }
            outcome
        })
        .map_err(MigrationError::Spawn)?;

    Ok(MigrationTask { handle })
}

fn run_on_path(db_path: PathBuf) -> Result<MigrationReport, MigrationError> {
    let conn = open_db(&db_path).map_err(RepoError::from)?;
    let accounts = SqliteAccountRepository::try_new(&conn)?;
    migrate_all(&accounts)
}
