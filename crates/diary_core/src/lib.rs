//! Persistence and session core for the diary application.
//! This crate owns the schema, per-user data isolation and credential handling.

pub mod config;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::DiaryConfig;
pub use credential::{hash_password, is_hashed, needs_rehash, verify_password, CredentialError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::account::{Account, AccountId, AccountValidationError};
pub use model::entry::{DiaryEntry, EntryDraft, EntryId, EntryListQuery, EntryValidationError};
pub use repo::account_repo::{AccountRepository, SqliteAccountRepository};
pub use repo::entry_repo::{EntryRepository, SqliteEntryRepository};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::{AccountError, AccountService};
pub use service::credential_migration::{
    migrate_all, spawn_background_migration, MigrationError, MigrationReport, MigrationTask,
};
pub use service::entry_service::{EntryService, EntryServiceError, EntryServiceResult};
pub use session::{Session, SessionError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
