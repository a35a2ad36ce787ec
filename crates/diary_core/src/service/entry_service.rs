//! Entry store: owner-scoped diary CRUD for the current session.
//!
//! # Responsibility
//! - Resolve the session identity before every operation.
//! - Validate drafts and delegate to the entry repository.
//! - Count read-path timestamp recoveries.
//!
//! # Invariants
//! - Identity resolution failure aborts the call before any data access.
//! - "Not found" and "not owned" are the same outcome: `0` / `false`.

use crate::model::account::AccountId;
use crate::model::entry::{DiaryEntry, EntryDraft, EntryId, EntryListQuery, EntryValidationError};
use crate::repo::account_repo::AccountRepository;
use crate::repo::entry_repo::EntryRepository;
use crate::repo::RepoError;
use crate::session::{Session, SessionError};
use chrono::NaiveDateTime;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub enum EntryServiceError {
    Validation(EntryValidationError),
    /// Session could not be resolved to an account.
    Session(SessionError),
    Repo(RepoError),
}

impl Display for EntryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Session(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EntryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<EntryValidationError> for EntryServiceError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SessionError> for EntryServiceError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<RepoError> for EntryServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type EntryServiceResult<T> = Result<T, EntryServiceError>;

/// Entry use-case service bound to one session.
pub struct EntryService<E: EntryRepository, A: AccountRepository> {
    entries: E,
    accounts: A,
    session: Arc<Session>,
    timestamp_recoveries: AtomicU64,
}

impl<E: EntryRepository, A: AccountRepository> EntryService<E, A> {
    pub fn new(entries: E, accounts: A, session: Arc<Session>) -> Self {
        Self {
            entries,
            accounts,
            session,
            timestamp_recoveries: AtomicU64::new(0),
        }
    }

    /// Creates an entry with `created_at = updated_at = timestamp`.
    pub fn create(
        &self,
        title: &str,
        content: &str,
        timestamp: NaiveDateTime,
    ) -> EntryServiceResult<EntryId> {
        let owner = self.resolve_owner("entry_create")?;
        let draft = EntryDraft::new(title, content, timestamp);
        draft.validate()?;

        let id = self.entries.create_entry(owner, &draft)?;
        info!("event=entry_create module=entry status=ok account_id={owner} entry_id={id}");
        Ok(id)
    }

    /// Rewrites title and content of an owned entry.
    ///
    /// Returns the affected row count; `0` means not found or not owned.
    pub fn update(
        &self,
        id: EntryId,
        title: &str,
        content: &str,
        timestamp: NaiveDateTime,
    ) -> EntryServiceResult<usize> {
        let owner = self.resolve_owner("entry_update")?;
        let draft = EntryDraft::new(title, content, timestamp);
        draft.validate()?;

        let changed = self.entries.update_entry(owner, id, &draft)?;
        info!(
            "event=entry_update module=entry status=ok account_id={owner} entry_id={id} affected={changed}"
        );
        Ok(changed)
    }

    /// Deletes an owned entry inside a guarded transaction.
    ///
    /// Returns `false` (after rollback) when nothing matched.
    pub fn delete(&self, id: EntryId) -> EntryServiceResult<bool> {
        let owner = self.resolve_owner("entry_delete")?;
        self.delete_owned(owner, id)
    }

    /// Deletes each id through the same guarded path; returns how many were removed.
    pub fn delete_many(&self, ids: &[EntryId]) -> EntryServiceResult<usize> {
        let owner = self.resolve_owner("entry_delete_many")?;
        let mut deleted = 0;
        for &id in ids {
            if self.delete_owned(owner, id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    pub fn get(&self, id: EntryId) -> EntryServiceResult<Option<DiaryEntry>> {
        let owner = self.resolve_owner("entry_get")?;
        let entry = self.entries.get_entry(owner, id)?;
        if let Some(entry) = entry.as_ref() {
            self.record_recoveries(std::slice::from_ref(entry));
        }
        Ok(entry)
    }

    /// One page of the current user's entries, newest first.
    pub fn list(&self, limit: u32, offset: u32) -> EntryServiceResult<Vec<DiaryEntry>> {
        self.list_filtered(&EntryListQuery::page(limit, offset))
    }

    /// One page of the current user's entries matching `query`'s filters.
    pub fn list_filtered(&self, query: &EntryListQuery) -> EntryServiceResult<Vec<DiaryEntry>> {
        let owner = self.resolve_owner("entry_list")?;
        let entries = self.entries.list_entries(owner, query)?;
        self.record_recoveries(&entries);
        info!(
            "event=entry_list module=entry status=ok account_id={owner} limit={} offset={} returned={}",
            query.limit,
            query.offset,
            entries.len()
        );
        Ok(entries)
    }

    /// Total number of stored timestamps replaced with the read-time clock.
    pub fn timestamp_recoveries(&self) -> u64 {
        self.timestamp_recoveries.load(Ordering::Relaxed)
    }

    fn delete_owned(&self, owner: AccountId, id: EntryId) -> EntryServiceResult<bool> {
        let deleted = self.entries.delete_entry(owner, id)?;
        let status = if deleted { "ok" } else { "not_found" };
        info!("event=entry_delete module=entry status={status} account_id={owner} entry_id={id}");
        Ok(deleted)
    }

    fn resolve_owner(&self, event: &'static str) -> EntryServiceResult<AccountId> {
        self.session
            .resolve_current_user_id(&self.accounts)
            .map_err(|err| {
                warn!("event={event} module=entry status=error error_code=identity_unresolved error={err}");
                err.into()
            })
    }

    fn record_recoveries(&self, entries: &[DiaryEntry]) {
        let recovered = entries
            .iter()
            .filter(|entry| entry.timestamp_recovered)
            .count() as u64;
        if recovered > 0 {
            let total = self
                .timestamp_recoveries
                .fetch_add(recovered, Ordering::Relaxed)
                + recovered;
            warn!(
                "event=timestamp_recovered module=entry status=degraded recovered={recovered} total={total}"
            );
        }
    }
}
