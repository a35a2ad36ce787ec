//! Diary entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD and paginated/filtered listing over `diary_entries`.
//! - Convert between `NaiveDateTime` and the stored timestamp text.
//!
//! # Invariants
//! - Every statement filters by `user_id = owner`; foreign rows are never
//!   read or written, whatever id the caller supplies.
//! - `delete_entry` commits only when exactly one row was removed.
//! - Unreadable stored timestamps are replaced with the read-time clock and
//!   flagged on the returned entry (`timestamp_recovered`).

use crate::db::schema::REQUIRED_TABLES;
use crate::model::account::AccountId;
use crate::model::entry::{DiaryEntry, EntryDraft, EntryId, EntryListQuery};
use crate::model::timestamp::{format_timestamp, now_local, parse_timestamp};
use crate::repo::{ensure_tables, RepoError, RepoResult};
use chrono::NaiveDateTime;
use log::warn;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    content,
    created_at,
    updated_at
FROM diary_entries";

/// Repository interface for owner-scoped entry persistence.
pub trait EntryRepository {
    fn create_entry(&self, owner: AccountId, draft: &EntryDraft) -> RepoResult<EntryId>;
    /// Returns the number of rows changed: `0` when the id is unknown or foreign.
    fn update_entry(&self, owner: AccountId, id: EntryId, draft: &EntryDraft)
        -> RepoResult<usize>;
    /// Returns `true` when the entry existed, was owned and is now gone.
    fn delete_entry(&self, owner: AccountId, id: EntryId) -> RepoResult<bool>;
    fn get_entry(&self, owner: AccountId, id: EntryId) -> RepoResult<Option<DiaryEntry>>;
    /// Lists owned entries, newest `created_at` first, ties broken by id.
    fn list_entries(&self, owner: AccountId, query: &EntryListQuery)
        -> RepoResult<Vec<DiaryEntry>>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Constructs a repository over a connection opened through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(&self, owner: AccountId, draft: &EntryDraft) -> RepoResult<EntryId> {
        let timestamp = format_timestamp(draft.timestamp);
        self.conn.execute(
            "INSERT INTO diary_entries (user_id, title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4);",
            params![owner, draft.title.as_str(), draft.content.as_str(), timestamp],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_entry(
        &self,
        owner: AccountId,
        id: EntryId,
        draft: &EntryDraft,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE diary_entries
             SET
                title = ?1,
                content = ?2,
                updated_at = ?3
             WHERE id = ?4
               AND user_id = ?5;",
            params![
                draft.title.as_str(),
                draft.content.as_str(),
                format_timestamp(draft.timestamp),
                id,
                owner,
            ],
        )?;
        Ok(changed)
    }

    fn delete_entry(&self, owner: AccountId, id: EntryId) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let deleted = tx.execute(
            "DELETE FROM diary_entries WHERE id = ?1 AND user_id = ?2;",
            params![id, owner],
        )?;

        match deleted {
            0 => {
                tx.rollback()?;
                Ok(false)
            }
            1 => {
                tx.commit()?;
                Ok(true)
            }
            other => {
                tx.rollback()?;
                Err(RepoError::InvalidData(format!(
                    "delete of entry {id} matched {other} rows"
                )))
            }
        }
    }

    fn get_entry(&self, owner: AccountId, id: EntryId) -> RepoResult<Option<DiaryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE id = ?1
               AND user_id = ?2;"
        ))?;

        let mut rows = stmt.query(params![id, owner])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }

        Ok(None)
    }

    fn list_entries(
        &self,
        owner: AccountId,
        query: &EntryListQuery,
    ) -> RepoResult<Vec<DiaryEntry>> {
        let mut sql = format!("{ENTRY_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(owner)];

        if let Some(title) = query.title_filter() {
            sql.push_str(" AND instr(lower(title), lower(?)) > 0");
            bind_values.push(Value::Text(title.to_string()));
        }

        if let Some(day) = query.created_on {
            sql.push_str(" AND date(created_at) = ?");
            bind_values.push(Value::Text(day.format("%Y-%m-%d").to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }

        Ok(entries)
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<DiaryEntry> {
    let id: EntryId = row.get("id")?;
    let (created_at, created_recovered) = read_timestamp(row, id, "created_at")?;
    let (updated_at, updated_recovered) = read_timestamp(row, id, "updated_at")?;

    Ok(DiaryEntry {
        id,
        owner_id: row.get("user_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at,
        updated_at,
        timestamp_recovered: created_recovered || updated_recovered,
    })
}

// TIMESTAMP columns have NUMERIC affinity, so a corrupted value may come back
// as an integer or real instead of text.
fn read_timestamp(
    row: &Row<'_>,
    id: EntryId,
    column: &'static str,
) -> RepoResult<(NaiveDateTime, bool)> {
    let parsed = match row.get_ref(column)? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_timestamp),
        _ => None,
    };

    match parsed {
        Some(value) => Ok((value, false)),
        None => {
            warn!(
                "event=timestamp_recovered module=repo status=degraded entry_id={id} column={column}"
            );
            Ok((now_local(), true))
        }
    }
}
