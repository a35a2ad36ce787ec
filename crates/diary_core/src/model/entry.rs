//! Diary entry domain model.
//!
//! # Invariants
//! - `owner_id` is the account that created the entry and never changes.
//! - `timestamp_recovered` is `true` only when a stored timestamp was
//!   unreadable and replaced with the read-time clock.

use crate::model::account::AccountId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-generated numeric entry identity.
pub type EntryId = i64;

/// Page size used by `EntryListQuery::default()`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Immutable snapshot of one diary entry handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: EntryId,
    pub owner_id: AccountId,
    pub title: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Set when `created_at` or `updated_at` could not be parsed from storage.
    #[serde(default)]
    pub timestamp_recovered: bool,
}

/// Write payload for create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl EntryDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Rejects drafts with an empty or whitespace-only title.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.title.trim().is_empty() {
            return Err(EntryValidationError::EmptyTitle);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyTitle,
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "entry title cannot be empty"),
        }
    }
}

impl Error for EntryValidationError {}

/// Page and filter options for listing the current user's entries.
///
/// Filters apply before pagination, so consecutive pages of one filter never
/// overlap or skip rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryListQuery {
    /// Rows per page, applied exactly. `0` yields an empty page.
    pub limit: u32,
    pub offset: u32,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
    /// Calendar day of `created_at`.
    pub created_on: Option<NaiveDate>,
}

impl Default for EntryListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            title_contains: None,
            created_on: None,
        }
    }
}

impl EntryListQuery {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    /// Trimmed title filter, `None` when blank.
    pub fn title_filter(&self) -> Option<&str> {
        self.title_contains
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
