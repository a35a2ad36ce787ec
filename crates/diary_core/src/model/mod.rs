//! Domain model for accounts and diary entries.
//!
//! # Responsibility
//! - Define the value objects exchanged with the presentation layer.
//! - Own boundary validation for required fields.
//! - Own the storage text format for timestamps.
//!
//! # Invariants
//! - Every `DiaryEntry` carries the account id that owns it.
//! - Titles and usernames are never empty once persisted.

pub mod account;
pub mod entry;
pub mod timestamp;
