use chrono::{NaiveDate, NaiveDateTime};
use diary_core::db::{open_db, open_db_in_memory};
use diary_core::{
    AccountId, AccountService, EntryListQuery, EntryService, EntryServiceError,
    EntryValidationError, Session, SessionError, SqliteAccountRepository, SqliteEntryRepository,
};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

type Entries<'c> = EntryService<SqliteEntryRepository<'c>, SqliteAccountRepository<'c>>;

fn entry_service<'c>(conn: &'c Connection, session: &Arc<Session>) -> Entries<'c> {
    EntryService::new(
        SqliteEntryRepository::try_new(conn).unwrap(),
        SqliteAccountRepository::try_new(conn).unwrap(),
        Arc::clone(session),
    )
}

// Entry tests only need the account row, not a real hash.
fn add_account(conn: &Connection, username: &str) -> AccountId {
    conn.execute(
        "INSERT INTO users (username, password) VALUES (?1, 'unused');",
        [username],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .unwrap()
}

fn entry_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM diary_entries;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_then_list_returns_owned_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let alice = add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    let id = entries.create("Day 1", "hello", at(1, 9, 30)).unwrap();
    let listed = entries.list(10, 0).unwrap();

    assert_eq!(listed.len(), 1);
    let entry = &listed[0];
    assert_eq!(entry.id, id);
    assert_eq!(entry.owner_id, alice);
    assert_eq!(entry.title, "Day 1");
    assert_eq!(entry.content, "hello");
    assert_eq!(entry.created_at, at(1, 9, 30));
    assert_eq!(entry.updated_at, at(1, 9, 30));
    assert!(!entry.timestamp_recovered);
    assert_eq!(entries.get(id).unwrap().as_ref(), Some(entry));
}

#[test]
fn create_rejects_empty_title_without_writing() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    let err = entries.create("  ", "body", at(1, 9, 0)).unwrap_err();
    assert!(matches!(
        err,
        EntryServiceError::Validation(EntryValidationError::EmptyTitle)
    ));
    assert_eq!(entry_count(&conn), 0);
}

#[test]
fn every_operation_requires_a_current_user() {
    let conn = open_db_in_memory().unwrap();
    let alice = add_account(&conn, "alice");
    conn.execute(
        "INSERT INTO diary_entries (user_id, title, content) VALUES (?1, 'kept', '');",
        [alice],
    )
    .unwrap();
    let session = Arc::new(Session::new());
    let entries = entry_service(&conn, &session);

    let no_user = |err: EntryServiceError| {
        matches!(err, EntryServiceError::Session(SessionError::NoCurrentUser))
    };
    assert!(no_user(entries.create("t", "c", at(1, 0, 0)).unwrap_err()));
    assert!(no_user(entries.update(1, "t", "c", at(1, 0, 0)).unwrap_err()));
    assert!(no_user(entries.delete(1).unwrap_err()));
    assert!(no_user(entries.get(1).unwrap_err()));
    assert!(no_user(entries.list(10, 0).unwrap_err()));
    assert_eq!(entry_count(&conn), 1);
}

#[test]
fn stale_session_user_is_not_resolved_to_any_identity() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("ghost");
    let entries = entry_service(&conn, &session);

    let err = entries.create("t", "c", at(1, 0, 0)).unwrap_err();
    assert!(matches!(
        err,
        EntryServiceError::Session(SessionError::UserNotFound(ref name)) if name == "ghost"
    ));
    assert_eq!(entry_count(&conn), 0);
}

#[test]
fn non_owner_cannot_read_update_or_delete() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    add_account(&conn, "bob");
    let session = Arc::new(Session::new());
    let entries = entry_service(&conn, &session);

    session.set_current_user("alice");
    let id = entries.create("Private", "alice only", at(2, 8, 0)).unwrap();

    session.set_current_user("bob");
    assert_eq!(entries.update(id, "Hijacked", "bob", at(3, 8, 0)).unwrap(), 0);
    assert!(!entries.delete(id).unwrap());
    assert_eq!(entries.get(id).unwrap(), None);
    assert!(entries.list(10, 0).unwrap().is_empty());

    session.set_current_user("alice");
    let entry = entries.get(id).unwrap().unwrap();
    assert_eq!(entry.title, "Private");
    assert_eq!(entry.content, "alice only");
    assert_eq!(entry.updated_at, at(2, 8, 0));
}

#[test]
fn update_rewrites_owned_entry_and_reports_missing_as_zero() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    let id = entries.create("Draft", "v1", at(4, 10, 0)).unwrap();
    assert_eq!(entries.update(id, "Final", "v2", at(4, 18, 0)).unwrap(), 1);

    let entry = entries.get(id).unwrap().unwrap();
    assert_eq!(entry.title, "Final");
    assert_eq!(entry.content, "v2");
    assert_eq!(entry.created_at, at(4, 10, 0));
    assert_eq!(entry.updated_at, at(4, 18, 0));

    assert_eq!(entries.update(id + 100, "Nope", "", at(5, 0, 0)).unwrap(), 0);
    assert!(matches!(
        entries.update(id, "", "v3", at(5, 0, 0)).unwrap_err(),
        EntryServiceError::Validation(EntryValidationError::EmptyTitle)
    ));
}

#[test]
fn delete_missing_entry_rolls_back_and_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    let id = entries.create("Keep", "", at(6, 7, 0)).unwrap();
    assert!(!entries.delete(id + 1).unwrap());
    assert_eq!(entry_count(&conn), 1);
    assert!(conn.is_autocommit(), "rolled back transaction must be closed");

    assert!(entries.delete(id).unwrap());
    assert_eq!(entry_count(&conn), 0);
    assert!(!entries.delete(id).unwrap());
}

#[test]
fn delete_many_only_counts_owned_rows() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    add_account(&conn, "bob");
    let session = Arc::new(Session::new());
    let entries = entry_service(&conn, &session);

    session.set_current_user("bob");
    let bobs = entries.create("Bob", "", at(1, 1, 0)).unwrap();

    session.set_current_user("alice");
    let first = entries.create("A1", "", at(1, 2, 0)).unwrap();
    let second = entries.create("A2", "", at(1, 3, 0)).unwrap();

    assert_eq!(entries.delete_many(&[first, bobs, second, 999]).unwrap(), 2);
    assert_eq!(entry_count(&conn), 1);
}

#[test]
fn consecutive_pages_match_one_large_page() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    for index in 0..25u32 {
        // Pairs share a timestamp to exercise the id tie-break.
        let timestamp = at(1 + index / 2, 12, 0);
        entries
            .create(&format!("Entry {index}"), "", timestamp)
            .unwrap();
    }

    let first = entries.list(10, 0).unwrap();
    let second = entries.list(10, 10).unwrap();
    let combined = entries.list(20, 0).unwrap();

    let paged_ids: Vec<_> = first.iter().chain(second.iter()).map(|e| e.id).collect();
    let combined_ids: Vec<_> = combined.iter().map(|e| e.id).collect();
    assert_eq!(paged_ids, combined_ids);
    assert_eq!(paged_ids.iter().collect::<HashSet<_>>().len(), 20);

    for pair in combined.windows(2) {
        assert!((pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id));
    }

    assert_eq!(entries.list(10, 20).unwrap().len(), 5);
    assert!(entries.list(10, 30).unwrap().is_empty());
    assert!(entries.list(0, 0).unwrap().is_empty());
}

#[test]
fn large_page_is_not_truncated() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    for index in 0..150u32 {
        let timestamp = at(1 + index / 24, index % 24, 0);
        entries
            .create(&format!("Entry {index}"), "", timestamp)
            .unwrap();
    }

    let whole = entries.list(150, 0).unwrap();
    let first = entries.list(75, 0).unwrap();
    let second = entries.list(75, 75).unwrap();

    assert_eq!(whole.len(), 150);
    let halves: Vec<_> = first.iter().chain(second.iter()).map(|e| e.id).collect();
    let whole_ids: Vec<_> = whole.iter().map(|e| e.id).collect();
    assert_eq!(halves, whole_ids);
    assert_eq!(entries.list(1000, 140).unwrap().len(), 10);
}

#[test]
fn filtered_listing_matches_title_and_day() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    entries.create("Morning run", "", at(10, 7, 0)).unwrap();
    entries.create("Evening RUN", "", at(10, 19, 0)).unwrap();
    entries.create("Groceries", "", at(10, 12, 0)).unwrap();
    entries.create("Long run", "", at(11, 7, 0)).unwrap();

    let by_title = entries
        .list_filtered(&EntryListQuery {
            title_contains: Some("run".to_string()),
            ..EntryListQuery::page(10, 0)
        })
        .unwrap();
    let titles: Vec<_> = by_title.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["Long run", "Evening RUN", "Morning run"]);

    let by_day = entries
        .list_filtered(&EntryListQuery {
            created_on: NaiveDate::from_ymd_opt(2024, 5, 10),
            ..EntryListQuery::page(10, 0)
        })
        .unwrap();
    assert_eq!(by_day.len(), 3);

    let second_page = entries
        .list_filtered(&EntryListQuery {
            title_contains: Some("RUN".to_string()),
            created_on: NaiveDate::from_ymd_opt(2024, 5, 10),
            ..EntryListQuery::page(1, 1)
        })
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].title, "Morning run");
}

#[test]
fn corrupted_timestamps_are_recovered_flagged_and_counted() {
    let conn = open_db_in_memory().unwrap();
    add_account(&conn, "alice");
    let session = Arc::new(Session::new());
    session.set_current_user("alice");
    let entries = entry_service(&conn, &session);

    let broken = entries.create("Broken", "", at(1, 0, 0)).unwrap();
    let numeric = entries.create("Numeric", "", at(2, 0, 0)).unwrap();
    let healthy = entries.create("Healthy", "", at(3, 0, 0)).unwrap();
    conn.execute(
        "UPDATE diary_entries SET created_at = 'not-a-date', updated_at = 'not-a-date' WHERE id = ?1;",
        [broken],
    )
    .unwrap();
    conn.execute(
        "UPDATE diary_entries SET created_at = 12345, updated_at = 12345 WHERE id = ?1;",
        [numeric],
    )
    .unwrap();

    let listed = entries.list(10, 0).unwrap();
    assert_eq!(listed.len(), 3);
    let recovered: Vec<_> = listed
        .iter()
        .filter(|entry| entry.timestamp_recovered)
        .map(|entry| entry.id)
        .collect();
    assert_eq!(recovered.len(), 2);
    assert!(recovered.contains(&broken));
    assert!(recovered.contains(&numeric));
    assert!(!recovered.contains(&healthy));
    assert_eq!(entries.timestamp_recoveries(), 2);

    entries.get(broken).unwrap();
    assert_eq!(entries.timestamp_recoveries(), 3);
}

#[test]
fn login_on_another_thread_is_visible_to_entry_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    let conn = open_db(&path).unwrap();
    let session = Arc::new(Session::new());

    {
        let accounts = AccountService::new(
            SqliteAccountRepository::try_new(&conn).unwrap(),
            Arc::clone(&session),
        );
        accounts.signup("alice", "secret1").unwrap();
    }

    let login_session = Arc::clone(&session);
    let login_path = path.clone();
    thread::spawn(move || {
        let conn = open_db(&login_path).unwrap();
        let accounts =
            AccountService::new(SqliteAccountRepository::try_new(&conn).unwrap(), login_session);
        accounts.login("alice", "secret1").unwrap();
    })
    .join()
    .unwrap();

    let entries = entry_service(&conn, &session);
    let id = entries.create("From main thread", "", at(1, 0, 0)).unwrap();
    assert_eq!(entries.list(10, 0).unwrap()[0].id, id);
}

#[test]
fn end_to_end_signup_login_create_delete() {
    let conn = open_db_in_memory().unwrap();
    let session = Arc::new(Session::new());
    let accounts = AccountService::new(
        SqliteAccountRepository::try_new(&conn).unwrap(),
        Arc::clone(&session),
    );
    let entries = entry_service(&conn, &session);

    accounts.signup("alice", "secret1").unwrap();
    accounts.login("alice", "secret1").unwrap();
    assert_eq!(session.current_user().as_deref(), Some("alice"));

    let id = entries.create("Day 1", "hello", at(1, 8, 0)).unwrap();
    assert_eq!(id, 1);
    let listed = entries.list(10, 0).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, 1);
    assert_eq!(listed[0].title, "Day 1");

    assert!(accounts.login("bob", "secret1").is_err());
    assert_eq!(session.current_user().as_deref(), Some("alice"));

    assert!(entries.delete(1).unwrap());
    assert!(entries.list(10, 0).unwrap().is_empty());

    accounts.logout();
    assert!(matches!(
        entries.list(10, 0).unwrap_err(),
        EntryServiceError::Session(SessionError::NoCurrentUser)
    ));
}
