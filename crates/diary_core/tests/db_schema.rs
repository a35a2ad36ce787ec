use diary_core::db::schema::table_exists;
use diary_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_schema() {
    let conn = open_db_in_memory().unwrap();

    assert!(table_exists(&conn, "users").unwrap());
    assert!(table_exists(&conn, "diary_entries").unwrap());
    assert_eq!(trigger_count(&conn, "update_diary_timestamp"), 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute("INSERT INTO users (username, password) VALUES ('alice', 'x');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    let users: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
    assert_eq!(trigger_count(&conn_second, "update_diary_timestamp"), 1);
}

#[test]
fn incompatible_existing_schema_returns_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE diary_entries (id INTEGER PRIMARY KEY, body TEXT);")
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::Schema(_)), "unexpected error: {err}");
}

#[test]
fn trigger_refreshes_updated_at_when_writer_leaves_it_unchanged() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (username, password) VALUES ('alice', 'x');
         INSERT INTO diary_entries (user_id, title, content, created_at, updated_at)
         VALUES (1, 'Day 1', 'hello', '2000-01-01 00:00:00', '2000-01-01 00:00:00');",
    )
    .unwrap();

    conn.execute("UPDATE diary_entries SET content = 'edited' WHERE id = 1;", [])
        .unwrap();
    let refreshed: String = conn
        .query_row("SELECT updated_at FROM diary_entries WHERE id = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_ne!(refreshed, "2000-01-01 00:00:00");

    conn.execute(
        "UPDATE diary_entries SET content = 'again', updated_at = '2001-02-03 04:05:06' WHERE id = 1;",
        [],
    )
    .unwrap();
    let explicit: String = conn
        .query_row("SELECT updated_at FROM diary_entries WHERE id = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(explicit, "2001-02-03 04:05:06");
}

#[test]
fn foreign_keys_reject_entries_without_owner() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO diary_entries (user_id, title, content) VALUES (42, 'orphan', '');",
        [],
    );
    assert!(result.is_err());
}

fn trigger_count(conn: &Connection, name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND name = ?1;",
        [name],
        |row| row.get(0),
    )
    .unwrap()
}
