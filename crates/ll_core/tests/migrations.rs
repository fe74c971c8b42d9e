use ll_core::db::{
    latest_version, open_local_db, open_server_db, schema_version, LOCAL_MIGRATIONS,
    SERVER_MIGRATIONS,
};
use std::sync::Arc;
use std::thread;

fn table_exists(conn: &rusqlite::Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .expect("sqlite_master query")
        == 1
}

#[test]
fn local_store_migrates_to_latest_schema() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_local_db(&temp.path().join("client/local.sqlite")).expect("open local db");

    assert_eq!(
        schema_version(&conn).expect("schema version"),
        latest_version(LOCAL_MIGRATIONS)
    );
    assert!(table_exists(&conn, "activity"));
    assert!(table_exists(&conn, "hint_usage"));
    assert!(!table_exists(&conn, "scores"));
}

#[test]
fn server_store_migrates_to_latest_schema() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open server db");

    assert_eq!(schema_version(&conn).expect("schema version"), 2);
    assert_eq!(latest_version(SERVER_MIGRATIONS), 2);
    for table in ["users", "scores", "puzzles", "job_steps"] {
        assert!(table_exists(&conn, table), "missing table {}", table);
    }
}

#[test]
fn reopening_does_not_reapply_migrations() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("server.sqlite");
    {
        let conn = open_server_db(&path).expect("first open");
        conn.execute(
            "INSERT INTO users(id, email, created_at_ms) VALUES('u1', 'u1@example.com', 1)",
            [],
        )
        .expect("insert user");
    }

    let conn = open_server_db(&path).expect("second open");
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .expect("count users");
    assert_eq!(users, 1);
}

#[test]
fn newer_schema_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("local.sqlite");
    {
        let conn = open_local_db(&path).expect("open");
        conn.pragma_update(None, "user_version", 99).expect("bump version");
    }

    let err = open_local_db(&path).expect_err("newer schema must fail");
    assert_eq!(err.code, "LL_DB_SCHEMA_INCOMPATIBLE");
    assert_eq!(err.details["current"], 99);
}

#[test]
fn concurrent_first_opens_migrate_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = Arc::new(temp.path().join("server.sqlite"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let conn = open_server_db(&path).expect("open server db");
                schema_version(&conn).expect("schema version")
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("join"), 2);
    }
}
