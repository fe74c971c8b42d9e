use crate::app_error::{AppError, AppResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Device-local progress store. The activity store is schema version 1.
pub const LOCAL_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "local_0001_activity",
    sql: include_str!("../migrations/local_0001_activity.sql"),
}];

/// Server-of-record: users, scores, daily puzzles and the job step journal.
pub const SERVER_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "server_0001_init",
        sql: include_str!("../migrations/server_0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "server_0002_job_steps",
        sql: include_str!("../migrations/server_0002_job_steps.sql"),
    },
];

fn db_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "db", message, true, details)
}

pub fn latest_version(migrations: &[Migration]) -> i64 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}

pub fn open_db(db_path: &Path, migrations: &[Migration]) -> AppResult<Connection> {
    open_db_with_timeout(db_path, migrations, DEFAULT_BUSY_TIMEOUT)
}

pub fn open_local_db(db_path: &Path) -> AppResult<Connection> {
    open_db(db_path, LOCAL_MIGRATIONS)
}

pub fn open_server_db(db_path: &Path) -> AppResult<Connection> {
    open_db(db_path, SERVER_MIGRATIONS)
}

pub fn open_db_with_timeout(
    db_path: &Path,
    migrations: &[Migration],
    busy_timeout: Duration,
) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                db_error(
                    "LL_DB_OPEN_FAILED",
                    "failed to create database parent directory",
                    serde_json::json!({ "error": e.to_string(), "path": parent }),
                )
            })?;
        }
    }

    let conn = Connection::open(db_path).map_err(|e| {
        db_error(
            "LL_DB_OPEN_FAILED",
            "failed to open sqlite database",
            serde_json::json!({ "error": e.to_string(), "path": db_path }),
        )
    })?;

    conn.busy_timeout(busy_timeout).map_err(|e| {
        db_error(
            "LL_DB_OPEN_FAILED",
            "failed to set sqlite busy timeout",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;

    conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
        db_error(
            "LL_DB_OPEN_FAILED",
            "failed to enable foreign_keys pragma",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;

    apply_migrations(&conn, migrations)?;
    Ok(conn)
}

pub fn apply_migrations(conn: &Connection, migrations: &[Migration]) -> AppResult<()> {
    let latest = latest_version(migrations);
    let current = schema_version(conn)?;
    if current > latest {
        return Err(AppError::new(
            "LL_DB_SCHEMA_INCOMPATIBLE",
            "db",
            "database schema version is newer than supported",
            false,
            serde_json::json!({ "current": current, "latest": latest }),
        ));
    }

    for migration in migrations.iter().filter(|m| m.version > current) {
        // IMMEDIATE takes the write lock up front so two processes opening a fresh
        // file serialize here instead of failing the lock upgrade.
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(|e| {
            db_error(
                "LL_DB_MIGRATION_FAILED",
                "failed to begin migration transaction",
                serde_json::json!({ "error": e.to_string(), "migration": migration.name }),
            )
        })?;

        if schema_version(&tx)? >= migration.version {
            continue;
        }

        tx.execute_batch(migration.sql).map_err(|e| {
            db_error(
                "LL_DB_MIGRATION_FAILED",
                "failed to apply migration",
                serde_json::json!({ "error": e.to_string(), "migration": migration.name }),
            )
        })?;

        tx.pragma_update(None, "user_version", migration.version)
            .map_err(|e| {
                db_error(
                    "LL_DB_MIGRATION_FAILED",
                    "failed to set schema user_version",
                    serde_json::json!({ "error": e.to_string(), "migration": migration.name }),
                )
            })?;

        tx.commit().map_err(|e| {
            db_error(
                "LL_DB_MIGRATION_FAILED",
                "failed to commit migration transaction",
                serde_json::json!({ "error": e.to_string(), "migration": migration.name }),
            )
        })?;
        tracing::debug!(migration = migration.name, version = migration.version, "applied migration");
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> AppResult<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| {
            AppError::new(
                "LL_DB_SCHEMA_INCOMPATIBLE",
                "db",
                "failed to read schema version",
                false,
                serde_json::json!({ "error": e.to_string() }),
            )
        })
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
