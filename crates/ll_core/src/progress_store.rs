//! Device-local progress store.
//!
//! One `activity` row per calendar day, written on puzzle completion with `synced = 0`
//! and flipped to `synced = 1` only after the server confirms the batch. Records carry no
//! identity; identity is attached at sync time.

use crate::app_error::{AppError, AppResult};
use crate::db::open_local_db;
use crate::types::DateKey;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalActivityRecord {
    pub date: DateKey,
    pub score: i64,
    pub time_taken: i64,
    pub difficulty: String,
    pub synced: bool,
}

/// Owned handle to the local store. Share it behind an `Arc` instead of reopening;
/// every operation holds the handle only for its own duration.
pub struct LocalProgressStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

fn store_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "store", message, true, details)
}

const SELECT_COLUMNS: &str = "SELECT date, score, time_taken, difficulty, synced FROM activity";

type RawRecord = (String, i64, i64, String, bool);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_raw((date, score, time_taken, difficulty, synced): RawRecord) -> AppResult<LocalActivityRecord> {
    Ok(LocalActivityRecord {
        date: DateKey::parse(&date)?,
        score,
        time_taken,
        difficulty,
        synced,
    })
}

impl LocalProgressStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = open_local_db(path)?;
        tracing::debug!(path = %path.display(), "opened local progress store");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Closes the underlying handle. Later operations fail with `LL_STORE_CLOSED`;
    /// closing twice is a no-op.
    pub fn close(&self) -> AppResult<()> {
        let mut slot = self.lock()?;
        if let Some(conn) = slot.take() {
            if let Err((conn, e)) = conn.close() {
                *slot = Some(conn);
                return Err(store_error(
                    "LL_STORE_CLOSE_FAILED",
                    "failed to close local progress store",
                    serde_json::json!({ "error": e.to_string(), "path": self.path }),
                ));
            }
        }
        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| {
            store_error(
                "LL_STORE_POISONED",
                "local progress store lock poisoned",
                serde_json::json!({ "path": self.path }),
            )
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let slot = self.lock()?;
        let conn = slot.as_ref().ok_or_else(|| {
            AppError::new(
                "LL_STORE_CLOSED",
                "store",
                "local progress store is closed",
                false,
                serde_json::json!({ "path": self.path }),
            )
        })?;
        f(conn)
    }

    pub fn save(
        &self,
        date: &DateKey,
        score: i64,
        time_taken: i64,
        difficulty: &str,
    ) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO activity(date, score, time_taken, difficulty, synced)
                 VALUES(?1, ?2, ?3, ?4, 0)
                 ON CONFLICT(date) DO UPDATE SET
                   score=excluded.score,
                   time_taken=excluded.time_taken,
                   difficulty=excluded.difficulty,
                   synced=0",
                params![date.to_string(), score, time_taken, difficulty],
            )
            .map_err(|e| {
                store_error(
                    "LL_STORE_WRITE_FAILED",
                    "failed saving activity record",
                    serde_json::json!({ "error": e.to_string(), "date": date }),
                )
            })?;
            Ok(())
        })
    }

    pub fn get(&self, date: &DateKey) -> AppResult<Option<LocalActivityRecord>> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{} WHERE date=?1", SELECT_COLUMNS))
                .map_err(|e| read_error("failed preparing activity lookup", e))?;
            let mut rows = stmt
                .query_map([date.to_string()], read_raw)
                .map_err(|e| read_error("failed querying activity record", e))?;
            rows.next()
                .transpose()
                .map_err(|e| read_error("failed decoding activity record", e))
        })?;
        raw.map(decode_raw).transpose()
    }

    pub fn list_unsynced(&self) -> AppResult<Vec<LocalActivityRecord>> {
        self.query_records(&format!("{} WHERE synced=0 ORDER BY date", SELECT_COLUMNS))
    }

    pub fn list_all(&self) -> AppResult<Vec<LocalActivityRecord>> {
        self.query_records(&format!("{} ORDER BY date", SELECT_COLUMNS))
    }

    fn query_records(&self, sql: &str) -> AppResult<Vec<LocalActivityRecord>> {
        let raws = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| read_error("failed preparing activity query", e))?;
            let rows = stmt
                .query_map([], read_raw)
                .map_err(|e| read_error("failed querying activity records", e))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| read_error("failed decoding activity records", e))
        })?;
        raws.into_iter().map(decode_raw).collect()
    }

    /// Flags the given dates as synced in one local transaction and returns how many
    /// records changed. Dates without a record are skipped.
    pub fn mark_synced(&self, dates: &[DateKey]) -> AppResult<usize> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(|e| {
                store_error(
                    "LL_STORE_WRITE_FAILED",
                    "failed to begin mark-synced transaction",
                    serde_json::json!({ "error": e.to_string() }),
                )
            })?;
            let mut changed = 0usize;
            for date in dates {
                changed += tx
                    .execute(
                        "UPDATE activity SET synced=1 WHERE date=?1",
                        [date.to_string()],
                    )
                    .map_err(|e| {
                        store_error(
                            "LL_STORE_WRITE_FAILED",
                            "failed marking activity synced",
                            serde_json::json!({ "error": e.to_string(), "date": date }),
                        )
                    })?;
            }
            tx.commit().map_err(|e| {
                store_error(
                    "LL_STORE_WRITE_FAILED",
                    "failed to commit mark-synced transaction",
                    serde_json::json!({ "error": e.to_string() }),
                )
            })?;
            Ok(changed)
        })
    }

    pub fn hints_used(&self, date: &DateKey) -> AppResult<u32> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT hints_used FROM hint_usage WHERE date=?1")
                .map_err(|e| read_error("failed preparing hint usage query", e))?;
            let mut rows = stmt
                .query_map([date.to_string()], |row| row.get::<_, u32>(0))
                .map_err(|e| read_error("failed querying hint usage", e))?;
            Ok(rows
                .next()
                .transpose()
                .map_err(|e| read_error("failed decoding hint usage", e))?
                .unwrap_or(0))
        })
    }

    pub fn set_hints_used(&self, date: &DateKey, hints_used: u32) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO hint_usage(date, hints_used) VALUES(?1, ?2)
                 ON CONFLICT(date) DO UPDATE SET hints_used=excluded.hints_used",
                params![date.to_string(), hints_used],
            )
            .map_err(|e| {
                store_error(
                    "LL_STORE_WRITE_FAILED",
                    "failed saving hint usage",
                    serde_json::json!({ "error": e.to_string(), "date": date }),
                )
            })?;
            Ok(())
        })
    }
}

fn read_error(message: &str, e: rusqlite::Error) -> AppError {
    store_error(
        "LL_STORE_READ_FAILED",
        message,
        serde_json::json!({ "error": e.to_string() }),
    )
}
