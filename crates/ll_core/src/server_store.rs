//! Server-of-record tables: users, canonical scores and daily puzzles.
//!
//! Rows with concurrent writers are guarded by their unique keys. Scores upsert on
//! `(user_id, date)`; puzzles insert with an empty conflict branch on `date`.

use crate::app_error::{AppError, AppResult};
use crate::puzzle::{decode_grid, encode_grid, validate_puzzle, DailyPuzzle, GeneratedPuzzle};
use crate::types::{DateKey, Identity};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalScore {
    pub user_id: String,
    pub date: DateKey,
    pub points: i64,
    pub time_taken: i64,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreUpsert {
    pub date: DateKey,
    pub points: i64,
    pub time_taken: i64,
    pub difficulty: String,
}

fn server_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "db", message, true, details)
}

fn user_row_missing(conn: &Connection, user_id: &str) -> AppResult<bool> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users WHERE id=?1", [user_id], |row| {
            row.get(0)
        })
        .map_err(|e| {
            server_error(
                "LL_DB_QUERY_FAILED",
                "failed checking user row",
                serde_json::json!({ "error": e.to_string(), "user_id": user_id }),
            )
        })?;
    Ok(count == 0)
}

/// Creates the user row if absent; an existing row is left untouched.
pub fn ensure_user(conn: &Connection, identity: &Identity, now_ms: i64) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users(id, email, created_at_ms) VALUES(?1, ?2, ?3)
         ON CONFLICT(id) DO NOTHING",
        params![identity.user_id, identity.email, now_ms],
    )
    .map_err(|e| {
        server_error(
            "LL_DB_WRITE_FAILED",
            "failed ensuring user row",
            serde_json::json!({ "error": e.to_string(), "user_id": identity.user_id }),
        )
    })?;
    Ok(())
}

/// Applies a whole batch in one transaction: either every entry lands or none does.
/// Returns the number of entries applied.
pub fn apply_score_batch(
    conn: &Connection,
    identity: &Identity,
    entries: &[ScoreUpsert],
    now_ms: i64,
) -> AppResult<usize> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(|e| {
        server_error(
            "LL_DB_TX_FAILED",
            "failed to begin score batch transaction",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;

    if user_row_missing(&tx, &identity.user_id)? {
        tracing::info!(user_id = %identity.user_id, "creating user row on first sync");
    }
    ensure_user(&tx, identity, now_ms)?;

    for entry in entries {
        tx.execute(
            "INSERT INTO scores(user_id, date, points, time_taken, difficulty, updated_at_ms)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, date) DO UPDATE SET
               points=excluded.points,
               time_taken=excluded.time_taken,
               difficulty=excluded.difficulty,
               updated_at_ms=excluded.updated_at_ms",
            params![
                identity.user_id,
                entry.date.to_string(),
                entry.points,
                entry.time_taken,
                entry.difficulty,
                now_ms
            ],
        )
        .map_err(|e| {
            server_error(
                "LL_DB_WRITE_FAILED",
                "failed upserting score",
                serde_json::json!({ "error": e.to_string(), "date": entry.date }),
            )
        })?;
    }

    tx.commit().map_err(|e| {
        server_error(
            "LL_DB_TX_FAILED",
            "failed to commit score batch transaction",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;
    Ok(entries.len())
}

type RawScore = (String, String, i64, i64, String);

fn decode_score((user_id, date, points, time_taken, difficulty): RawScore) -> AppResult<CanonicalScore> {
    Ok(CanonicalScore {
        user_id,
        date: DateKey::parse(&date)?,
        points,
        time_taken,
        difficulty,
    })
}

pub fn get_score(conn: &Connection, user_id: &str, date: &DateKey) -> AppResult<Option<CanonicalScore>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, date, points, time_taken, difficulty FROM scores
             WHERE user_id=?1 AND date=?2",
        )
        .map_err(|e| query_error("failed preparing score lookup", e))?;
    let raw: Option<RawScore> = stmt
        .query_map(params![user_id, date.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .map_err(|e| query_error("failed querying score", e))?
        .next()
        .transpose()
        .map_err(|e| query_error("failed decoding score", e))?;
    raw.map(decode_score).transpose()
}

pub fn list_scores(conn: &Connection, user_id: &str) -> AppResult<Vec<CanonicalScore>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, date, points, time_taken, difficulty FROM scores
             WHERE user_id=?1 ORDER BY date",
        )
        .map_err(|e| query_error("failed preparing score listing", e))?;
    let raws = stmt
        .query_map([user_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .map_err(|e| query_error("failed listing scores", e))?
        .collect::<Result<Vec<RawScore>, _>>()
        .map_err(|e| query_error("failed decoding scores", e))?;
    raws.into_iter().map(decode_score).collect()
}

pub fn count_score_rows(conn: &Connection, user_id: &str, date: &DateKey) -> AppResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM scores WHERE user_id=?1 AND date=?2",
        params![user_id, date.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| query_error("failed counting score rows", e))
}

/// Inserts the puzzle unless one already exists for `date`. Returns whether this call
/// created the row. An existing row is never modified.
pub fn insert_puzzle_if_absent(
    conn: &Connection,
    date: &DateKey,
    generated: &GeneratedPuzzle,
    now_ms: i64,
) -> AppResult<bool> {
    validate_puzzle(&generated.grid, &generated.solution)?;
    let inserted = conn
        .execute(
            "INSERT INTO puzzles(date, grid_json, solution_json, created_at_ms)
             VALUES(?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO NOTHING",
            params![
                date.to_string(),
                encode_grid(&generated.grid)?,
                encode_grid(&generated.solution)?,
                now_ms
            ],
        )
        .map_err(|e| {
            server_error(
                "LL_DB_WRITE_FAILED",
                "failed inserting daily puzzle",
                serde_json::json!({ "error": e.to_string(), "date": date }),
            )
        })?;
    Ok(inserted == 1)
}

pub fn get_puzzle(conn: &Connection, date: &DateKey) -> AppResult<Option<DailyPuzzle>> {
    let mut stmt = conn
        .prepare("SELECT grid_json, solution_json FROM puzzles WHERE date=?1")
        .map_err(|e| query_error("failed preparing puzzle lookup", e))?;
    let raw: Option<(String, String)> = stmt
        .query_map([date.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| query_error("failed querying puzzle", e))?
        .next()
        .transpose()
        .map_err(|e| query_error("failed decoding puzzle row", e))?;

    let Some((grid_json, solution_json)) = raw else {
        return Ok(None);
    };
    let grid = decode_grid(&grid_json)?;
    let solution = decode_grid(&solution_json)?;
    validate_puzzle(&grid, &solution)?;
    Ok(Some(DailyPuzzle {
        date: *date,
        grid,
        solution,
    }))
}

pub fn count_puzzle_rows(conn: &Connection, date: &DateKey) -> AppResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM puzzles WHERE date=?1",
        [date.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| query_error("failed counting puzzle rows", e))
}

/// Dates with a stored puzzle, oldest first.
pub fn list_puzzle_dates(conn: &Connection) -> AppResult<Vec<DateKey>> {
    let mut stmt = conn
        .prepare("SELECT date FROM puzzles ORDER BY date")
        .map_err(|e| query_error("failed preparing puzzle listing", e))?;
    let raws = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| query_error("failed listing puzzles", e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| query_error("failed decoding puzzle dates", e))?;
    raws.iter().map(|raw| DateKey::parse(raw)).collect()
}

fn query_error(message: &str, e: rusqlite::Error) -> AppError {
    server_error(
        "LL_DB_QUERY_FAILED",
        message,
        serde_json::json!({ "error": e.to_string() }),
    )
}
