//! Durable step journal for scheduled jobs.
//!
//! Each `(run_id, step)` completes at most once. The step output is stored as canonical
//! JSON with its digest; re-running the same run replays the stored output instead of
//! executing the step again.

use crate::app_error::{AppError, AppResult};
use crate::canonical::{blake3_hex_prefixed, to_canonical_string, verify_digest};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput<T> {
    pub value: T,
    pub replayed: bool,
}

fn job_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "job", message, true, details)
}

fn read_checkpoint(conn: &Connection, run_id: &str, step: &str) -> AppResult<Option<(String, String)>> {
    let mut stmt = conn
        .prepare("SELECT output_json, output_hash FROM job_steps WHERE run_id=?1 AND step=?2")
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed preparing step checkpoint query",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id, "step": step }),
            )
        })?;
    let row: Option<(String, String)> = stmt
        .query_map(params![run_id, step], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed querying step checkpoint",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id, "step": step }),
            )
        })?
        .next()
        .transpose()
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed decoding step checkpoint",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id, "step": step }),
            )
        })?;
    Ok(row)
}

fn decode_checkpoint<T: DeserializeOwned>(
    run_id: &str,
    step: &str,
    output_json: &str,
    output_hash: &str,
) -> AppResult<T> {
    verify_digest(output_json.as_bytes(), output_hash).map_err(|e| {
        AppError::new(
            "LL_JOB_CHECKPOINT_CORRUPT",
            "job",
            "step checkpoint failed digest verification",
            false,
            serde_json::json!({ "run_id": run_id, "step": step, "cause": e.code }),
        )
    })?;
    serde_json::from_str(output_json).map_err(|e| {
        AppError::new(
            "LL_JOB_CHECKPOINT_CORRUPT",
            "job",
            "step checkpoint does not decode",
            false,
            serde_json::json!({ "error": e.to_string(), "run_id": run_id, "step": step }),
        )
    })
}

/// Runs `step` for `run_id` once. A completed step replays its stored output. When two
/// runners race on the same step, both return whichever output was recorded first.
pub fn run_step<T, F>(
    conn: &Connection,
    run_id: &str,
    step: &str,
    now_ms: i64,
    f: F,
) -> AppResult<StepOutput<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> AppResult<T>,
{
    if let Some((output_json, output_hash)) = read_checkpoint(conn, run_id, step)? {
        tracing::info!(run_id, step, "replaying completed job step");
        return Ok(StepOutput {
            value: decode_checkpoint(run_id, step, &output_json, &output_hash)?,
            replayed: true,
        });
    }

    let value = f()?;
    let output_json = to_canonical_string(&value)?;
    let output_hash = blake3_hex_prefixed(output_json.as_bytes());
    let inserted = conn
        .execute(
            "INSERT INTO job_steps(run_id, step, output_json, output_hash, completed_at_ms)
             VALUES(?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(run_id, step) DO NOTHING",
            params![run_id, step, output_json, output_hash, now_ms],
        )
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed recording step checkpoint",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id, "step": step }),
            )
        })?;

    if inserted == 1 {
        tracing::debug!(run_id, step, "recorded job step");
        return Ok(StepOutput {
            value,
            replayed: false,
        });
    }

    let (stored_json, stored_hash) = read_checkpoint(conn, run_id, step)?.ok_or_else(|| {
        job_error(
            "LL_JOB_STATE_FAILED",
            "step checkpoint vanished after conflicting insert",
            serde_json::json!({ "run_id": run_id, "step": step }),
        )
    })?;
    Ok(StepOutput {
        value: decode_checkpoint(run_id, step, &stored_json, &stored_hash)?,
        replayed: true,
    })
}

pub fn completed_steps(conn: &Connection, run_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT step FROM job_steps WHERE run_id=?1 ORDER BY completed_at_ms, step")
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed preparing completed steps query",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id }),
            )
        })?;
    let steps = stmt
        .query_map([run_id], |row| row.get::<_, String>(0))
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed listing completed steps",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id }),
            )
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            job_error(
                "LL_JOB_STATE_FAILED",
                "failed decoding completed steps",
                serde_json::json!({ "error": e.to_string(), "run_id": run_id }),
            )
        })?;
    Ok(steps)
}
