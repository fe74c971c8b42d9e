//! Server side of score reconciliation (`POST /api/sync-score`).
//!
//! The request framework is external; it hands over the caller identity and the raw
//! body and writes back whatever [`EndpointResponse`] this module returns.

use crate::app_error::{AppError, AppResult};
use crate::db::{now_ms, open_server_db};
use crate::server_store::{apply_score_batch, ScoreUpsert};
use crate::types::{DateKey, Identity};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const SYNC_SCORE_ROUTE: &str = "/api/sync-score";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntryV1 {
    pub date: DateKey,
    pub score: i64,
    pub time_taken: i64,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncScoreRequestV1 {
    pub entries: Vec<SyncEntryV1>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncScoreAckV1 {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: Value,
}

impl EndpointResponse {
    pub fn ok(ack: SyncScoreAckV1) -> Self {
        Self {
            status: 200,
            body: json!({ "success": ack.success, "count": ack.count }),
        }
    }

    pub fn from_error(error: &AppError) -> Self {
        if error.is_auth() {
            Self {
                status: 401,
                body: json!({ "error": "Unauthorized" }),
            }
        } else if error.is_validation() {
            Self {
                status: 400,
                body: json!({ "error": "Invalid payload" }),
            }
        } else {
            Self {
                status: 500,
                body: json!({ "error": "Internal Server Error" }),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<&SyncEntryV1> for ScoreUpsert {
    fn from(entry: &SyncEntryV1) -> Self {
        ScoreUpsert {
            date: entry.date,
            points: entry.score,
            time_taken: entry.time_taken,
            difficulty: entry.difficulty.clone(),
        }
    }
}

/// Shape-checks the body before any domain logic runs. A missing or non-list
/// `entries`, or any malformed entry, is a validation error.
pub fn parse_sync_request(body: &[u8]) -> AppResult<SyncScoreRequestV1> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::invalid_payload(
            "sync payload must be an object with an entries list",
            json!({ "error": e.to_string() }),
        )
    })
}

pub fn sync_score(
    conn: &Connection,
    identity: Option<&Identity>,
    body: &[u8],
    now_ms: i64,
) -> AppResult<SyncScoreAckV1> {
    let identity = identity
        .filter(|identity| identity.is_valid())
        .ok_or_else(AppError::unauthorized)?;
    let request = parse_sync_request(body)?;
    let upserts: Vec<ScoreUpsert> = request.entries.iter().map(ScoreUpsert::from).collect();
    let count = apply_score_batch(conn, identity, &upserts, now_ms)?;
    tracing::info!(user_id = %identity.user_id, count, "applied score batch");
    Ok(SyncScoreAckV1 {
        success: true,
        count,
    })
}

/// Framework-facing handler over an already opened server connection.
pub fn handle_sync_score(
    conn: &Connection,
    identity: Option<&Identity>,
    body: &[u8],
    now_ms: i64,
) -> EndpointResponse {
    match sync_score(conn, identity, body, now_ms) {
        Ok(ack) => EndpointResponse::ok(ack),
        Err(error) => log_and_respond(&error),
    }
}

fn log_and_respond(error: &AppError) -> EndpointResponse {
    let response = EndpointResponse::from_error(error);
    if response.status >= 500 {
        tracing::error!(code = %error.code, details = %error.details, "sync error: {}", error.message);
    } else {
        tracing::warn!(code = %error.code, status = response.status, "sync request rejected");
    }
    response
}

/// One unit of work per request: each call opens its own server connection.
#[derive(Debug, Clone)]
pub struct SyncScoreEndpoint {
    db_path: PathBuf,
}

impl SyncScoreEndpoint {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    pub fn handle(&self, identity: Option<&Identity>, body: &[u8]) -> EndpointResponse {
        let Some(identity) = identity.filter(|identity| identity.is_valid()) else {
            return log_and_respond(&AppError::unauthorized());
        };
        let conn = match open_server_db(&self.db_path) {
            Ok(conn) => conn,
            Err(error) => return log_and_respond(&error),
        };
        handle_sync_score(&conn, Some(identity), body, now_ms())
    }
}
