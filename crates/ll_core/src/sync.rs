//! Client side of score reconciliation.
//!
//! Unsynced local records go out as one batch. Dates are flagged synced only after the
//! server confirms the whole batch; on any failure nothing is flagged and the same
//! batch goes out again on the next attempt.

use crate::app_error::{AppError, AppResult};
use crate::progress_store::{LocalActivityRecord, LocalProgressStore};
use crate::sync_endpoint::{SyncEntryV1, SyncScoreRequestV1};
use crate::sync_transport::SyncTransport;
use crate::types::{DateKey, Identity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcomeV1 {
    pub target: String,
    pub attempted: usize,
    pub synced_dates: Vec<DateKey>,
}

impl From<&LocalActivityRecord> for SyncEntryV1 {
    fn from(record: &LocalActivityRecord) -> Self {
        SyncEntryV1 {
            date: record.date,
            score: record.score,
            time_taken: record.time_taken,
            difficulty: record.difficulty.clone(),
        }
    }
}

pub fn build_sync_request(records: &[LocalActivityRecord]) -> SyncScoreRequestV1 {
    SyncScoreRequestV1 {
        entries: records.iter().map(SyncEntryV1::from).collect(),
    }
}

pub fn sync_unsynced(
    store: &LocalProgressStore,
    transport: &dyn SyncTransport,
    identity: &Identity,
) -> AppResult<SyncOutcomeV1> {
    let target = transport.target();
    let unsynced = store.list_unsynced()?;
    if unsynced.is_empty() {
        tracing::debug!(%target, "nothing to sync");
        return Ok(SyncOutcomeV1 {
            target,
            attempted: 0,
            synced_dates: Vec::new(),
        });
    }

    let request = build_sync_request(&unsynced);
    tracing::info!(%target, records = request.entries.len(), "syncing records");
    let ack = transport.submit(identity, &request)?;

    if !ack.success || ack.count != request.entries.len() {
        return Err(AppError::new(
            "LL_SYNC_UNCONFIRMED",
            "sync",
            "server did not confirm the full batch",
            true,
            serde_json::json!({
                "sent": request.entries.len(),
                "acknowledged": ack.count,
                "success": ack.success,
            }),
        ));
    }

    let synced_dates: Vec<DateKey> = request.entries.iter().map(|e| e.date).collect();
    store.mark_synced(&synced_dates)?;
    tracing::info!(%target, records = synced_dates.len(), "synced records");

    Ok(SyncOutcomeV1 {
        target,
        attempted: request.entries.len(),
        synced_dates,
    })
}
