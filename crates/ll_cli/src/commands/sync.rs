use super::shared::{print_json, resolve_identity, resolve_path};
use crate::cli::IdentityArgs;
use ll_core::app_error::AppResult;
use ll_core::config::AppConfig;
use ll_core::progress_store::LocalProgressStore;
use ll_core::sync_transport::transport_for_target;
use ll_core::sync_trigger::{SyncTrigger, TriggerEvent, TriggerOutcome};
use std::sync::Arc;

/// Announces the identity to a fresh trigger, which is exactly the sign-in firing.
/// A failed sync is reported in the output but is not a command failure.
pub fn run_sync(
    config: &AppConfig,
    local_db: Option<String>,
    target: Option<String>,
    identity: IdentityArgs,
) -> AppResult<()> {
    let target = target.unwrap_or_else(|| config.storage.server_db_path.display().to_string());
    let transport = transport_for_target(&target)?;
    let store = Arc::new(LocalProgressStore::open(&resolve_path(
        local_db,
        &config.storage.local_db_path,
    ))?);

    let mut trigger = SyncTrigger::new(Arc::clone(&store), Arc::from(transport));
    let outcome = trigger.handle(TriggerEvent::IdentityChanged(resolve_identity(identity)));
    let pending = store.list_unsynced()?.len();
    store.close()?;

    let mut body = match outcome {
        TriggerOutcome::Synced(outcome) => serde_json::json!({
            "status": "synced",
            "target": outcome.target,
            "synced_dates": outcome.synced_dates,
        }),
        TriggerOutcome::Skipped(reason) => serde_json::json!({
            "status": "skipped",
            "reason": format!("{:?}", reason),
        }),
        TriggerOutcome::Failed { code } => serde_json::json!({
            "status": "failed",
            "code": code,
        }),
    };
    body["pending"] = serde_json::json!(pending);
    print_json(&body);
    Ok(())
}

pub fn run_status(config: &AppConfig, local_db: Option<String>) -> AppResult<()> {
    let store = LocalProgressStore::open(&resolve_path(local_db, &config.storage.local_db_path))?;
    let all = store.list_all()?;
    let unsynced = store.list_unsynced()?;
    let local_db = store.path().display().to_string();
    store.close()?;
    print_json(&serde_json::json!({
        "local_db": local_db,
        "records": all.len(),
        "unsynced": unsynced.len(),
        "unsynced_dates": unsynced.iter().map(|r| r.date).collect::<Vec<_>>(),
    }));
    Ok(())
}
