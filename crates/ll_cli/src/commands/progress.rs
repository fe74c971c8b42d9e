use super::shared::{print_json, resolve_date, resolve_path};
use ll_core::app_error::AppResult;
use ll_core::config::AppConfig;
use ll_core::heatmap::build_heatmap;
use ll_core::progress_store::LocalProgressStore;
use ll_core::types::DateKey;

fn open_store(config: &AppConfig, local_db: Option<String>) -> AppResult<LocalProgressStore> {
    LocalProgressStore::open(&resolve_path(local_db, &config.storage.local_db_path))
}

pub fn run_save(
    config: &AppConfig,
    local_db: Option<String>,
    date: &str,
    score: i64,
    time_taken: i64,
    difficulty: &str,
) -> AppResult<()> {
    let date = DateKey::parse(date)?;
    let store = open_store(config, local_db)?;
    store.save(&date, score, time_taken, difficulty)?;
    let saved = store.get(&date)?;
    store.close()?;
    print_json(&saved);
    Ok(())
}

pub fn run_list(config: &AppConfig, local_db: Option<String>, unsynced: bool) -> AppResult<()> {
    let store = open_store(config, local_db)?;
    let records = if unsynced {
        store.list_unsynced()?
    } else {
        store.list_all()?
    };
    store.close()?;
    print_json(&records);
    Ok(())
}

pub fn run_heatmap(
    config: &AppConfig,
    local_db: Option<String>,
    today: Option<String>,
) -> AppResult<()> {
    let today = resolve_date(today.as_deref())?;
    let store = open_store(config, local_db)?;
    let records = store.list_all()?;
    store.close()?;
    let cells: Vec<_> = build_heatmap(&records, &today)
        .into_iter()
        .filter(|cell| cell.level > 0)
        .collect();
    print_json(&serde_json::json!({
        "today": today,
        "active_days": cells.len(),
        "cells": cells,
    }));
    Ok(())
}
