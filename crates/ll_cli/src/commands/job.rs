use super::shared::{print_json, resolve_date, resolve_path};
use ll_core::app_error::AppResult;
use ll_core::config::AppConfig;
use ll_core::db::{now_ms, open_server_db};
use ll_core::provisioning::{default_run_id, run_daily_puzzle_job};
use ll_core::puzzle::generate_daily_puzzle;

pub fn run_daily_puzzle(
    config: &AppConfig,
    server_db: Option<String>,
    date: Option<String>,
    run_id: Option<String>,
) -> AppResult<()> {
    let date = resolve_date(date.as_deref())?;
    let run_id = run_id.unwrap_or_else(|| default_run_id(&date));
    let conn = open_server_db(&resolve_path(server_db, &config.storage.server_db_path))?;
    let result = run_daily_puzzle_job(&conn, &run_id, &date, now_ms(), generate_daily_puzzle)?;
    print_json(&result);
    Ok(())
}
