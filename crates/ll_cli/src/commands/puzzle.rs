use super::shared::{print_json, resolve_date, resolve_identity, resolve_path};
use crate::cli::IdentityArgs;
use ll_core::app_error::AppResult;
use ll_core::config::AppConfig;
use ll_core::db::{now_ms, open_server_db};
use ll_core::provisioning::load_home_view;
use ll_core::puzzle::generate_daily_puzzle;

pub fn run_today(
    config: &AppConfig,
    server_db: Option<String>,
    date: Option<String>,
    identity: IdentityArgs,
) -> AppResult<()> {
    let date = resolve_date(date.as_deref())?;
    let conn = open_server_db(&resolve_path(server_db, &config.storage.server_db_path))?;
    let identity = resolve_identity(identity);
    let view = load_home_view(&conn, identity.as_ref(), &date, now_ms(), generate_daily_puzzle)?;
    print_json(&view);
    Ok(())
}
