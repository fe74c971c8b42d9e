use crate::cli::IdentityArgs;
use ll_core::app_error::AppResult;
use ll_core::types::{DateKey, Identity};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub fn resolve_path(flag: Option<String>, fallback: &Path) -> PathBuf {
    flag.map(PathBuf::from)
        .unwrap_or_else(|| fallback.to_path_buf())
}

pub fn resolve_date(flag: Option<&str>) -> AppResult<DateKey> {
    match flag {
        Some(raw) => DateKey::parse(raw),
        None => Ok(DateKey::today_utc()),
    }
}

pub fn resolve_identity(args: IdentityArgs) -> Option<Identity> {
    match (args.user_id, args.email) {
        (Some(user_id), Some(email)) => {
            Some(Identity { user_id, email }).filter(Identity::is_valid)
        }
        _ => None,
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}
