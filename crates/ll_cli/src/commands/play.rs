use super::shared::{print_json, resolve_date, resolve_identity, resolve_path};
use crate::cli::IdentityArgs;
use ll_core::app_error::{AppError, AppResult};
use ll_core::config::AppConfig;
use ll_core::db::{now_ms, open_server_db};
use ll_core::game::{record_win, use_hint_persisted, GameSession, HintOutcome, MoveOutcome};
use ll_core::progress_store::LocalProgressStore;
use ll_core::provisioning::load_home_view;
use ll_core::puzzle::{generate_daily_puzzle, Grid, GRID_SIZE};

/// Parses `1234,4321,2143,3412` (rows separated by `,` or `/`, `0` for blank).
pub fn parse_grid_arg(raw: &str) -> AppResult<Grid> {
    let invalid = || {
        AppError::new(
            "LL_GRID_ARG_INVALID",
            "validation",
            "grid must be four rows of four digits 0-4",
            false,
            serde_json::json!({ "grid": raw }),
        )
    };
    let rows: Vec<&str> = raw.split([',', '/']).map(str::trim).collect();
    if rows.len() != GRID_SIZE {
        return Err(invalid());
    }
    let mut grid = [[0u8; GRID_SIZE]; GRID_SIZE];
    for (r, row) in rows.iter().enumerate() {
        let digits: Vec<u32> = row.chars().filter_map(|ch| ch.to_digit(10)).collect();
        if digits.len() != GRID_SIZE || row.chars().count() != GRID_SIZE {
            return Err(invalid());
        }
        for (c, digit) in digits.into_iter().enumerate() {
            if digit as usize > GRID_SIZE {
                return Err(invalid());
            }
            grid[r][c] = digit as u8;
        }
    }
    Ok(grid)
}

fn open_session(
    config: &AppConfig,
    local_db: Option<String>,
    server_db: Option<String>,
    date: Option<String>,
    identity: IdentityArgs,
) -> AppResult<(LocalProgressStore, GameSession)> {
    let date = resolve_date(date.as_deref())?;
    let conn = open_server_db(&resolve_path(server_db, &config.storage.server_db_path))?;
    let identity = resolve_identity(identity);
    let view = load_home_view(&conn, identity.as_ref(), &date, now_ms(), generate_daily_puzzle)?;
    let store = LocalProgressStore::open(&resolve_path(local_db, &config.storage.local_db_path))?;
    let hints_used = store.hints_used(&date)?;
    let session = GameSession::new(&view, hints_used, config.gameplay.max_hints_per_day);
    Ok((store, session))
}

pub fn run_submit(
    config: &AppConfig,
    local_db: Option<String>,
    server_db: Option<String>,
    date: Option<String>,
    time_taken: Option<i64>,
    identity: IdentityArgs,
    grid: &str,
) -> AppResult<()> {
    let candidate = parse_grid_arg(grid)?;
    let (store, mut session) = open_session(config, local_db, server_db, date, identity)?;
    let outcome = session.fill(&candidate)?;
    let recorded = match outcome {
        MoveOutcome::Won => record_win(&store, &session, &config.gameplay, time_taken)?,
        _ => false,
    };
    store.close()?;
    print_json(&serde_json::json!({
        "date": session.date(),
        "solved": session.is_won(),
        "already_complete": session.initial_complete(),
        "recorded": recorded,
    }));
    Ok(())
}

pub fn run_hint(
    config: &AppConfig,
    local_db: Option<String>,
    server_db: Option<String>,
    date: Option<String>,
    identity: IdentityArgs,
) -> AppResult<()> {
    let (store, mut session) = open_session(config, local_db, server_db, date, identity)?;
    let outcome = use_hint_persisted(&store, &mut session, &mut rand::thread_rng())?;
    store.close()?;
    let mut body = match outcome {
        HintOutcome::Revealed { row, col, value, .. } => serde_json::json!({
            "status": "revealed",
            "row": row,
            "col": col,
            "value": value,
        }),
        HintOutcome::Exhausted => serde_json::json!({ "status": "exhausted" }),
        HintOutcome::AlreadyWon => serde_json::json!({ "status": "already_won" }),
        HintOutcome::NothingToReveal => serde_json::json!({ "status": "nothing_to_reveal" }),
    };
    body["date"] = serde_json::json!(session.date());
    body["hints_remaining"] = serde_json::json!(session.hints_remaining());
    print_json(&body);
    Ok(())
}
