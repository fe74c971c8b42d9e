//! The two ways today's puzzle comes into existence: the home view loading it on
//! demand, and the scheduled daily job. Both go through [`ensure_daily_puzzle`], so
//! whichever caller reaches the store first defines the canonical row.

use crate::app_error::{AppError, AppResult};
use crate::job_steps::run_step;
use crate::puzzle::{DailyPuzzle, GeneratedPuzzle, Grid};
use crate::server_store::{get_puzzle, get_score, insert_puzzle_if_absent, CanonicalScore};
use crate::types::{DateKey, Identity};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const DAILY_PUZZLE_JOB_ID: &str = "generate-daily-puzzle";
pub const DAILY_PUZZLE_CRON: &str = "0 0 * * *";
pub const STEP_GENERATE: &str = "generate-logic";
pub const STEP_SAVE: &str = "save-to-db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedPuzzle {
    pub puzzle: DailyPuzzle,
    pub created: bool,
}

/// Returns the canonical puzzle for `date`, generating and inserting one only when
/// none exists. Concurrent callers converge on a single row: the insert carries an
/// empty conflict branch, and every caller reads back whatever row won.
pub fn ensure_daily_puzzle<G>(
    conn: &Connection,
    date: &DateKey,
    now_ms: i64,
    generate: G,
) -> AppResult<ProvisionedPuzzle>
where
    G: FnOnce() -> GeneratedPuzzle,
{
    if let Some(puzzle) = get_puzzle(conn, date)? {
        return Ok(ProvisionedPuzzle {
            puzzle,
            created: false,
        });
    }

    let generated = generate();
    let created = insert_puzzle_if_absent(conn, date, &generated, now_ms)?;
    if created {
        tracing::info!(%date, "created daily puzzle");
    } else {
        tracing::debug!(%date, "daily puzzle already provisioned by another caller");
    }

    let puzzle = get_puzzle(conn, date)?.ok_or_else(|| {
        AppError::new(
            "LL_PUZZLE_MISSING",
            "puzzle",
            "daily puzzle missing after conditional insert",
            true,
            serde_json::json!({ "date": date }),
        )
    })?;
    Ok(ProvisionedPuzzle { puzzle, created })
}

/// Everything the home view renders, with the grids already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeView {
    pub date: DateKey,
    pub grid: Grid,
    pub solution: Grid,
    pub today_score: Option<CanonicalScore>,
    pub initial_complete: bool,
}

pub fn load_home_view<G>(
    conn: &Connection,
    identity: Option<&Identity>,
    date: &DateKey,
    now_ms: i64,
    generate: G,
) -> AppResult<HomeView>
where
    G: FnOnce() -> GeneratedPuzzle,
{
    let provisioned = ensure_daily_puzzle(conn, date, now_ms, generate)?;
    let today_score = match identity {
        Some(identity) => get_score(conn, &identity.user_id, date)?,
        None => None,
    };
    Ok(HomeView {
        date: *date,
        grid: provisioned.puzzle.grid,
        solution: provisioned.puzzle.solution,
        initial_complete: today_score.is_some(),
        today_score,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SavedPuzzleStep {
    date: DateKey,
    created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPuzzleJobResultV1 {
    pub success: bool,
    pub run_id: String,
    pub date: DateKey,
    pub created: bool,
    pub replayed_steps: Vec<String>,
}

/// Run id the scheduler should use when it does not supply its own: one run per day,
/// so repeated invocations for the same day resume rather than start over.
pub fn default_run_id(date: &DateKey) -> String {
    format!("{}:{}", DAILY_PUZZLE_JOB_ID, date)
}

/// Scheduled entrypoint. `generate-logic` and `save-to-db` are journaled separately,
/// so a crash between them resumes with the already generated puzzle.
pub fn run_daily_puzzle_job<G>(
    conn: &Connection,
    run_id: &str,
    date: &DateKey,
    now_ms: i64,
    generate: G,
) -> AppResult<DailyPuzzleJobResultV1>
where
    G: FnOnce() -> GeneratedPuzzle,
{
    let mut replayed_steps = Vec::new();

    let generated = run_step(conn, run_id, STEP_GENERATE, now_ms, || Ok(generate()))?;
    if generated.replayed {
        replayed_steps.push(STEP_GENERATE.to_string());
    }

    let generated_puzzle = generated.value;
    let saved = run_step(conn, run_id, STEP_SAVE, now_ms, || {
        let provisioned = ensure_daily_puzzle(conn, date, now_ms, || generated_puzzle)?;
        Ok(SavedPuzzleStep {
            date: provisioned.puzzle.date,
            created: provisioned.created,
        })
    })?;
    if saved.replayed {
        replayed_steps.push(STEP_SAVE.to_string());
    }

    tracing::info!(
        job = DAILY_PUZZLE_JOB_ID,
        run_id,
        date = %saved.value.date,
        created = saved.value.created,
        "daily puzzle job finished"
    );
    Ok(DailyPuzzleJobResultV1 {
        success: true,
        run_id: run_id.to_string(),
        date: saved.value.date,
        created: saved.value.created,
        replayed_steps,
    })
}
