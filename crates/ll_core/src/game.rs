//! Play state for one day's puzzle and the hooks that persist its results locally.

use crate::app_error::{AppError, AppResult};
use crate::config::GameplayConfig;
use crate::progress_store::LocalProgressStore;
use crate::provisioning::HomeView;
use crate::puzzle::{Grid, BLANK, GRID_SIZE};
use crate::types::DateKey;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Ignored,
    Changed { value: u8 },
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintOutcome {
    AlreadyWon,
    Exhausted,
    NothingToReveal,
    Revealed {
        row: usize,
        col: usize,
        value: u8,
        won: bool,
    },
}

#[derive(Debug, Clone)]
pub struct GameSession {
    date: DateKey,
    given: Grid,
    solution: Grid,
    grid: Grid,
    won: bool,
    initial_complete: bool,
    hints_used: u32,
    max_hints: u32,
}

impl GameSession {
    pub fn new(view: &HomeView, hints_used: u32, max_hints: u32) -> Self {
        Self {
            date: view.date,
            given: view.grid,
            solution: view.solution,
            grid: view.grid,
            won: view.initial_complete,
            initial_complete: view.initial_complete,
            hints_used,
            max_hints,
        }
    }

    pub fn date(&self) -> &DateKey {
        &self.date
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn is_won(&self) -> bool {
        self.won
    }

    pub fn initial_complete(&self) -> bool {
        self.initial_complete
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn hints_remaining(&self) -> u32 {
        self.max_hints.saturating_sub(self.hints_used)
    }

    /// Whether the cell was given by the puzzle. Out-of-range cells are not fixed.
    pub fn is_fixed(&self, row: usize, col: usize) -> bool {
        row < GRID_SIZE && col < GRID_SIZE && self.given[row][col] != BLANK
    }

    fn check_win(&mut self) -> bool {
        if self.grid == self.solution {
            self.won = true;
        }
        self.won
    }

    /// Advances an editable cell through 1, 2, 3, 4 and back to 1.
    pub fn cycle_cell(&mut self, row: usize, col: usize) -> MoveOutcome {
        if self.won || row >= GRID_SIZE || col >= GRID_SIZE || self.is_fixed(row, col) {
            return MoveOutcome::Ignored;
        }
        let current = self.grid[row][col];
        let next = if current >= 4 { 1 } else { current + 1 };
        self.grid[row][col] = next;
        if self.check_win() {
            MoveOutcome::Won
        } else {
            MoveOutcome::Changed { value: next }
        }
    }

    /// Writes every editable cell from `candidate`. Fails if `candidate` disagrees
    /// with a given cell or holds values outside 0..=4.
    pub fn fill(&mut self, candidate: &Grid) -> AppResult<MoveOutcome> {
        if self.won {
            return Ok(MoveOutcome::Ignored);
        }
        for r in 0..GRID_SIZE {
            for c in 0..GRID_SIZE {
                let value = candidate[r][c];
                if value as usize > GRID_SIZE || (self.is_fixed(r, c) && value != self.given[r][c]) {
                    return Err(AppError::new(
                        "LL_MOVE_INVALID",
                        "validation",
                        "candidate grid conflicts with the puzzle",
                        false,
                        serde_json::json!({ "row": r, "col": c, "value": value }),
                    ));
                }
            }
        }
        self.grid = *candidate;
        Ok(if self.check_win() {
            MoveOutcome::Won
        } else {
            MoveOutcome::Changed { value: BLANK }
        })
    }

    /// Reveals one editable cell that is empty or wrong, chosen at random.
    pub fn use_hint<R: Rng + ?Sized>(&mut self, rng: &mut R) -> HintOutcome {
        if self.won {
            return HintOutcome::AlreadyWon;
        }
        if self.hints_used >= self.max_hints {
            return HintOutcome::Exhausted;
        }

        let candidates: Vec<(usize, usize)> = (0..GRID_SIZE)
            .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
            .filter(|&(r, c)| !self.is_fixed(r, c) && self.grid[r][c] != self.solution[r][c])
            .collect();
        if candidates.is_empty() {
            return HintOutcome::NothingToReveal;
        }

        let (row, col) = candidates[rng.gen_range(0..candidates.len())];
        let value = self.solution[row][col];
        self.grid[row][col] = value;
        self.hints_used += 1;
        HintOutcome::Revealed {
            row,
            col,
            value,
            won: self.check_win(),
        }
    }

    /// Back to the given cells for another play-through. Spent hints stay spent.
    pub fn reset(&mut self) {
        self.grid = self.given;
        self.won = false;
    }
}

/// Persists a win as today's local record. Skipped when the day was already complete
/// on the server or is already recorded locally, so replays do not re-dirty the record.
/// Returns whether a record was written.
pub fn record_win(
    store: &LocalProgressStore,
    session: &GameSession,
    gameplay: &GameplayConfig,
    time_taken: Option<i64>,
) -> AppResult<bool> {
    if !session.is_won() {
        return Err(AppError::new(
            "LL_GAME_NOT_WON",
            "validation",
            "cannot record a win for an unsolved puzzle",
            false,
            serde_json::json!({ "date": session.date() }),
        ));
    }
    if session.initial_complete() || store.get(session.date())?.is_some() {
        tracing::debug!(date = %session.date(), "win already recorded");
        return Ok(false);
    }
    store.save(
        session.date(),
        gameplay.win_score,
        time_taken.unwrap_or(gameplay.default_time_taken_secs),
        &gameplay.difficulty,
    )?;
    tracing::info!(date = %session.date(), "recorded puzzle completion");
    Ok(true)
}

/// Hint plus persistence of the per-day counter.
pub fn use_hint_persisted<R: Rng + ?Sized>(
    store: &LocalProgressStore,
    session: &mut GameSession,
    rng: &mut R,
) -> AppResult<HintOutcome> {
    let outcome = session.use_hint(rng);
    if matches!(outcome, HintOutcome::Revealed { .. }) {
        store.set_hints_used(session.date(), session.hints_used())?;
    }
    Ok(outcome)
}
