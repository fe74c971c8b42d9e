//! 4×4 Latin-square puzzles: generation, validation and the stored JSON form.
//!
//! The generator blanks cells independently, so a generated grid is not guaranteed to
//! have a unique completion. Only the stored `solution` is authoritative.

use crate::app_error::{AppError, AppResult};
use crate::types::DateKey;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const GRID_SIZE: usize = 4;

pub type Grid = [[u8; GRID_SIZE]; GRID_SIZE];

pub const BLANK: u8 = 0;

pub const BASE_SOLUTION: Grid = [[1, 2, 3, 4], [4, 3, 2, 1], [2, 1, 4, 3], [3, 4, 1, 2]];

const BLANK_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPuzzle {
    pub grid: Grid,
    pub solution: Grid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPuzzle {
    pub date: DateKey,
    pub grid: Grid,
    pub solution: Grid,
}

pub fn generate_daily_puzzle() -> GeneratedPuzzle {
    generate_daily_puzzle_with(&mut rand::thread_rng())
}

pub fn generate_daily_puzzle_with<R: Rng + ?Sized>(rng: &mut R) -> GeneratedPuzzle {
    let solution = BASE_SOLUTION;
    let mut grid = solution;
    for row in grid.iter_mut() {
        for cell in row.iter_mut() {
            if rng.gen_bool(BLANK_PROBABILITY) {
                *cell = BLANK;
            }
        }
    }
    GeneratedPuzzle { grid, solution }
}

fn is_permutation(values: [u8; GRID_SIZE]) -> bool {
    let mut seen = [false; GRID_SIZE];
    for v in values {
        if v == 0 || v as usize > GRID_SIZE {
            return false;
        }
        let slot = &mut seen[v as usize - 1];
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}

/// Every row and every column is a permutation of `1..=4`.
pub fn is_latin_square(grid: &Grid) -> bool {
    (0..GRID_SIZE).all(|i| {
        let column = [grid[0][i], grid[1][i], grid[2][i], grid[3][i]];
        is_permutation(grid[i]) && is_permutation(column)
    })
}

/// Every given (non-blank) cell of `grid` matches `solution`.
pub fn grid_agrees_with_solution(grid: &Grid, solution: &Grid) -> bool {
    grid.iter()
        .flatten()
        .zip(solution.iter().flatten())
        .all(|(given, expected)| *given == BLANK || given == expected)
}

fn puzzle_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "puzzle", message, false, details)
}

pub fn validate_puzzle(grid: &Grid, solution: &Grid) -> AppResult<()> {
    if grid.iter().flatten().any(|v| *v as usize > GRID_SIZE) {
        return Err(puzzle_error(
            "LL_PUZZLE_CORRUPT",
            "grid cell outside 0..=4",
            serde_json::json!({ "grid": grid }),
        ));
    }
    if !is_latin_square(solution) {
        return Err(puzzle_error(
            "LL_PUZZLE_CORRUPT",
            "solution is not a latin square",
            serde_json::json!({ "solution": solution }),
        ));
    }
    if !grid_agrees_with_solution(grid, solution) {
        return Err(puzzle_error(
            "LL_PUZZLE_CORRUPT",
            "grid contradicts solution",
            serde_json::json!({ "grid": grid, "solution": solution }),
        ));
    }
    Ok(())
}

pub fn encode_grid(grid: &Grid) -> AppResult<String> {
    serde_json::to_string(grid).map_err(|e| {
        puzzle_error(
            "LL_PUZZLE_ENCODE_FAILED",
            "failed to encode grid",
            serde_json::json!({ "error": e.to_string() }),
        )
    })
}

/// Decodes the stored `[[n,n,n,n],...]` text form, checking shape and cell range.
pub fn decode_grid(raw: &str) -> AppResult<Grid> {
    let rows: Vec<Vec<i64>> = serde_json::from_str(raw).map_err(|e| {
        puzzle_error(
            "LL_PUZZLE_CORRUPT",
            "stored grid is not a json matrix",
            serde_json::json!({ "error": e.to_string(), "raw": raw }),
        )
    })?;
    if rows.len() != GRID_SIZE || rows.iter().any(|row| row.len() != GRID_SIZE) {
        return Err(puzzle_error(
            "LL_PUZZLE_CORRUPT",
            "stored grid is not 4x4",
            serde_json::json!({ "raw": raw }),
        ));
    }

    let mut grid = [[BLANK; GRID_SIZE]; GRID_SIZE];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !(0..=GRID_SIZE as i64).contains(value) {
                return Err(puzzle_error(
                    "LL_PUZZLE_CORRUPT",
                    "stored grid cell outside 0..=4",
                    serde_json::json!({ "row": r, "col": c, "value": value }),
                ));
            }
            grid[r][c] = *value as u8;
        }
    }
    Ok(grid)
}
