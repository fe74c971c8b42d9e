use ll_core::provisioning::{ensure_daily_puzzle, load_home_view};
use ll_core::puzzle::{generate_daily_puzzle_with, GeneratedPuzzle, BASE_SOLUTION, BLANK};
use ll_core::server_store::{
    apply_score_batch, count_puzzle_rows, insert_puzzle_if_absent, list_puzzle_dates, ScoreUpsert,
};
use ll_core::db::open_server_db;
use ll_core::types::{DateKey, Identity};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread;

fn date(raw: &str) -> DateKey {
    DateKey::parse(raw).expect("date")
}

fn seeded(seed: u64) -> GeneratedPuzzle {
    generate_daily_puzzle_with(&mut StdRng::seed_from_u64(seed))
}

fn unreachable_generator() -> GeneratedPuzzle {
    panic!("generator must not run when a puzzle already exists")
}

#[test]
fn first_load_creates_and_later_loads_reuse() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-01");

    let first = ensure_daily_puzzle(&conn, &day, 1, || seeded(1)).expect("first");
    assert!(first.created);
    assert_eq!(first.puzzle.date, day);
    assert_eq!(first.puzzle.solution, BASE_SOLUTION);

    let second = ensure_daily_puzzle(&conn, &day, 2, unreachable_generator).expect("second");
    assert!(!second.created);
    assert_eq!(second.puzzle, first.puzzle);
    assert_eq!(count_puzzle_rows(&conn, &day).expect("count"), 1);
}

#[test]
fn existing_puzzle_is_never_replaced() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-01");

    let mut stored = BASE_SOLUTION;
    stored[0] = [1, BLANK, BLANK, BLANK];
    let original = GeneratedPuzzle {
        grid: stored,
        solution: BASE_SOLUTION,
    };
    assert!(insert_puzzle_if_absent(&conn, &day, &original, 1).expect("insert"));
    assert!(!insert_puzzle_if_absent(&conn, &day, &seeded(3), 2).expect("second insert"));

    let provisioned = ensure_daily_puzzle(&conn, &day, 3, unreachable_generator).expect("ensure");
    assert_eq!(provisioned.puzzle.grid, stored);
}

#[test]
fn concurrent_first_loads_converge_on_one_row() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = Arc::new(temp.path().join("server.sqlite"));
    open_server_db(&path).expect("prepare schema");
    let day = date("2026-05-05");

    let handles: Vec<_> = (0..8u64)
        .map(|seed| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let conn = open_server_db(&path).expect("open");
                ensure_daily_puzzle(&conn, &day, seed as i64, || seeded(seed)).expect("ensure")
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .collect();

    let conn = open_server_db(&path).expect("open");
    assert_eq!(count_puzzle_rows(&conn, &day).expect("count"), 1);
    assert_eq!(results.iter().filter(|r| r.created).count(), 1);
    let canonical = &results[0].puzzle;
    assert!(results.iter().all(|r| &r.puzzle == canonical));
}

#[test]
fn invalid_generated_puzzle_is_not_stored() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-01");

    let mut solution = BASE_SOLUTION;
    solution[3] = [1, 2, 3, 4];
    let broken = GeneratedPuzzle {
        grid: [[BLANK; 4]; 4],
        solution,
    };
    let err = ensure_daily_puzzle(&conn, &day, 1, || broken).expect_err("broken puzzle");
    assert_eq!(err.code, "LL_PUZZLE_CORRUPT");
    assert!(list_puzzle_dates(&conn).expect("dates").is_empty());
}

#[test]
fn home_view_reports_completion_only_for_signed_in_user_with_score() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-01");
    let alice = Identity::new("user-alice", "alice@example.com");
    let bob = Identity::new("user-bob", "bob@example.com");

    apply_score_batch(
        &conn,
        &alice,
        &[ScoreUpsert {
            date: day,
            points: 100,
            time_taken: 60,
            difficulty: "Medium".to_string(),
        }],
        1,
    )
    .expect("score");

    let anonymous = load_home_view(&conn, None, &day, 2, || seeded(9)).expect("anonymous");
    assert!(!anonymous.initial_complete);
    assert!(anonymous.today_score.is_none());

    let view = load_home_view(&conn, Some(&alice), &day, 3, unreachable_generator).expect("alice");
    assert!(view.initial_complete);
    let score = view.today_score.expect("score");
    assert_eq!(score.points, 100);
    assert_eq!(score.user_id, "user-alice");
    assert_eq!(view.grid, anonymous.grid);

    let other = load_home_view(&conn, Some(&bob), &day, 4, unreachable_generator).expect("bob");
    assert!(!other.initial_complete);
}

#[test]
fn corrupt_stored_puzzle_fails_home_view() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    conn.execute(
        "INSERT INTO puzzles(date, grid_json, solution_json, created_at_ms)
         VALUES('2026-01-01', '[[1,2]]', '[[1,2,3,4],[4,3,2,1],[2,1,4,3],[3,4,1,2]]', 1)",
        [],
    )
    .expect("insert corrupt row");

    let err = load_home_view(&conn, None, &date("2026-01-01"), 2, unreachable_generator)
        .expect_err("corrupt puzzle");
    assert_eq!(err.code, "LL_PUZZLE_CORRUPT");
}
