use ll_core::db::open_server_db;
use ll_core::job_steps::{completed_steps, run_step};
use ll_core::provisioning::{
    default_run_id, ensure_daily_puzzle, run_daily_puzzle_job, DAILY_PUZZLE_CRON,
    DAILY_PUZZLE_JOB_ID, STEP_GENERATE, STEP_SAVE,
};
use ll_core::puzzle::{generate_daily_puzzle_with, GeneratedPuzzle};
use ll_core::server_store::{count_puzzle_rows, get_puzzle};
use ll_core::types::DateKey;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;
use std::sync::{Arc, Barrier};
use std::thread;

fn date(raw: &str) -> DateKey {
    DateKey::parse(raw).expect("date")
}

fn seeded(seed: u64) -> GeneratedPuzzle {
    generate_daily_puzzle_with(&mut StdRng::seed_from_u64(seed))
}

fn unreachable_generator() -> GeneratedPuzzle {
    panic!("generate-logic must replay instead of recomputing")
}

#[test]
fn job_identity_is_stable() {
    assert_eq!(DAILY_PUZZLE_JOB_ID, "generate-daily-puzzle");
    assert_eq!(DAILY_PUZZLE_CRON, "0 0 * * *");
    assert_eq!(
        default_run_id(&date("2026-01-01")),
        "generate-daily-puzzle:2026-01-01"
    );
}

#[test]
fn fresh_run_creates_puzzle_and_journals_both_steps() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-01");
    let run_id = default_run_id(&day);

    let result = run_daily_puzzle_job(&conn, &run_id, &day, 10, || seeded(1)).expect("job");
    assert!(result.success);
    assert!(result.created);
    assert_eq!(result.date, day);
    assert!(result.replayed_steps.is_empty());
    assert_eq!(
        completed_steps(&conn, &run_id).expect("steps"),
        vec![STEP_GENERATE.to_string(), STEP_SAVE.to_string()]
    );
    assert_eq!(get_puzzle(&conn, &day).expect("get").expect("puzzle").grid, seeded(1).grid);
}

#[test]
fn rerun_of_finished_run_replays_everything() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-01");

    run_daily_puzzle_job(&conn, "run-1", &day, 10, || seeded(1)).expect("first run");
    let replay = run_daily_puzzle_job(&conn, "run-1", &day, 20, unreachable_generator)
        .expect("replayed run");
    assert_eq!(
        replay.replayed_steps,
        vec![STEP_GENERATE.to_string(), STEP_SAVE.to_string()]
    );
    assert!(replay.created);
    assert_eq!(count_puzzle_rows(&conn, &day).expect("count"), 1);
}

#[test]
fn crash_after_generate_resumes_with_checkpointed_puzzle() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-02");

    let checkpointed = seeded(5);
    let stored = checkpointed.clone();
    run_step(&conn, "run-crash", STEP_GENERATE, 10, || Ok(stored)).expect("generate step");
    assert!(get_puzzle(&conn, &day).expect("get").is_none());

    let result = run_daily_puzzle_job(&conn, "run-crash", &day, 20, unreachable_generator)
        .expect("resumed run");
    assert_eq!(result.replayed_steps, vec![STEP_GENERATE.to_string()]);
    assert!(result.created);
    assert_eq!(
        get_puzzle(&conn, &day).expect("get").expect("puzzle").grid,
        checkpointed.grid
    );
}

#[test]
fn new_run_for_provisioned_day_keeps_existing_puzzle() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-03");

    let existing = ensure_daily_puzzle(&conn, &day, 1, || seeded(2)).expect("page load");
    let result = run_daily_puzzle_job(&conn, "run-late", &day, 5, || seeded(3)).expect("job");
    assert!(!result.created);
    assert_eq!(
        get_puzzle(&conn, &day).expect("get").expect("puzzle"),
        existing.puzzle
    );
}

#[test]
fn step_body_runs_once_per_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let calls = Cell::new(0);

    for _ in 0..3 {
        let output = run_step(&conn, "run-once", "count", 1, || {
            calls.set(calls.get() + 1);
            Ok(serde_json::json!({ "calls": calls.get() }))
        })
        .expect("step");
        assert_eq!(output.value["calls"], 1);
    }
    assert_eq!(calls.get(), 1);
}

#[test]
fn failing_step_leaves_no_checkpoint() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");

    let err = run_step::<serde_json::Value, _>(&conn, "run-fail", "boom", 1, || {
        Err(ll_core::AppError::internal("step failed"))
    })
    .expect_err("step error");
    assert_eq!(err.code, "LL_INTERNAL_ERROR");
    assert!(completed_steps(&conn, "run-fail").expect("steps").is_empty());
}

#[test]
fn tampered_checkpoint_is_reported_corrupt() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conn = open_server_db(&temp.path().join("server.sqlite")).expect("open");
    let day = date("2026-01-04");

    run_daily_puzzle_job(&conn, "run-t", &day, 1, || seeded(4)).expect("job");
    conn.execute(
        "UPDATE job_steps SET output_json='{\"grid\":[],\"solution\":[]}'
         WHERE run_id='run-t' AND step=?1",
        [STEP_GENERATE],
    )
    .expect("tamper");

    let err = run_daily_puzzle_job(&conn, "run-t", &day, 2, unreachable_generator)
        .expect_err("corrupt checkpoint");
    assert_eq!(err.code, "LL_JOB_CHECKPOINT_CORRUPT");
}

#[test]
fn page_loads_and_scheduled_runs_racing_leave_one_puzzle() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = Arc::new(temp.path().join("server.sqlite"));
    open_server_db(&path).expect("prepare schema");
    let day = date("2026-06-01");
    let barrier = Arc::new(Barrier::new(8));

    // Even callers load the page; odd callers run the job, two of them on the same run id.
    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_server_db(&path).expect("open");
                barrier.wait();
                if i % 2 == 0 {
                    ensure_daily_puzzle(&conn, &day, i as i64, || seeded(i))
                        .expect("page load")
                        .puzzle
                        .grid
                } else {
                    let run_id = if i < 4 {
                        "run-shared".to_string()
                    } else {
                        format!("run-{}", i)
                    };
                    let result = run_daily_puzzle_job(&conn, &run_id, &day, i as i64, || seeded(i))
                        .expect("scheduled run");
                    assert!(result.success);
                    get_puzzle(&conn, &day).expect("get").expect("puzzle").grid
                }
            })
        })
        .collect();
    let grids: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .collect();

    let conn = open_server_db(&path).expect("open");
    assert_eq!(count_puzzle_rows(&conn, &day).expect("count"), 1);
    let stored = get_puzzle(&conn, &day).expect("get").expect("puzzle");
    assert!(grids.iter().all(|grid| *grid == stored.grid));
    let mut shared_steps = completed_steps(&conn, "run-shared").expect("steps");
    shared_steps.sort();
    assert_eq!(
        shared_steps,
        vec![STEP_GENERATE.to_string(), STEP_SAVE.to_string()]
    );
}
