use ll_core::progress_store::LocalProgressStore;
use ll_core::types::DateKey;
use std::sync::Arc;
use std::thread;

fn date(raw: &str) -> DateKey {
    DateKey::parse(raw).expect("date")
}

fn open_store(temp: &tempfile::TempDir) -> LocalProgressStore {
    LocalProgressStore::open(&temp.path().join("local.sqlite")).expect("open store")
}

#[test]
fn saved_record_starts_unsynced() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = open_store(&temp);

    store
        .save(&date("2026-01-01"), 100, 60, "Medium")
        .expect("save");

    let record = store.get(&date("2026-01-01")).expect("get").expect("record");
    assert_eq!(record.score, 100);
    assert_eq!(record.time_taken, 60);
    assert_eq!(record.difficulty, "Medium");
    assert!(!record.synced);
    assert!(store.get(&date("2026-01-02")).expect("get").is_none());
}

#[test]
fn overwrite_replaces_fields_and_clears_synced() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = open_store(&temp);
    let day = date("2026-01-01");

    store.save(&day, 80, 90, "Medium").expect("save");
    assert_eq!(store.mark_synced(&[day]).expect("mark"), 1);
    assert!(store.get(&day).expect("get").expect("record").synced);

    store.save(&day, 100, 45, "Hard").expect("resave");
    let records = store.list_all().expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score, 100);
    assert_eq!(records[0].difficulty, "Hard");
    assert!(!records[0].synced);
}

#[test]
fn list_unsynced_is_ordered_and_filtered() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = open_store(&temp);

    store.save(&date("2026-01-03"), 100, 60, "Medium").expect("save");
    store.save(&date("2026-01-01"), 100, 60, "Medium").expect("save");
    store.save(&date("2026-01-02"), 100, 60, "Medium").expect("save");
    store.mark_synced(&[date("2026-01-02")]).expect("mark");

    let dates: Vec<String> = store
        .list_unsynced()
        .expect("unsynced")
        .iter()
        .map(|r| r.date.to_string())
        .collect();
    assert_eq!(dates, vec!["2026-01-01", "2026-01-03"]);
    assert_eq!(store.list_all().expect("all").len(), 3);
}

#[test]
fn mark_synced_ignores_unknown_dates() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = open_store(&temp);
    store.save(&date("2026-01-01"), 100, 60, "Medium").expect("save");

    let changed = store
        .mark_synced(&[date("2026-01-01"), date("2099-12-31")])
        .expect("mark");
    assert_eq!(changed, 1);
    assert!(store.get(&date("2099-12-31")).expect("get").is_none());
    assert!(store.list_unsynced().expect("unsynced").is_empty());
}

#[test]
fn records_survive_reopen() {
    let temp = tempfile::tempdir().expect("tempdir");
    {
        let store = open_store(&temp);
        store.save(&date("2026-02-01"), 50, 120, "Easy").expect("save");
        store.close().expect("close");
    }

    let store = open_store(&temp);
    let record = store.get(&date("2026-02-01")).expect("get").expect("record");
    assert_eq!(record.score, 50);
}

#[test]
fn closed_store_rejects_operations() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = open_store(&temp);
    assert!(store.is_open());

    store.close().expect("close");
    store.close().expect("second close is a no-op");
    assert!(!store.is_open());

    let err = store
        .save(&date("2026-01-01"), 100, 60, "Medium")
        .expect_err("closed store");
    assert_eq!(err.code, "LL_STORE_CLOSED");
    let err = store.list_unsynced().expect_err("closed store");
    assert_eq!(err.code, "LL_STORE_CLOSED");
}

#[test]
fn shared_handle_serves_concurrent_writers() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(open_store(&temp));

    let handles: Vec<_> = (1..=4)
        .map(|day| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let key = date(&format!("2026-03-0{}", day));
                store.save(&key, 100, 60, "Medium").expect("save");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    assert_eq!(store.list_unsynced().expect("unsynced").len(), 4);
}

#[test]
fn hint_usage_defaults_to_zero_and_persists() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = open_store(&temp);
    let day = date("2026-01-01");

    assert_eq!(store.hints_used(&day).expect("hints"), 0);
    store.set_hints_used(&day, 2).expect("set hints");
    assert_eq!(store.hints_used(&day).expect("hints"), 2);
    assert_eq!(store.hints_used(&date("2026-01-02")).expect("hints"), 0);
}

#[test]
fn malformed_date_keys_are_rejected() {
    for raw in [
        "2026-1-01",
        "2026-02-30",
        "20260101",
        "2026-01-01T00:00",
        "2026-01- 1",
        " 2026-1-01",
        "",
    ] {
        let err = DateKey::parse(raw).expect_err("invalid date");
        assert_eq!(err.code, "LL_DATE_INVALID", "{}", raw);
    }
}

#[test]
fn date_keys_round_trip_their_exact_text() {
    let key = DateKey::parse("2026-01-09").expect("date");
    assert_eq!(key.to_string(), "2026-01-09");
}
