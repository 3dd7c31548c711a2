use cogex_core::BlockKind;
use cogex_record::{read_log, Row, TrialLogger, MAIN_COLUMNS, WM_COLUMNS};
use serde_json::{json, Value};
use std::io::Write;
use std::process::Command;

const CRASH_LOG_ENV: &str = "COGEX_RECORD_CRASH_LOG";
const CRASH_ROWS: usize = 7;

fn row(columns: &[&str], tag: &str, trial: usize) -> Row {
    let mut row: Row = columns
        .iter()
        .map(|c| (c.to_string(), Value::Null))
        .collect();
    row.insert("block".into(), json!(tag));
    row.insert("participant_id".into(), json!("p-01"));
    row.insert("trial_index".into(), json!(trial));
    row
}

/// Child half of `abort_after_appends_keeps_every_row`.
#[test]
#[ignore]
fn crash_child() {
    let Ok(path) = std::env::var(CRASH_LOG_ENV) else {
        return;
    };
    let mut logger = TrialLogger::open(&path).unwrap();
    for trial in 0..CRASH_ROWS {
        logger
            .append(BlockKind::WorkingMemory, &row(WM_COLUMNS, "wm", trial))
            .unwrap();
    }
    std::process::abort();
}

#[test]
fn abort_after_appends_keeps_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");

    let status = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "crash_child", "--ignored", "--nocapture"])
        .env(CRASH_LOG_ENV, &path)
        .status()
        .unwrap();
    assert!(!status.success(), "child should have aborted");

    let log = read_log(&path).unwrap();
    assert_eq!(log.rows.len(), CRASH_ROWS);
    assert!(!log.torn_tail);
    for (i, row) in log.rows.iter().enumerate() {
        assert_eq!(row.block, BlockKind::WorkingMemory);
        assert_eq!(row.get("trial_index"), Some(&json!(i)));
    }
}

#[test]
fn torn_final_write_is_skipped_on_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");

    let mut logger = TrialLogger::open(&path).unwrap();
    for trial in 0..3 {
        logger
            .append(BlockKind::WorkingMemory, &row(WM_COLUMNS, "wm", trial))
            .unwrap();
    }
    for trial in 0..2 {
        logger
            .append(BlockKind::Relational, &row(MAIN_COLUMNS, "main", trial))
            .unwrap();
    }
    // Killed without close, mid-way through the next line.
    std::mem::forget(logger);
    let mut raw = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap();
    raw.write_all(b"{\"block\":\"main\",\"participant_id\":\"p-0")
        .unwrap();
    drop(raw);

    let log = read_log(&path).unwrap();
    assert!(log.torn_tail);
    assert_eq!(log.rows.len(), 5);
    assert_eq!(log.rows_for(BlockKind::WorkingMemory).count(), 3);
    assert_eq!(log.rows_for(BlockKind::Relational).count(), 2);
}

#[test]
fn malformed_complete_line_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    std::fs::write(&path, "{\"block\":\"wm\"}\n").unwrap();
    let err = read_log(&path).unwrap_err();
    assert!(err.to_string().contains("line 1"), "{err}");
}

#[test]
fn dropped_logger_leaves_readable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    {
        let mut logger = TrialLogger::open(&path).unwrap();
        logger
            .append(BlockKind::WorkingMemory, &row(WM_COLUMNS, "wm", 0))
            .unwrap();
    }
    let log = read_log(&path).unwrap();
    assert_eq!(log.rows.len(), 1);
    assert!(!log.torn_tail);
}
