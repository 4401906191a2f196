// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runner::NullObserver;

fn read_events(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn finish_writes_final_run_end_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = CleanupCoordinator::new();

    let lock = ralph_storage::LockFile::acquire(dir.path(), "f", "ralph/f").unwrap();
    let lock_path = lock.path().to_owned();
    coordinator.register_lock(lock);

    let log = Arc::new(Mutex::new(EventLog::create(&dir.path().join("logs"), 10).unwrap()));
    let log_path = log.lock().path().to_owned();
    log.lock()
        .append(&LogRecord::new(1, RunEvent::Warning { message: "mid-run".to_string() }))
        .unwrap();
    coordinator.register_log(Arc::clone(&log), Arc::new(Mutex::new(NullObserver)));
    coordinator.mark_started(Instant::now());

    coordinator.finish(2, false, Some("interrupted by signal")).await;

    let events = read_events(&log_path);
    let last = events.last().unwrap();
    assert_eq!(last["event"], "run:end");
    assert_eq!(last["success"], false);
    assert_eq!(last["reason"], "interrupted by signal");
    assert!(!lock_path.exists());
}

#[tokio::test]
async fn finish_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = CleanupCoordinator::new();
    let log = Arc::new(Mutex::new(EventLog::create(&dir.path().join("logs"), 10).unwrap()));
    let log_path = log.lock().path().to_owned();
    coordinator.register_log(Arc::clone(&log), Arc::new(Mutex::new(NullObserver)));

    coordinator.finish(1, true, None).await;
    coordinator.finish(2, false, Some("again")).await;
    coordinator.finish(3, false, Some("and again")).await;

    let events = read_events(&log_path);
    let run_ends: Vec<_> = events.iter().filter(|e| e["event"] == "run:end").collect();
    assert_eq!(run_ends.len(), 1);
    assert_eq!(run_ends[0]["success"], true);
    assert!(coordinator.is_finished());
}

#[tokio::test]
async fn finish_with_nothing_registered_is_safe() {
    let coordinator = CleanupCoordinator::new();
    coordinator.finish(1, false, Some("early failure")).await;
    assert!(coordinator.is_finished());
}
