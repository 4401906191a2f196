// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn write_record(dir: &Path, record: &LockRecord) {
    std::fs::write(
        dir.join(LOCK_FILE),
        serde_json::to_vec_pretty(record).unwrap(),
    )
    .unwrap();
}

#[test]
fn acquire_creates_lock_with_current_pid() {
    let dir = tempfile::tempdir().unwrap();
    let lock = LockFile::acquire(dir.path(), "checkout", "ralph/checkout").unwrap();

    let record: LockRecord =
        serde_json::from_slice(&std::fs::read(lock.path()).unwrap()).unwrap();
    assert_eq!(record.pid, std::process::id());
    assert_eq!(record.feature, "checkout");
    assert_eq!(record.branch, "ralph/checkout");
}

#[test]
fn live_holder_blocks_acquisition() {
    let dir = tempfile::tempdir().unwrap();
    // our own PID is alive and recent: this is the re-entry case
    write_record(
        dir.path(),
        &LockRecord {
            pid: std::process::id(),
            started_at: chrono::Utc::now(),
            feature: "other".to_string(),
            branch: "ralph/other".to_string(),
        },
    );

    match LockFile::acquire(dir.path(), "checkout", "ralph/checkout") {
        Err(LockError::Held { pid, feature, .. }) => {
            assert_eq!(pid, std::process::id());
            assert_eq!(feature, "other");
        }
        other => panic!("expected Held, got {other:?}"),
    }
}

#[test]
fn dead_pid_is_stale_and_replaced() {
    let dir = tempfile::tempdir().unwrap();
    // PIDs near the default pid_max are effectively never alive in tests
    write_record(
        dir.path(),
        &LockRecord {
            pid: 4_000_000,
            started_at: chrono::Utc::now(),
            feature: "old".to_string(),
            branch: "ralph/old".to_string(),
        },
    );

    let lock = LockFile::acquire(dir.path(), "checkout", "ralph/checkout").unwrap();
    let record: LockRecord =
        serde_json::from_slice(&std::fs::read(lock.path()).unwrap()).unwrap();
    assert_eq!(record.pid, std::process::id());
}

#[test]
fn live_but_ancient_lock_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    write_record(
        dir.path(),
        &LockRecord {
            pid: std::process::id(),
            started_at: chrono::Utc::now() - chrono::Duration::hours(25),
            feature: "old".to_string(),
            branch: "ralph/old".to_string(),
        },
    );

    assert!(LockFile::acquire(dir.path(), "checkout", "ralph/checkout").is_ok());
}

#[test]
fn unparseable_lock_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(LOCK_FILE), b"not json").unwrap();
    assert!(LockFile::acquire(dir.path(), "checkout", "ralph/checkout").is_ok());
}

#[test]
fn release_removes_own_lock_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut lock = LockFile::acquire(dir.path(), "checkout", "ralph/checkout").unwrap();
    let path = lock.path().to_owned();

    lock.release();
    assert!(!path.exists());
    lock.release(); // no-op
    assert!(!path.exists());
}

#[test]
fn release_leaves_foreign_lock_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut lock = LockFile::acquire(dir.path(), "checkout", "ralph/checkout").unwrap();
    let path = lock.path().to_owned();

    // another process replaced the lock after (say) stale takeover
    write_record(
        dir.path(),
        &LockRecord {
            pid: std::process::id().wrapping_add(1),
            started_at: chrono::Utc::now(),
            feature: "theirs".to_string(),
            branch: "ralph/theirs".to_string(),
        },
    );

    lock.release();
    assert!(path.exists());
}

#[test]
fn staleness_rules() {
    let now = chrono::Utc::now();
    let live_recent = LockRecord {
        pid: std::process::id(),
        started_at: now,
        feature: String::new(),
        branch: String::new(),
    };
    assert!(!live_recent.is_stale(now));

    let live_old = LockRecord { started_at: now - chrono::Duration::hours(25), ..live_recent.clone() };
    assert!(live_old.is_stale(now));

    let dead = LockRecord { pid: 4_000_000, ..live_recent };
    assert!(dead.is_stale(now));
}
