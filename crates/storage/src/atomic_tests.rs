// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let value = json!({ "passed": ["US-001"], "retries": { "US-002": 2 } });

    write_json(&path, &value).unwrap();

    let back: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a/b/c/state.json");
    write_json(&path, &json!({})).unwrap();
    assert!(path.exists());
}

#[test]
fn no_temp_file_remains_after_publish() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    write_json(&path, &json!({ "ok": true })).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["state.json".to_string()]);
}

#[test]
fn overwrite_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    write_json(&path, &json!({ "v": 1 })).unwrap();
    write_json(&path, &json!({ "v": 2 })).unwrap();

    let back: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(back["v"], 2);
}

#[test]
fn invalid_json_bytes_never_reach_destination() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    write_json(&path, &json!({ "v": 1 })).unwrap();

    let err = write_bytes(&path, b"{ truncated", true).unwrap_err();
    assert!(matches!(err, AtomicWriteError::Validate { .. }));

    // destination still holds the old value and the temp file is gone
    let back: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(back["v"], 1);
    assert!(!dir.path().join("state.json.tmp").exists());
}

#[test]
fn non_json_targets_skip_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prompt.txt");
    write_bytes(&path, b"not json at all", false).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"not json at all");
}
