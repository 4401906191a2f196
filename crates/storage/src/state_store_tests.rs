// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::NaiveDate;
use ralph_core::{Story, PRD_SCHEMA_VERSION};

fn paths_in(dir: &Path) -> FeaturePaths {
    layout::feature_paths(
        dir,
        "checkout",
        NaiveDate::parse_from_str("2026-08-01", "%Y-%m-%d").unwrap(),
    )
}

fn sample_prd() -> Prd {
    Prd {
        schema_version: PRD_SCHEMA_VERSION,
        project: "demo".to_string(),
        branch: "ralph/checkout".to_string(),
        description: String::new(),
        stories: vec![Story {
            id: "US-001".to_string(),
            title: "first".to_string(),
            description: String::new(),
            acceptance_criteria: vec!["works".to_string()],
            priority: 1,
            tags: Vec::new(),
        }],
    }
}

#[test]
fn missing_prd_is_a_clear_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_prd(&paths_in(dir.path())).unwrap_err();
    assert!(matches!(err, StateStoreError::PrdNotFound(_)));
}

#[test]
fn prd_validation_runs_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    let mut prd = sample_prd();
    prd.schema_version = 99;
    std::fs::create_dir_all(&paths.dir).unwrap();
    std::fs::write(&paths.prd, serde_json::to_vec(&prd).unwrap()).unwrap();

    assert!(matches!(load_prd(&paths), Err(StateStoreError::Prd(_))));
}

#[test]
fn run_state_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());

    let mut state = RunState::default();
    state.mark_passed("US-001");
    state.add_learning("use bcrypt");
    save_run_state(&paths, &state).unwrap();

    let back = load_run_state(&paths).unwrap();
    assert_eq!(back, state);
}

#[test]
fn missing_run_state_is_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let state = load_run_state(&paths_in(dir.path())).unwrap();
    assert_eq!(state, RunState::default());
}

#[test]
fn corrupt_run_state_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    std::fs::create_dir_all(&paths.dir).unwrap();
    std::fs::write(&paths.run_state, b"{ nope").unwrap();

    assert!(matches!(load_run_state(&paths), Err(StateStoreError::Json { .. })));
}

#[test]
fn cross_feature_learnings_exclude_current() {
    let dir = tempfile::tempdir().unwrap();

    let a = layout::feature_paths(
        dir.path(),
        "auth",
        NaiveDate::parse_from_str("2026-07-01", "%Y-%m-%d").unwrap(),
    );
    let mut a_state = RunState::default();
    a_state.add_learning("use bcrypt");
    save_run_state(&a, &a_state).unwrap();

    let b = paths_in(dir.path());
    let mut b_state = RunState::default();
    b_state.add_learning("checkout-only detail");
    save_run_state(&b, &b_state).unwrap();

    let learnings = cross_feature_learnings(dir.path(), "checkout");
    assert_eq!(learnings, vec!["use bcrypt".to_string()]);

    // exclusion is case-insensitive
    let learnings = cross_feature_learnings(dir.path(), "CHECKOUT");
    assert_eq!(learnings, vec!["use bcrypt".to_string()]);

    // reading other features' state never mutates it
    let a_back = load_run_state(&a).unwrap();
    assert_eq!(a_back, a_state);
}

#[test]
fn cross_feature_learnings_dedupe_across_features() {
    let dir = tempfile::tempdir().unwrap();
    for (feature, date) in [("auth", "2026-07-01"), ("billing", "2026-07-02")] {
        let paths = layout::feature_paths(
            dir.path(),
            feature,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        );
        let mut state = RunState::default();
        state.add_learning("Use Bcrypt");
        save_run_state(&paths, &state).unwrap();
    }

    let learnings = cross_feature_learnings(dir.path(), "checkout");
    assert_eq!(learnings.len(), 1);
}
