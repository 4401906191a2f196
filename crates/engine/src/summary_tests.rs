// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ralph_core::{Story, PRD_SCHEMA_VERSION};

fn prd() -> Prd {
    let story = |id: &str| Story {
        id: id.to_string(),
        title: format!("story {id}"),
        description: String::new(),
        acceptance_criteria: vec!["works".to_string()],
        priority: 1,
        tags: Vec::new(),
    };
    Prd {
        schema_version: PRD_SCHEMA_VERSION,
        project: "demo".to_string(),
        branch: "ralph/checkout".to_string(),
        description: String::new(),
        stories: vec![story("US-001"), story("US-002"), story("US-003")],
    }
}

#[test]
fn summary_reflects_state_per_story() {
    let prd = prd();
    let mut state = RunState::default();
    state.mark_passed("US-001");
    state.record_failure("US-002", "tests failed", 2);
    state.record_failure("US-002", "tests failed again", 2);

    let summary = RunSummary::build(&prd, &state, Duration::from_secs(60));
    assert_eq!(summary.feature, "checkout");
    assert_eq!(summary.stories[0].status, StoryStatus::Passed);
    assert_eq!(summary.stories[1].status, StoryStatus::Skipped);
    assert_eq!(summary.stories[1].attempts, 2);
    assert_eq!(
        summary.stories[1].last_failure.as_deref(),
        Some("tests failed again")
    );
    assert_eq!(summary.stories[2].status, StoryStatus::Pending);

    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.skipped(), 1);
    assert!(!summary.all_passed());
}

#[test]
fn all_passed_requires_every_story() {
    let prd = prd();
    let mut state = RunState::default();
    for story in &prd.stories {
        state.mark_passed(&story.id);
    }
    let summary = RunSummary::build(&prd, &state, Duration::ZERO);
    assert!(summary.all_passed());
}

#[test]
fn learnings_are_carried_into_the_summary() {
    let prd = prd();
    let mut state = RunState::default();
    state.add_learning("use bcrypt");
    let summary = RunSummary::build(&prd, &state, Duration::ZERO);
    assert_eq!(summary.learnings, vec!["use bcrypt".to_string()]);
}
