// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn story(ui: bool) -> Story {
    Story {
        id: "US-003".to_string(),
        title: "Add login form".to_string(),
        description: "Users sign in with email and password.".to_string(),
        acceptance_criteria: vec![
            "form validates email".to_string(),
            "wrong password shows an error".to_string(),
        ],
        priority: 1,
        tags: if ui { vec!["ui".to_string()] } else { Vec::new() },
    }
}

fn base_ctx<'a>(story: &'a Story, verify: &'a [String]) -> PromptContext<'a> {
    PromptContext {
        story,
        attempt: 1,
        last_failure: None,
        learnings: &[],
        cross_feature_learnings: &[],
        diff_stat: "",
        verify_commands: verify,
        ui_verify_commands: &[],
        knowledge_file: "AGENTS.md",
    }
}

#[test]
fn story_fields_and_contract_are_present() {
    let story = story(false);
    let verify = vec!["cargo test".to_string()];
    let prompt = compose(&base_ctx(&story, &verify));

    assert!(prompt.contains("US-003"));
    assert!(prompt.contains("Add login form"));
    assert!(prompt.contains("form validates email"));
    assert!(prompt.contains("`cargo test`"));
    assert!(prompt.contains("<ralph>DONE</ralph>"));
    assert!(prompt.contains("<ralph>STUCK:reason</ralph>"));
    assert!(prompt.contains("AGENTS.md"));
}

#[test]
fn empty_sections_are_omitted() {
    let story = story(false);
    let verify = vec!["true".to_string()];
    let prompt = compose(&base_ctx(&story, &verify));

    assert!(!prompt.contains("Previous attempt failed"));
    assert!(!prompt.contains("Learnings from this feature"));
    assert!(!prompt.contains("Learnings from other features"));
    assert!(!prompt.contains("Changes already on this branch"));
}

#[test]
fn last_failure_is_fed_back() {
    let story = story(false);
    let verify = vec!["true".to_string()];
    let mut ctx = base_ctx(&story, &verify);
    ctx.attempt = 2;
    ctx.last_failure = Some("`cargo test` failed (exit 101):\ntest auth::login ... FAILED");

    let prompt = compose(&ctx);
    assert!(prompt.contains("attempt 2"));
    assert!(prompt.contains("test auth::login ... FAILED"));
}

#[test]
fn learnings_sections_render_and_cap() {
    let story = story(false);
    let verify = vec!["true".to_string()];
    let many: Vec<String> = (0..60).map(|i| format!("learning {i}")).collect();
    let cross = vec!["use bcrypt".to_string()];
    let mut ctx = base_ctx(&story, &verify);
    ctx.learnings = &many;
    ctx.cross_feature_learnings = &cross;

    let prompt = compose(&ctx);
    assert!(prompt.contains("use bcrypt"));
    // capped at the 50 most recent
    assert!(!prompt.contains("- learning 9\n"));
    assert!(prompt.contains("- learning 10"));
    assert!(prompt.contains("- learning 59"));
}

#[test]
fn ui_stories_list_the_ui_commands() {
    let story = story(true);
    let verify = vec!["cargo test".to_string()];
    let ui = vec!["bun run e2e".to_string()];
    let mut ctx = base_ctx(&story, &verify);
    ctx.ui_verify_commands = &ui;

    let prompt = compose(&ctx);
    assert!(prompt.contains("UI-tagged"));
    assert!(prompt.contains("`bun run e2e`"));
}

#[test]
fn diff_stat_appears_when_present() {
    let story = story(false);
    let verify = vec!["true".to_string()];
    let mut ctx = base_ctx(&story, &verify);
    ctx.diff_stat = " src/auth.rs | 42 ++++++\n 1 file changed";

    let prompt = compose(&ctx);
    assert!(prompt.contains("src/auth.rs | 42"));
}
