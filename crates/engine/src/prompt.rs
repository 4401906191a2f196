// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-story prompt composition.
//!
//! Assembles everything one attempt needs: the story itself, the previous
//! failure, accumulated learnings (this feature and others), the current
//! branch diff-stat, the verify commands the work must satisfy, and the
//! marker contract the provider must speak.

use ralph_core::{Marker, Story};
use std::fmt::Write;

/// Learnings included per section, newest last.
pub const LEARNINGS_CAP: usize = 50;

/// Inputs for one attempt's prompt.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub story: &'a Story,
    /// 1-based attempt number for this story.
    pub attempt: u32,
    pub last_failure: Option<&'a str>,
    /// This feature's learnings, already capped by the caller's state.
    pub learnings: &'a [String],
    /// Learnings aggregated from other features.
    pub cross_feature_learnings: &'a [String],
    /// `git diff --stat` vs. the default branch; empty on a fresh branch.
    pub diff_stat: &'a str,
    pub verify_commands: &'a [String],
    pub ui_verify_commands: &'a [String],
    pub knowledge_file: &'a str,
}

/// Render the prompt. Sections with nothing to say are omitted entirely.
pub fn compose(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are implementing one user story in this repository. Work only on \
         this story, commit your changes, and report completion with the exact \
         marker lines described at the end."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "# Story {} (attempt {})", ctx.story.id, ctx.attempt);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", ctx.story.title);
    if !ctx.story.description.trim().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", ctx.story.description.trim());
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Acceptance criteria:");
    for criterion in &ctx.story.acceptance_criteria {
        let _ = writeln!(out, "- {criterion}");
    }

    if let Some(failure) = ctx.last_failure {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Previous attempt failed");
        let _ = writeln!(out);
        let _ = writeln!(out, "{failure}");
        let _ = writeln!(out);
        let _ = writeln!(out, "Fix the cause of this failure as part of the story.");
    }

    if !ctx.learnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Learnings from this feature");
        let _ = writeln!(out);
        for learning in capped(ctx.learnings) {
            let _ = writeln!(out, "- {learning}");
        }
    }

    if !ctx.cross_feature_learnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Learnings from other features");
        let _ = writeln!(out);
        for learning in capped(ctx.cross_feature_learnings) {
            let _ = writeln!(out, "- {learning}");
        }
    }

    if !ctx.diff_stat.trim().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Changes already on this branch");
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", ctx.diff_stat.trim_end());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "# Verification");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "After you commit, these commands must all exit zero from the project root:"
    );
    for command in ctx.verify_commands {
        let _ = writeln!(out, "- `{command}`");
    }
    if ctx.story.is_ui() && !ctx.ui_verify_commands.is_empty() {
        let _ = writeln!(out, "and, because this story is UI-tagged:");
        for command in ctx.ui_verify_commands {
            let _ = writeln!(out, "- `{command}`");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "# Project conventions");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Conventions and persistent notes live in {}; follow it if present.",
        ctx.knowledge_file
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "# Reporting");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Commit your work with git. Then print exactly one of these lines on \
         its own line (nothing else on the line):"
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", Marker::contract());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Emit DONE when the story is implemented and committed, STUCK with a \
         reason if you cannot proceed, and LEARNING lines (any number, at any \
         point) for insights future attempts should know."
    );

    out
}

fn capped(learnings: &[String]) -> &[String] {
    let start = learnings.len().saturating_sub(LEARNINGS_CAP);
    &learnings[start..]
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
