// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutable execution state for one feature.
//!
//! Owned by the run loop and flushed atomically after every transition.
//! All mutation goes through methods that preserve the state invariants:
//! a story is never both passed and skipped, retry counters never exceed
//! the configured bound, and learnings stay free of case-insensitive
//! duplicates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Observable status of a story, derived from run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Pending,
    Passed,
    Skipped,
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryStatus::Pending => write!(f, "pending"),
            StoryStatus::Passed => write!(f, "passed"),
            StoryStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The story keeps its slot; the counter is at the given value.
    Retry(u32),
    /// The counter reached the bound; the story moved to `skipped`.
    Skipped(u32),
}

/// Execution state for one feature, persisted as `run-state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    #[serde(default)]
    pub passed: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default)]
    pub retries: HashMap<String, u32>,
    #[serde(default)]
    pub last_failure: HashMap<String, String>,
    #[serde(default)]
    pub learnings: Vec<String>,
}

impl RunState {
    pub fn status(&self, id: &str) -> StoryStatus {
        if self.passed.iter().any(|s| s == id) {
            StoryStatus::Passed
        } else if self.skipped.iter().any(|s| s == id) {
            StoryStatus::Skipped
        } else {
            StoryStatus::Pending
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.status(id) == StoryStatus::Pending
    }

    /// Attempts recorded so far for a story.
    pub fn attempts(&self, id: &str) -> u32 {
        self.retries.get(id).copied().unwrap_or(0)
    }

    /// Mark a story passed and clear its last failure.
    ///
    /// Skipped is terminal within a run; marking a skipped story passed is
    /// ignored so `skipped` stays append-only.
    pub fn mark_passed(&mut self, id: &str) {
        if self.status(id) != StoryStatus::Pending {
            return;
        }
        self.passed.push(id.to_string());
        self.last_failure.remove(id);
    }

    /// Record a failed attempt; at `max_retries` the story moves to skipped.
    pub fn record_failure(&mut self, id: &str, reason: &str, max_retries: u32) -> FailureDisposition {
        let counter = self.retries.entry(id.to_string()).or_insert(0);
        *counter = (*counter + 1).min(max_retries.max(1));
        let attempts = *counter;
        self.last_failure.insert(id.to_string(), reason.to_string());

        if attempts >= max_retries && self.status(id) == StoryStatus::Pending {
            self.skipped.push(id.to_string());
            FailureDisposition::Skipped(attempts)
        } else {
            FailureDisposition::Retry(attempts)
        }
    }

    /// Append a learning unless an equivalent one exists.
    ///
    /// Equivalence is whitespace-trimmed, case-insensitive comparison.
    /// Returns true when the learning was new.
    pub fn add_learning(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        let folded = trimmed.to_lowercase();
        if self
            .learnings
            .iter()
            .any(|l| l.trim().to_lowercase() == folded)
        {
            return false;
        }
        self.learnings.push(trimmed.to_string());
        true
    }

    /// The most recent learnings, newest last, capped at `limit`.
    pub fn recent_learnings(&self, limit: usize) -> &[String] {
        let start = self.learnings.len().saturating_sub(limit);
        &self.learnings[start..]
    }

    /// Whether every one of the given stories is passed or skipped.
    pub fn all_resolved<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> bool {
        ids.into_iter().all(|id| !self.is_pending(id))
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
