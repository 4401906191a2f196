// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable PRD and story definitions.
//!
//! The PRD is authored externally and never mutated by the run loop.
//! Execution history lives in [`crate::state::RunState`], persisted in a
//! separate file so PRD regeneration cannot destroy it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// The only PRD schema version this build understands.
pub const PRD_SCHEMA_VERSION: u32 = 1;

/// Feature branches are always `ralph/<feature>`.
pub const BRANCH_PREFIX: &str = "ralph/";

/// Tag that marks a story as exercising the UI verification path.
pub const UI_TAG: &str = "ui";

/// Errors produced by PRD validation.
#[derive(Debug, Error)]
pub enum PrdError {
    #[error("unsupported PRD schema version {found} (this build supports {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("PRD contains no stories")]
    NoStories,

    #[error("duplicate story id {0:?}")]
    DuplicateStoryId(String),

    #[error("story {0:?} has an empty id")]
    EmptyStoryId(String),

    #[error("story {0:?} has no acceptance criteria")]
    NoAcceptanceCriteria(String),

    #[error("branch {0:?} is not of the form {BRANCH_PREFIX}<feature>")]
    MalformedBranch(String),
}

/// One atomic unit of work, implemented in a single provider attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    /// Lower runs first; ties break by position in the PRD.
    pub priority: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Story {
    /// Whether this story triggers service restart and the UI verify set.
    pub fn is_ui(&self) -> bool {
        self.tags.iter().any(|t| t == UI_TAG)
    }
}

/// A finalized product requirements document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prd {
    pub schema_version: u32,
    pub project: String,
    /// Feature branch, of the form `ralph/<feature>`.
    pub branch: String,
    #[serde(default)]
    pub description: String,
    pub stories: Vec<Story>,
}

impl Prd {
    /// Structural validation; called once after load, before the run starts.
    pub fn validate(&self) -> Result<(), PrdError> {
        if self.schema_version != PRD_SCHEMA_VERSION {
            return Err(PrdError::UnsupportedSchema {
                found: self.schema_version,
                supported: PRD_SCHEMA_VERSION,
            });
        }
        if self.stories.is_empty() {
            return Err(PrdError::NoStories);
        }
        if !self.branch.starts_with(BRANCH_PREFIX) || self.feature().is_empty() {
            return Err(PrdError::MalformedBranch(self.branch.clone()));
        }

        let mut seen = HashSet::new();
        for story in &self.stories {
            if story.id.trim().is_empty() {
                return Err(PrdError::EmptyStoryId(story.title.clone()));
            }
            if !seen.insert(story.id.as_str()) {
                return Err(PrdError::DuplicateStoryId(story.id.clone()));
            }
            if story.acceptance_criteria.is_empty() {
                return Err(PrdError::NoAcceptanceCriteria(story.id.clone()));
            }
        }
        Ok(())
    }

    /// The feature name, i.e. the branch without its `ralph/` prefix.
    pub fn feature(&self) -> &str {
        self.branch.strip_prefix(BRANCH_PREFIX).unwrap_or("")
    }

    /// Whether any story carries the `ui` tag.
    pub fn has_ui_story(&self) -> bool {
        self.stories.iter().any(Story::is_ui)
    }

    /// Look up a story by id.
    pub fn story(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
#[path = "prd_tests.rs"]
mod tests;
