// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin async adapter over the `git` CLI.
//!
//! The orchestrator needs a handful of plumbing operations: branch
//! management, HEAD inspection, diffs against the default branch, and a
//! working-tree cleanliness test. Nothing here merges or pushes.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::warn;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {args:?} failed: {stderr}")]
    Failed { args: Vec<String>, stderr: String },

    #[error("refusing to switch branches: working tree has uncommitted changes")]
    DirtyTree,
}

/// Git operations scoped to one repository root.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output, GitError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(GitError::Spawn)
    }

    /// Run git, requiring success; returns trimmed stdout.
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(GitError::Failed {
                args: args.iter().map(|a| a.to_string()).collect(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git, caring only whether it succeeded.
    async fn succeeds(&self, args: &[&str]) -> Result<bool, GitError> {
        Ok(self.output(args).await?.status.success())
    }

    /// Whether the root is inside a git work tree.
    pub async fn is_work_tree(&self) -> bool {
        self.succeeds(&["rev-parse", "--is-inside-work-tree"])
            .await
            .unwrap_or(false)
    }

    /// Resolve the default branch: the remote symbolic-ref when available,
    /// then local `main`/`master`, then their remote-tracking variants,
    /// finally the literal "main".
    pub async fn default_branch(&self) -> String {
        if let Ok(head) = self.run(&["symbolic-ref", "refs/remotes/origin/HEAD", "--short"]).await {
            if let Some(branch) = head.strip_prefix("origin/") {
                return branch.to_string();
            }
        }
        for candidate in ["main", "master"] {
            if self.branch_exists(candidate).await.unwrap_or(false) {
                return candidate.to_string();
            }
        }
        for candidate in ["origin/main", "origin/master"] {
            if self
                .succeeds(&["rev-parse", "--verify", "--quiet", candidate])
                .await
                .unwrap_or(false)
            {
                return candidate.to_string();
            }
        }
        warn!("could not determine default branch, falling back to \"main\"");
        "main".to_string()
    }

    pub async fn current_branch(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    pub async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        self.succeeds(&["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
            .await
    }

    /// Create `name` starting at `start_point` and switch to it.
    pub async fn create_branch(&self, name: &str, start_point: &str) -> Result<(), GitError> {
        self.run(&["switch", "-c", name, start_point]).await.map(|_| ())
    }

    /// Switch to an existing branch, refusing across a dirty working tree
    /// (uncommitted changes could be lost).
    pub async fn switch_branch(&self, name: &str) -> Result<(), GitError> {
        if !self.is_clean().await? {
            return Err(GitError::DirtyTree);
        }
        self.run(&["switch", name]).await.map(|_| ())
    }

    /// Commit a single path with a message, only when that path is dirty.
    /// The commit is path-scoped so unrelated staged files are not swept in.
    /// Returns whether a commit was made.
    pub async fn commit_path(&self, path: &str, message: &str) -> Result<bool, GitError> {
        let status = self.run(&["status", "--porcelain", "--", path]).await?;
        if status.is_empty() {
            return Ok(false);
        }
        self.run(&["add", "--", path]).await?;
        self.run(&["commit", "--quiet", "-m", message, "--", path]).await?;
        Ok(true)
    }

    pub async fn head_hash(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "HEAD"]).await
    }

    pub async fn head_hash_short(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "--short", "HEAD"]).await
    }

    /// Subject line of a commit.
    pub async fn commit_message(&self, hash: &str) -> Result<String, GitError> {
        self.run(&["log", "-1", "--format=%s", hash]).await
    }

    /// Files changed on this branch vs. the default branch. Three-dot diff
    /// (merge-base) first; two-dot as a fallback for unrelated histories.
    pub async fn changed_files(&self, default_branch: &str) -> Result<Vec<String>, GitError> {
        let three_dot = format!("{default_branch}...HEAD");
        let out = match self.run(&["diff", "--name-only", &three_dot]).await {
            Ok(out) => out,
            Err(_) => {
                let two_dot = format!("{default_branch}..HEAD");
                self.run(&["diff", "--name-only", &two_dot]).await?
            }
        };
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Compact diff-stat vs. the default branch, for prompt context.
    pub async fn diff_stat(&self, default_branch: &str) -> Result<String, GitError> {
        let three_dot = format!("{default_branch}...HEAD");
        match self.run(&["diff", "--stat", &three_dot]).await {
            Ok(out) => Ok(out),
            Err(_) => {
                let two_dot = format!("{default_branch}..HEAD");
                self.run(&["diff", "--stat", &two_dot]).await
            }
        }
    }

    /// Clean means no staged, unstaged, or untracked changes.
    pub async fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.run(&["status", "--porcelain"]).await?.is_empty())
    }

    /// Whether the branch carries any commit touching files outside the
    /// data directory. Fresh feature branches fail this test, which is what
    /// suppresses spurious verify-at-top success before any work is done.
    pub async fn has_non_state_change(
        &self,
        default_branch: &str,
        data_dir_name: &str,
    ) -> Result<bool, GitError> {
        let prefix = format!("{data_dir_name}/");
        Ok(self
            .changed_files(default_branch)
            .await?
            .iter()
            .any(|f| !f.starts_with(&prefix)))
    }

    /// Test-file heuristic used when summarizing provider commits.
    pub fn is_test_file(path: &str) -> bool {
        path.contains("_test.")
            || path.contains(".test.")
            || path.contains(".spec.")
            || path.contains("__tests__/")
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
