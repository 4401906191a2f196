// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading and saving the PRD and run state.
//!
//! The PRD and the run state live in distinct files: users regenerate the
//! PRD while the loop mutates state, and co-locating them invites
//! destructive races. Run-state writes always go through the atomic store.

use crate::atomic;
use crate::layout::{self, FeaturePaths};
use ralph_core::{Prd, PrdError, RunState};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("no PRD at {0} — finalize one before running")]
    PrdNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Prd(#[from] PrdError),

    #[error(transparent)]
    Write(#[from] atomic::AtomicWriteError),
}

/// Load and validate the PRD definition.
pub fn load_prd(paths: &FeaturePaths) -> Result<Prd, StateStoreError> {
    if !paths.prd.exists() {
        return Err(StateStoreError::PrdNotFound(paths.prd.clone()));
    }
    let bytes = read(&paths.prd)?;
    let prd: Prd = parse(&paths.prd, &bytes)?;
    prd.validate()?;
    Ok(prd)
}

/// Load run state; a missing file is a fresh state, a corrupt file is an
/// error (the atomic store guarantees our own writes always parse).
pub fn load_run_state(paths: &FeaturePaths) -> Result<RunState, StateStoreError> {
    if !paths.run_state.exists() {
        return Ok(RunState::default());
    }
    let bytes = read(&paths.run_state)?;
    parse(&paths.run_state, &bytes)
}

/// Persist run state atomically.
pub fn save_run_state(paths: &FeaturePaths, state: &RunState) -> Result<(), StateStoreError> {
    atomic::write_json(&paths.run_state, state)?;
    Ok(())
}

/// Learnings accumulated by other features, for cross-feature prompt
/// context. The current feature is excluded case-insensitively and no
/// state file is mutated. Order follows the directory listing; duplicates
/// across features are dropped case-insensitively.
pub fn cross_feature_learnings(data_dir: &Path, current_feature: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for (feature, dir) in layout::list_feature_dirs(data_dir) {
        if feature.eq_ignore_ascii_case(current_feature) {
            continue;
        }
        let path = dir.join(layout::RUN_STATE_FILE);
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        let Ok(state) = serde_json::from_slice::<RunState>(&bytes) else {
            debug!(path = %path.display(), "skipping unreadable run state");
            continue;
        };
        for learning in state.learnings {
            let folded = learning.trim().to_lowercase();
            if folded.is_empty() || seen.contains(&folded) {
                continue;
            }
            seen.push(folded);
            out.push(learning);
        }
    }
    out
}

fn read(path: &Path) -> Result<Vec<u8>, StateStoreError> {
    std::fs::read(path).map_err(|source| StateStoreError::Io { path: path.to_owned(), source })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, StateStoreError> {
    serde_json::from_slice(bytes)
        .map_err(|source| StateStoreError::Json { path: path.to_owned(), source })
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
