// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of the data directory.
//!
//! ```text
//! <project>/.ralph/
//!   ralph.lock
//!   <YYYY-MM-DD>-<feature>/
//!     prd.json
//!     run-state.json
//!     logs/run-NNN.jsonl
//! ```

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Data directory name, relative to the project root.
pub const DATA_DIR: &str = ".ralph";

/// Lock file name inside the data directory.
pub const LOCK_FILE: &str = "ralph.lock";

pub const PRD_FILE: &str = "prd.json";
pub const RUN_STATE_FILE: &str = "run-state.json";
pub const LOGS_DIR: &str = "logs";

/// Length of the `YYYY-MM-DD-` prefix on feature directory names.
const DATE_PREFIX_LEN: usize = 11;

/// Resolved paths for one feature's state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePaths {
    pub dir: PathBuf,
    pub prd: PathBuf,
    pub run_state: PathBuf,
    pub logs: PathBuf,
}

impl FeaturePaths {
    fn at(dir: PathBuf) -> Self {
        Self {
            prd: dir.join(PRD_FILE),
            run_state: dir.join(RUN_STATE_FILE),
            logs: dir.join(LOGS_DIR),
            dir,
        }
    }
}

/// The data directory for a project root.
pub fn data_dir(project_root: &Path) -> PathBuf {
    project_root.join(DATA_DIR)
}

/// Locate the directory for `feature`, preferring an existing dated
/// directory (latest date wins) and otherwise naming a new one for `today`.
/// The directory itself is not created here.
pub fn feature_paths(data_dir: &Path, feature: &str, today: NaiveDate) -> FeaturePaths {
    if let Some(existing) = find_feature_dir(data_dir, feature) {
        return FeaturePaths::at(existing);
    }
    FeaturePaths::at(data_dir.join(format!("{today}-{feature}")))
}

/// Find an existing `<date>-<feature>` directory for the feature.
pub fn find_feature_dir(data_dir: &Path, feature: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = list_feature_dirs(data_dir)
        .into_iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(feature))
        .map(|(_, path)| path)
        .collect();
    candidates.sort();
    candidates.pop()
}

/// All feature directories in the data dir, as `(feature, path)` pairs.
pub fn list_feature_dirs(data_dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(data_dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            parse_feature_name(&name).map(|feature| (feature.to_string(), e.path()))
        })
        .collect();
    dirs.sort();
    dirs
}

/// Strip the `YYYY-MM-DD-` prefix from a feature directory name.
fn parse_feature_name(dir_name: &str) -> Option<&str> {
    let prefix = dir_name.get(..DATE_PREFIX_LEN)?;
    let feature = dir_name.get(DATE_PREFIX_LEN..)?;
    if feature.is_empty() {
        return None;
    }
    let date_part = prefix.strip_suffix('-')?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some(feature)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
