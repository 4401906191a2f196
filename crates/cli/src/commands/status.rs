// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ralph status` — read-only view of the lock and a feature's state.

use crate::color;
use anyhow::Result;
use clap::Args;
use ralph_core::{RunState, StoryStatus};
use ralph_storage::{layout, LockRecord, LOCK_FILE};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Feature to inspect; all features when omitted
    pub feature: Option<String>,
}

pub async fn status(args: StatusArgs, directory: Option<PathBuf>) -> Result<()> {
    let project_root = match directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let data_dir = layout::data_dir(&project_root);

    match read_lock(&data_dir) {
        Some(lock) => println!(
            "{} pid {} on {} (feature {}, since {})",
            color::header("active run:"),
            lock.pid,
            lock.branch,
            lock.feature,
            lock.started_at.format("%Y-%m-%d %H:%M:%S"),
        ),
        None => println!("{}", color::muted("no active run")),
    }

    for (feature, dir) in layout::list_feature_dirs(&data_dir) {
        if let Some(wanted) = &args.feature {
            if !feature.eq_ignore_ascii_case(wanted) {
                continue;
            }
        }
        let state: RunState = std::fs::read(dir.join(layout::RUN_STATE_FILE))
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        println!();
        println!("{}", color::header(&format!("feature {feature}")));
        let mut ids: Vec<&String> = state.passed.iter().chain(&state.skipped).collect();
        ids.sort();
        ids.dedup();
        for id in ids {
            match state.status(id) {
                StoryStatus::Passed => println!("  {} {id}", color::good("✓")),
                StoryStatus::Skipped => println!(
                    "  {} {id} ({} attempts)",
                    color::bad("✗"),
                    state.attempts(id)
                ),
                StoryStatus::Pending => {}
            }
        }
        let in_flight: Vec<&String> = state
            .retries
            .keys()
            .filter(|id| state.status(id) == StoryStatus::Pending)
            .collect();
        for id in in_flight {
            println!(
                "  {} {id} ({} attempts so far)",
                color::muted("·"),
                state.attempts(id)
            );
        }
        if !state.learnings.is_empty() {
            println!("  {} {}", color::muted("learnings:"), state.learnings.len());
        }
    }

    Ok(())
}

fn read_lock(data_dir: &std::path::Path) -> Option<LockRecord> {
    let bytes = std::fs::read(data_dir.join(LOCK_FILE)).ok()?;
    serde_json::from_slice(&bytes).ok()
}
