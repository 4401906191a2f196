// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ralph run` — drive one feature's stories to completion.

use crate::color;
use crate::console::{fmt_ms, ConsoleObserver};
use crate::exit::Interrupted;
use anyhow::Result;
use clap::Args;
use ralph_adapters::CliProvider;
use ralph_core::{Clock, Config, LoggingConfig, StoryStatus, SystemClock};
use ralph_engine::{CleanupCoordinator, RunOptions, RunSummary, Runner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Feature to run; discovered from the data directory when omitted
    pub feature: Option<String>,
}

pub async fn run(args: RunArgs, directory: Option<PathBuf>) -> Result<()> {
    let project_root = match directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    // Console settings come from the same config the runner loads; fall
    // back to defaults so config errors surface from the runner with
    // proper context instead of here.
    let logging = Config::load(&project_root)
        .map(|c| c.logging)
        .unwrap_or_else(|_| LoggingConfig::default());

    let clock = SystemClock;
    let coordinator = Arc::new(CleanupCoordinator::new());
    let runner = Runner::new(
        RunOptions { project_root, feature: args.feature },
        CliProvider::new(),
        clock,
        Arc::clone(&coordinator),
        ConsoleObserver::new(&logging),
    );

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let run_fut = runner.run();
    tokio::pin!(run_fut);
    let summary = tokio::select! {
        result = &mut run_fut => result?,
        _ = sigint.recv() => return interrupted(&coordinator, &clock).await,
        _ = sigterm.recv() => return interrupted(&coordinator, &clock).await,
    };

    print_summary(&summary);
    Ok(())
}

/// Signals converge on the cleanup coordinator, then exit 130.
async fn interrupted(coordinator: &CleanupCoordinator, clock: &SystemClock) -> Result<()> {
    eprintln!("\ninterrupted — cleaning up");
    coordinator
        .finish(clock.epoch_ms(), false, Some("interrupted by signal"))
        .await;
    Err(Interrupted.into())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{} {} passed, {} skipped {}",
        color::header(&format!("feature {}:", summary.feature)),
        summary.passed(),
        summary.skipped(),
        color::muted(&format!("({})", fmt_ms(summary.duration.as_millis() as u64))),
    );
    for story in &summary.stories {
        match story.status {
            StoryStatus::Passed => {
                println!("  {} {} {}", color::good("✓"), story.id, story.title);
            }
            StoryStatus::Skipped => {
                let reason = story
                    .last_failure
                    .as_deref()
                    .and_then(|r| r.lines().next())
                    .unwrap_or("unknown");
                println!(
                    "  {} {} {} — skipped after {} attempts: {reason}",
                    color::bad("✗"),
                    story.id,
                    story.title,
                    story.attempts,
                );
            }
            StoryStatus::Pending => {
                println!("  {} {} {}", color::muted("·"), story.id, story.title);
            }
        }
    }
    if !summary.learnings.is_empty() {
        println!("{}", color::header("learnings:"));
        for learning in &summary.learnings {
            println!("  - {learning}");
        }
    }
}
