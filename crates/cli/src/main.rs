// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ralph - autonomous agent-loop orchestrator CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod color;
mod commands;
mod console;
mod exit;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{run, status};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ralph",
    version,
    about = "Ralph - an agent loop that ships your PRD story by story"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the loop until every story is passed or skipped
    Run(run::RunArgs),
    /// Show the lock holder and per-story state
    Status(status::StatusArgs),
}

#[tokio::main]
async fn main() {
    setup_tracing();

    if let Err(e) = dispatch().await {
        if e.is::<exit::Interrupted>() {
            // the signal handler already reported and cleaned up
            std::process::exit(exit::INTERRUPTED);
        }
        eprintln!("Error: {}", render_error(&e));
        std::process::exit(exit::FAILURE);
    }
}

async fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::run(args, cli.directory).await,
        Commands::Status(args) => status::status(args, cli.directory).await,
    }
}

/// Diagnostics go to stderr via tracing; run output is rendered by the
/// console observer on stdout.
fn setup_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Render an anyhow error without repeating its causes.
///
/// Ralph's error enums mostly embed their source in the top-level message
/// (`#[error(transparent)]` and `{source}`-interpolating variants), so a
/// cause is only appended when its text is not already visible in what has
/// been rendered so far.
fn render_error(err: &anyhow::Error) -> String {
    let mut out = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str("\n  caused by: ");
            out.push_str(&text);
        }
    }
    out
}
