// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic verification of a story attempt.
//!
//! Runs the configured commands through `sh -c` in the project root with a
//! per-command timeout, fail-fast. UI-tagged stories additionally restart
//! the flagged services, run the UI set, and re-probe service health. A
//! command is never retried within one attempt; its failure feeds the next
//! prompt instead.

use ralph_adapters::{process, ServiceError, ServiceSupervisor};
use ralph_core::{RunEvent, VerifyConfig};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Grace between TERM and KILL for a timed-out verify command.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Cap on the output tail kept for failure reasons.
const TAIL_LIMIT: usize = 4 * 1024;

/// One executed verify command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command: String,
    pub success: bool,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub output_tail: String,
}

/// Aggregate result of one verification pass.
#[derive(Debug, Clone, Default)]
pub struct VerifyOutcome {
    pub success: bool,
    pub commands: Vec<CommandOutcome>,
    pub failure: Option<String>,
}

/// Full verification for one story: default set, then (for UI stories)
/// service restart + UI set, then service health.
pub async fn verify_story(
    project_root: &Path,
    story_id: &str,
    is_ui: bool,
    config: &VerifyConfig,
    services: &ServiceSupervisor,
    on_event: &mut (dyn FnMut(RunEvent) + Send),
) -> VerifyOutcome {
    let start = Instant::now();
    let timeout = Duration::from_secs(config.timeout);
    let planned = config.default.len() + if is_ui { config.ui.len() } else { 0 };
    on_event(RunEvent::VerifyStart { story_id: story_id.to_string(), commands: planned });

    let mut outcome = VerifyOutcome { success: true, ..VerifyOutcome::default() };

    run_set(project_root, story_id, &config.default, timeout, &mut outcome, on_event).await;

    if outcome.success && is_ui {
        match services.restart_for_verify().await {
            Ok(report) => {
                for ready in report {
                    on_event(RunEvent::ServiceReady { name: ready.name, wait_ms: ready.wait_ms });
                }
            }
            Err(ServiceError::NotReady { name, timeout, detail }) => {
                outcome.success = false;
                outcome.failure = Some(format!(
                    "service {name:?} not ready after restart ({timeout:?}): {detail}"
                ));
            }
            Err(e) => {
                outcome.success = false;
                outcome.failure = Some(format!("service restart failed: {e}"));
            }
        }
        if outcome.success {
            run_set(project_root, story_id, &config.ui, timeout, &mut outcome, on_event).await;
        }
    }

    if outcome.success {
        let failing = services.check_health().await;
        if !failing.is_empty() {
            outcome.success = false;
            outcome.failure = Some(format!(
                "service health check failed: {}",
                failing.join(", ")
            ));
        }
    }

    on_event(RunEvent::VerifyEnd {
        story_id: story_id.to_string(),
        success: outcome.success,
        duration_ms: start.elapsed().as_millis() as u64,
        failure: outcome.failure.clone(),
    });
    outcome
}

/// Run one ordered command set, fail-fast, appending to `outcome`.
async fn run_set(
    project_root: &Path,
    story_id: &str,
    commands: &[String],
    timeout: Duration,
    outcome: &mut VerifyOutcome,
    on_event: &mut (dyn FnMut(RunEvent) + Send),
) {
    for command in commands {
        on_event(RunEvent::VerifyCmdStart {
            story_id: story_id.to_string(),
            command: command.clone(),
        });
        let result = run_command(project_root, command, timeout).await;
        on_event(RunEvent::VerifyCmdEnd {
            story_id: story_id.to_string(),
            command: command.clone(),
            success: result.success,
            duration_ms: result.duration.as_millis() as u64,
        });

        let failed = !result.success;
        if failed {
            outcome.success = false;
            outcome.failure = Some(failure_reason(&result, timeout));
        }
        outcome.commands.push(result);
        if failed {
            return;
        }
    }
}

/// Execute one command via `sh -c` with combined output capture.
pub async fn run_command(project_root: &Path, command: &str, timeout: Duration) -> CommandOutcome {
    let start = Instant::now();
    let spawned = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(project_root)
        .process_group(0)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            return CommandOutcome {
                command: command.to_string(),
                success: false,
                timed_out: false,
                exit_code: None,
                duration: start.elapsed(),
                output_tail: format!("failed to spawn: {e}"),
            };
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_task = tokio::spawn(read_all(stdout));
    let err_task = tokio::spawn(read_all(stderr));

    let (timed_out, exit_code) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (false, status.code()),
        Ok(Err(_)) => (false, None),
        Err(_) => {
            debug!(command, "verify command hit its timeout");
            process::shutdown_group(&mut child, KILL_GRACE).await;
            (true, None)
        }
    };

    let mut output = out_task.await.unwrap_or_default();
    output.extend(err_task.await.unwrap_or_default());

    CommandOutcome {
        command: command.to_string(),
        success: !timed_out && exit_code == Some(0),
        timed_out,
        exit_code,
        duration: start.elapsed(),
        output_tail: tail(&output, TAIL_LIMIT),
    }
}

fn failure_reason(result: &CommandOutcome, timeout: Duration) -> String {
    if result.timed_out {
        format!("`{}` timed out after {}s", result.command, timeout.as_secs())
    } else {
        let exit = result
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if result.output_tail.is_empty() {
            format!("`{}` failed (exit {exit})", result.command)
        } else {
            format!("`{}` failed (exit {exit}):\n{}", result.command, result.output_tail)
        }
    }
}

async fn read_all(pipe: Option<impl tokio::io::AsyncRead + Unpin>) -> Vec<u8> {
    let Some(mut pipe) = pipe else {
        return Vec::new();
    };
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    buf
}

/// UTF-8-safe tail of at most `limit` bytes.
fn tail(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if text.len() <= limit {
        return text.to_string();
    }
    let mut start = text.len() - limit;
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
