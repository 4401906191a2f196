// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider subprocess supervisor.
//!
//! Spawns the AI CLI for one story attempt, delivers the prompt per the
//! profile's mode, streams both pipes line by line, parses the out-of-band
//! marker protocol, and enforces the per-iteration deadline with a
//! process-group TERM → grace → KILL. The trait seam keeps the engine
//! testable against a scripted fake.

use crate::process;
use async_trait::async_trait;
use parking_lot::Mutex;
use ralph_core::{Marker, ProviderProfile, PromptMode};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Grace between SIGTERM and SIGKILL on the provider group.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// How long to wait for a clean exit after both pipes close.
const EXIT_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to spawn provider {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage prompt file: {0}")]
    PromptFile(#[source] std::io::Error),
}

/// One story attempt handed to the provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub story_id: String,
    pub prompt: String,
    pub project_root: PathBuf,
}

/// Which pipe a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStream {
    Stdout,
    Stderr,
}

impl ProviderStream {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderStream::Stdout => "stdout",
            ProviderStream::Stderr => "stderr",
        }
    }
}

/// Streamed observations from a running provider.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    Line { stream: ProviderStream, line: String },
    Marker(Marker),
}

/// What one attempt produced, before the engine applies its own rules
/// (commit check, verification).
#[derive(Debug, Clone, Default)]
pub struct ProviderOutcome {
    pub done: bool,
    pub stuck: bool,
    pub stuck_reason: Option<String>,
    pub learnings: Vec<String>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ProviderOutcome {
    fn absorb(&mut self, marker: &Marker) {
        match marker {
            Marker::Done => self.done = true,
            Marker::Stuck(reason) => {
                self.stuck = true;
                self.stuck_reason = reason.clone();
            }
            Marker::Learning(text) => self.learnings.push(text.clone()),
            Marker::Advisory(_) => {}
        }
    }
}

/// Shared view of the in-flight provider's process group, registered with
/// the cleanup coordinator so signals can kill it without the Child handle.
#[derive(Debug, Clone, Default)]
pub struct ProviderGroupHandle(Arc<Mutex<Option<u32>>>);

impl ProviderGroupHandle {
    pub fn current_pid(&self) -> Option<u32> {
        *self.0.lock()
    }

    /// TERM → grace → KILL the current group, if any. Reaping stays with
    /// the task that owns the Child.
    pub async fn kill(&self, grace: Duration) {
        if let Some(pid) = self.current_pid() {
            debug!(pid, "killing provider process group");
            process::kill_group_by_id(pid, grace).await;
        }
    }

    fn set(&self, pid: Option<u32>) {
        *self.0.lock() = pid;
    }
}

/// The seam between the engine and the provider CLI.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn run(
        &self,
        profile: &ProviderProfile,
        request: ProviderRequest,
        events: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderOutcome, ProviderError>;

    /// Handle for killing the in-flight attempt's process group.
    fn group_handle(&self) -> ProviderGroupHandle;
}

#[async_trait]
impl<T: ProviderAdapter + ?Sized> ProviderAdapter for std::sync::Arc<T> {
    async fn run(
        &self,
        profile: &ProviderProfile,
        request: ProviderRequest,
        events: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderOutcome, ProviderError> {
        (**self).run(profile, request, events).await
    }

    fn group_handle(&self) -> ProviderGroupHandle {
        (**self).group_handle()
    }
}

/// Real provider: spawns the configured CLI.
#[derive(Debug, Clone, Default)]
pub struct CliProvider {
    current: ProviderGroupHandle,
}

impl CliProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderAdapter for CliProvider {
    async fn run(
        &self,
        profile: &ProviderProfile,
        request: ProviderRequest,
        events: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderOutcome, ProviderError> {
        let start = Instant::now();

        let mut args = profile.args.clone();
        // Keep the prompt file alive until the attempt finishes.
        let mut _prompt_file: Option<tempfile::NamedTempFile> = None;
        match profile.prompt_mode {
            PromptMode::Stdin => {}
            PromptMode::Arg => {
                if let Some(flag) = &profile.prompt_flag {
                    args.push(flag.clone());
                }
                args.push(request.prompt.clone());
            }
            PromptMode::File => {
                let mut file = tempfile::Builder::new()
                    .prefix("ralph-prompt-")
                    .suffix(".md")
                    .tempfile()
                    .map_err(ProviderError::PromptFile)?;
                file.write_all(request.prompt.as_bytes())
                    .map_err(ProviderError::PromptFile)?;
                if let Some(flag) = &profile.prompt_flag {
                    args.push(flag.clone());
                }
                args.push(file.path().display().to_string());
                _prompt_file = Some(file);
            }
        }

        let mut cmd = Command::new(&profile.command);
        cmd.args(&args)
            .current_dir(&request.project_root)
            .process_group(0)
            .stdin(match profile.prompt_mode {
                PromptMode::Stdin => std::process::Stdio::piped(),
                _ => std::process::Stdio::null(),
            })
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ProviderError::Spawn {
            command: profile.command.clone(),
            source,
        })?;
        self.current.set(child.id());

        // Deliver the prompt off-task: a prompt larger than the OS pipe
        // buffer would otherwise deadlock against a child that is already
        // writing output.
        if profile.prompt_mode == PromptMode::Stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let prompt = request.prompt.clone();
                tokio::spawn(async move {
                    let _ = stdin.write_all(prompt.as_bytes()).await;
                    // closing the pipe signals EOF
                });
            }
        }

        let (line_tx, mut line_rx) = mpsc::channel::<(ProviderStream, String)>(256);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_lines(stdout, ProviderStream::Stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_lines(stderr, ProviderStream::Stderr, line_tx.clone()));
        }
        drop(line_tx);

        let deadline = tokio::time::Instant::now() + profile.timeout;
        let mut outcome = ProviderOutcome::default();

        loop {
            tokio::select! {
                line = line_rx.recv() => match line {
                    Some((stream, line)) => {
                        let _ = events
                            .send(ProviderEvent::Line { stream, line: line.clone() })
                            .await;
                        if let Some(marker) = Marker::parse_line(&line) {
                            outcome.absorb(&marker);
                            let _ = events.send(ProviderEvent::Marker(marker)).await;
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    outcome.timed_out = true;
                    break;
                }
            }
        }

        if outcome.timed_out {
            process::shutdown_group(&mut child, KILL_GRACE).await;
        } else {
            // Pipes closed; allow a short wait for the exit status, then
            // sweep up anything the provider left running in its group.
            match tokio::time::timeout(EXIT_WAIT, child.wait()).await {
                Ok(Ok(status)) => outcome.exit_code = status.code(),
                Ok(Err(_)) | Err(_) => {
                    process::shutdown_group(&mut child, KILL_GRACE).await;
                    outcome.exit_code = child.try_wait().ok().flatten().and_then(|s| s.code());
                }
            }
        }

        self.current.set(None);
        outcome.duration = start.elapsed();
        Ok(outcome)
    }

    fn group_handle(&self) -> ProviderGroupHandle {
        self.current.clone()
    }
}

async fn read_lines<R>(pipe: R, stream: ProviderStream, tx: mpsc::Sender<(ProviderStream, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send((stream, line)).await.is_err() {
            break;
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! Scripted provider for engine tests.

    use super::*;
    use std::collections::VecDeque;

    /// One scripted attempt.
    #[derive(Debug, Clone, Default)]
    pub struct FakeAttempt {
        pub markers: Vec<Marker>,
        pub exit_code: Option<i32>,
        pub timed_out: bool,
    }

    impl FakeAttempt {
        pub fn done() -> Self {
            Self { markers: vec![Marker::Done], exit_code: Some(0), ..Self::default() }
        }

        pub fn stuck(reason: &str) -> Self {
            Self {
                markers: vec![Marker::Stuck(Some(reason.to_string()))],
                exit_code: Some(0),
                ..Self::default()
            }
        }
    }

    /// Pops one scripted attempt per `run`; records every prompt it saw.
    #[derive(Debug, Default)]
    pub struct FakeProvider {
        attempts: Mutex<VecDeque<FakeAttempt>>,
        pub prompts: Mutex<Vec<String>>,
        handle: ProviderGroupHandle,
    }

    impl FakeProvider {
        pub fn scripted(attempts: impl IntoIterator<Item = FakeAttempt>) -> Self {
            Self {
                attempts: Mutex::new(attempts.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
                handle: ProviderGroupHandle::default(),
            }
        }

        pub fn runs(&self) -> usize {
            self.prompts.lock().len()
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeProvider {
        async fn run(
            &self,
            _profile: &ProviderProfile,
            request: ProviderRequest,
            events: mpsc::Sender<ProviderEvent>,
        ) -> Result<ProviderOutcome, ProviderError> {
            self.prompts.lock().push(request.prompt);
            let attempt = self.attempts.lock().pop_front().unwrap_or_default();

            let mut outcome = ProviderOutcome {
                exit_code: attempt.exit_code,
                timed_out: attempt.timed_out,
                ..ProviderOutcome::default()
            };
            for marker in attempt.markers {
                outcome.absorb(&marker);
                let _ = events.send(ProviderEvent::Marker(marker)).await;
            }
            Ok(outcome)
        }

        fn group_handle(&self) -> ProviderGroupHandle {
            self.handle.clone()
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
