// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run loop.
//!
//! Owns story selection, verify-at-top, attempt accounting, and every state
//! transition. One story is in flight at a time; all mutation happens on
//! this task, and the state file is flushed atomically after each
//! transition. Provider output is drained concurrently but applied here.

use crate::cleanup::{CleanupCoordinator, SharedObserver};
use crate::prompt::{self, PromptContext, LEARNINGS_CAP};
use crate::readiness::{self, ReadinessReport};
use crate::summary::RunSummary;
use crate::verify;
use parking_lot::Mutex;
use ralph_adapters::{
    Git, GitError, ProviderAdapter, ProviderError, ProviderEvent, ProviderRequest, ServiceError,
    ServiceSupervisor,
};
use ralph_core::{
    Clock, Config, ConfigError, LogRecord, Prd, ProviderProfile, RunEvent, RunState, Story,
};
use ralph_storage::{
    layout, state_store, EventLog, EventLogError, LockError, LockFile, StateStoreError, DATA_DIR,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Commit message for path-scoped state commits.
const STATE_COMMIT_MESSAGE: &str = "ralph: update run state";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateStoreError),

    #[error("refusing to start:\n{}", .0.issue_list())]
    NotReady(ReadinessReport),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Log(#[from] EventLogError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no feature state found under {0} — finalize a PRD first")]
    NoFeature(PathBuf),

    #[error("multiple features found ({0:?}); pass the feature name explicitly")]
    AmbiguousFeature(Vec<String>),
}

/// What to run and where.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub project_root: PathBuf,
    /// Feature name; discovered from the data directory when absent.
    pub feature: Option<String>,
}

/// Receives every emitted record, already timestamped, for console
/// rendering. The event log is written separately.
pub trait EventObserver: Send {
    fn observe(&mut self, record: &LogRecord);
}

/// Observer that ignores everything.
pub struct NullObserver;

impl EventObserver for NullObserver {
    fn observe(&mut self, _record: &LogRecord) {}
}

/// Timestamps events, writes them to the log, and fans out to the
/// observer. Log write failures are latched and re-raised at the next
/// checkpoint so the loop aborts instead of running unaudited.
struct Emitter<C: Clock> {
    clock: C,
    log: Arc<Mutex<EventLog>>,
    observer: SharedObserver,
    error: Option<EventLogError>,
}

impl<C: Clock> Emitter<C> {
    fn emit(&mut self, event: RunEvent) {
        let record = LogRecord::new(self.clock.epoch_ms(), event);
        if let Err(e) = self.log.lock().append(&record) {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
        self.observer.lock().observe(&record);
    }

    fn check(&mut self) -> Result<(), RunError> {
        match self.error.take() {
            Some(e) => Err(RunError::Log(e)),
            None => Ok(()),
        }
    }
}

/// Drives one feature to completion.
pub struct Runner<P, C> {
    options: RunOptions,
    provider: P,
    clock: C,
    coordinator: Arc<CleanupCoordinator>,
    observer: SharedObserver,
}

impl<P: ProviderAdapter, C: Clock> Runner<P, C> {
    pub fn new(
        options: RunOptions,
        provider: P,
        clock: C,
        coordinator: Arc<CleanupCoordinator>,
        observer: impl EventObserver + 'static,
    ) -> Self {
        let observer: SharedObserver = Arc::new(Mutex::new(observer));
        Self { options, provider, clock, coordinator, observer }
    }

    /// Run to completion. The cleanup coordinator fires on every return
    /// path; the signal path invokes it externally.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let result = self.run_inner().await;
        match &result {
            Ok(_) => self.coordinator.finish(self.clock.epoch_ms(), true, None).await,
            Err(e) => {
                let reason = e.to_string();
                self.coordinator
                    .finish(self.clock.epoch_ms(), false, Some(&reason))
                    .await;
            }
        }
        result
    }

    async fn run_inner(&self) -> Result<RunSummary, RunError> {
        let root = &self.options.project_root;
        let config = Config::load(root)?;
        let profile = ProviderProfile::resolve(&config.provider);
        let data_dir = layout::data_dir(root);

        let feature = match &self.options.feature {
            Some(feature) => feature.clone(),
            None => discover_feature(&data_dir)?,
        };
        let today = chrono::Utc::now().date_naive();
        let paths = layout::feature_paths(&data_dir, &feature, today);
        let prd = state_store::load_prd(&paths)?;
        let mut state = state_store::load_run_state(&paths)?;

        let report = readiness::check(root, &data_dir, &config, &prd).await;
        if !report.ok() {
            return Err(RunError::NotReady(report));
        }

        ensure_data_gitignore(&data_dir);

        let lock = LockFile::acquire(&data_dir, prd.feature(), &prd.branch)?;
        self.coordinator.register_lock(lock);

        let git = Git::new(root.clone());
        let default_branch = git.default_branch().await;
        let current = git.current_branch().await?;
        if current != prd.branch {
            if git.branch_exists(&prd.branch).await? {
                git.switch_branch(&prd.branch).await?;
            } else {
                // branch from the default, not the current HEAD, so a run
                // started from an unrelated branch does not carry its state
                git.create_branch(&prd.branch, &default_branch).await?;
            }
        }

        let log = if config.logging.enabled {
            EventLog::create(&paths.logs, config.logging.max_runs)?
        } else {
            EventLog::disabled()
        };
        let log = Arc::new(Mutex::new(log));
        self.coordinator.register_log(Arc::clone(&log), Arc::clone(&self.observer));
        let run_started = self.clock.now();
        self.coordinator.mark_started(run_started);
        self.coordinator.register_provider(self.provider.group_handle());

        let mut emitter = Emitter {
            clock: self.clock.clone(),
            log,
            observer: Arc::clone(&self.observer),
            error: None,
        };
        emitter.emit(RunEvent::RunStart {
            feature: prd.feature().to_string(),
            branch: prd.branch.clone(),
            stories: prd.stories.len(),
        });
        for warning in &report.warnings {
            emitter.emit(RunEvent::Warning { message: warning.clone() });
        }

        let services = Arc::new(ServiceSupervisor::new(config.services.clone())?);
        self.coordinator.register_services(Arc::clone(&services));
        let launch_report = services.ensure_running().await?;
        for ready in launch_report {
            if ready.launched {
                let start = config
                    .services
                    .iter()
                    .find(|s| s.name == ready.name)
                    .and_then(|s| s.start.clone())
                    .unwrap_or_default();
                emitter.emit(RunEvent::ServiceStart { name: ready.name.clone(), command: start });
            }
            emitter.emit(RunEvent::ServiceReady { name: ready.name, wait_ms: ready.wait_ms });
        }
        emitter.check()?;

        let mut iteration: u32 = 0;
        while let Some(story) = select_next(&prd, &state).cloned() {
            iteration += 1;
            let iter_started = self.clock.now();
            emitter.emit(RunEvent::IterationStart {
                story_id: story.id.clone(),
                iteration,
            });

            let passed = self
                .run_iteration(
                    &mut emitter,
                    &config,
                    &profile,
                    &git,
                    &default_branch,
                    &services,
                    &paths,
                    &data_dir,
                    &prd,
                    &story,
                    &mut state,
                )
                .await?;

            emitter.emit(RunEvent::IterationEnd {
                story_id: story.id.clone(),
                iteration,
                success: passed,
                duration_ms: self.clock.elapsed_ms(iter_started),
            });
            emitter.check()?;
        }

        let duration = self.clock.now() - run_started;
        Ok(RunSummary::build(&prd, &state, duration))
    }

    /// One loop iteration for one story. Returns whether the story passed.
    #[allow(clippy::too_many_arguments)]
    async fn run_iteration(
        &self,
        emitter: &mut Emitter<C>,
        config: &Config,
        profile: &ProviderProfile,
        git: &Git,
        default_branch: &str,
        services: &ServiceSupervisor,
        paths: &ralph_storage::FeaturePaths,
        data_dir: &std::path::Path,
        prd: &Prd,
        story: &Story,
        state: &mut RunState,
    ) -> Result<bool, RunError> {
        let root = &self.options.project_root;

        // Verify-at-top: skip stories that already pass, but only once the
        // branch carries real work. On a fresh branch every story would
        // "pass" before anything was implemented.
        if git.has_non_state_change(default_branch, DATA_DIR).await? {
            let outcome = verify::verify_story(
                root,
                &story.id,
                story.is_ui(),
                &config.verify,
                services,
                &mut |e| emitter.emit(e),
            )
            .await;
            if outcome.success {
                state.mark_passed(&story.id);
                state_store::save_run_state(paths, state)?;
                emitter.emit(state_change(
                    &story.id,
                    "pending",
                    "passed",
                    [("via".to_string(), "verify-at-top".to_string())],
                ));
                return Ok(true);
            }
        }

        let attempt = state.attempts(&story.id) + 1;
        let cross = state_store::cross_feature_learnings(data_dir, prd.feature());
        let diff_stat = git.diff_stat(default_branch).await?;
        let composed = prompt::compose(&PromptContext {
            story,
            attempt,
            last_failure: state.last_failure.get(&story.id).map(String::as_str),
            learnings: state.recent_learnings(LEARNINGS_CAP),
            cross_feature_learnings: &cross,
            diff_stat: &diff_stat,
            verify_commands: &config.verify.default,
            ui_verify_commands: &config.verify.ui,
            knowledge_file: &profile.knowledge_file,
        });

        // Keep state-file changes out of the provider's commits. Scoped to
        // the feature directory; the lock and logs are gitignored.
        if config.commits.prd_changes {
            let state_path = paths.dir.strip_prefix(root).unwrap_or(paths.dir.as_path());
            git.commit_path(&state_path.to_string_lossy(), STATE_COMMIT_MESSAGE).await?;
        }

        let head_before = git.head_hash().await?;
        emitter.emit(RunEvent::ProviderStart {
            story_id: story.id.clone(),
            command: profile.command.clone(),
        });

        let (tx, mut rx) = mpsc::channel::<ProviderEvent>(256);
        let request = ProviderRequest {
            story_id: story.id.clone(),
            prompt: composed,
            project_root: root.clone(),
        };
        let run_fut = self.provider.run(profile, request, tx);
        tokio::pin!(run_fut);
        let outcome = loop {
            tokio::select! {
                out = &mut run_fut => break out?,
                Some(event) = rx.recv() => apply_provider_event(emitter, &story.id, event),
            }
        };
        while let Ok(event) = rx.try_recv() {
            apply_provider_event(emitter, &story.id, event);
        }

        emitter.emit(RunEvent::ProviderEnd {
            story_id: story.id.clone(),
            success: outcome.done && !outcome.stuck && !outcome.timed_out,
            duration_ms: outcome.duration.as_millis() as u64,
            exit_code: outcome.exit_code,
        });

        // Learnings persist regardless of how the attempt ends.
        for learning in &outcome.learnings {
            if state.add_learning(learning) {
                emitter.emit(RunEvent::Learning { text: learning.trim().to_string() });
            }
        }
        state_store::save_run_state(paths, state)?;

        let head_after = git.head_hash().await?;
        let committed = head_after != head_before;

        let mut failure: Option<String> = if outcome.timed_out {
            Some(format!("provider timed out after {}s", profile.timeout.as_secs()))
        } else if outcome.stuck {
            Some(match &outcome.stuck_reason {
                Some(reason) => format!("provider reported STUCK: {reason}"),
                None => "provider reported STUCK".to_string(),
            })
        } else if !outcome.done {
            Some(match outcome.exit_code {
                Some(0) => "provider exited without emitting DONE".to_string(),
                Some(code) => format!("provider exited with status {code} without emitting DONE"),
                None => "provider was killed before emitting DONE".to_string(),
            })
        } else if !committed {
            Some("provider reported DONE but made no new commit".to_string())
        } else {
            None
        };

        if failure.is_none() {
            if !git.is_clean().await? {
                emitter.emit(RunEvent::Warning {
                    message: "provider left uncommitted changes in the working tree".to_string(),
                });
            }
            let outcome = verify::verify_story(
                root,
                &story.id,
                story.is_ui(),
                &config.verify,
                services,
                &mut |e| emitter.emit(e),
            )
            .await;
            if !outcome.success {
                failure =
                    Some(outcome.failure.unwrap_or_else(|| "verification failed".to_string()));
            }
        }

        match failure {
            None => {
                state.mark_passed(&story.id);
                state_store::save_run_state(paths, state)?;
                emitter.emit(state_change(
                    &story.id,
                    "pending",
                    "passed",
                    [("attempts".to_string(), attempt.to_string())],
                ));
                Ok(true)
            }
            Some(reason) => {
                let disposition = state.record_failure(&story.id, &reason, config.max_retries);
                state_store::save_run_state(paths, state)?;
                let (to, attempts) = match disposition {
                    ralph_core::state::FailureDisposition::Retry(n) => ("pending", n),
                    ralph_core::state::FailureDisposition::Skipped(n) => ("skipped", n),
                };
                emitter.emit(state_change(
                    &story.id,
                    "pending",
                    to,
                    [
                        ("attempts".to_string(), attempts.to_string()),
                        ("reason".to_string(), reason.clone()),
                    ],
                ));
                if to == "skipped" {
                    warn!(story = %story.id, attempts, "story skipped after exhausting retries");
                }
                Ok(false)
            }
        }
    }
}

fn apply_provider_event<C: Clock>(emitter: &mut Emitter<C>, story_id: &str, event: ProviderEvent) {
    match event {
        ProviderEvent::Line { stream, line } => emitter.emit(RunEvent::ProviderLine {
            story_id: story_id.to_string(),
            stream: stream.as_str().to_string(),
            line,
        }),
        ProviderEvent::Marker(marker) => emitter.emit(RunEvent::MarkerDetected {
            story_id: story_id.to_string(),
            marker: marker.kind().to_string(),
            value: marker.value().map(str::to_string),
        }),
    }
}

fn state_change(
    story_id: &str,
    from: &str,
    to: &str,
    data: impl IntoIterator<Item = (String, String)>,
) -> RunEvent {
    RunEvent::StateChange {
        story_id: story_id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        data: BTreeMap::from_iter(data),
    }
}

/// Lowest priority wins; ties break by PRD order (`min_by_key` keeps the
/// first minimum).
fn select_next<'a>(prd: &'a Prd, state: &RunState) -> Option<&'a Story> {
    prd.stories
        .iter()
        .filter(|story| state.is_pending(&story.id))
        .min_by_key(|story| story.priority)
}

/// The lock, the run logs, and temp files must never dirty the tree or be
/// swept into state commits; `prd.json` and `run-state.json` stay visible.
fn ensure_data_gitignore(data_dir: &std::path::Path) {
    let path = data_dir.join(".gitignore");
    if path.exists() {
        return;
    }
    if let Err(e) = std::fs::write(&path, ".gitignore\nralph.lock\nlogs/\n*.tmp\n") {
        warn!(path = %path.display(), error = %e, "failed to write data-dir gitignore");
    }
}

/// When no feature was named, there must be exactly one on disk.
fn discover_feature(data_dir: &std::path::Path) -> Result<String, RunError> {
    let mut features: Vec<String> = layout::list_feature_dirs(data_dir)
        .into_iter()
        .map(|(feature, _)| feature)
        .collect();
    features.dedup();
    match features.len() {
        0 => Err(RunError::NoFeature(data_dir.to_owned())),
        1 => Ok(features.remove(0)),
        _ => Err(RunError::AmbiguousFeature(features)),
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
