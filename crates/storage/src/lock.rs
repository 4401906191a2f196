// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory run lock with stale detection.
//!
//! One `ralph.lock` per data directory guarantees a single writer per
//! project. The record names the holder so contention messages are useful.
//! Staleness combines a liveness probe with a 24-hour age ceiling: a live
//! PID alone is not proof of a live run (PID reuse after reboot), and a
//! dead PID is always stale.

use chrono::{DateTime, Utc};
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::layout::LOCK_FILE;

/// Locks older than this are stale even if the recorded PID is alive.
pub const STALE_AFTER_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "another run is active: pid {pid}, feature {feature:?}, started {started_at} (lock: {path})"
    )]
    Held {
        pid: u32,
        feature: String,
        started_at: String,
        path: PathBuf,
    },

    #[error("io error on lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Contents of `ralph.lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub feature: String,
    pub branch: String,
}

impl LockRecord {
    /// Stale means: dead PID, or older than the 24-hour ceiling.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if !pid_alive(self.pid) {
            return true;
        }
        now.signed_duration_since(self.started_at) > chrono::Duration::hours(STALE_AFTER_HOURS)
    }
}

/// An acquired advisory lock. Release is explicit and idempotent; the
/// cleanup coordinator owns the release on every exit path.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl LockFile {
    /// Acquire the lock in `data_dir`, removing a stale holder if present.
    pub fn acquire(data_dir: &Path, feature: &str, branch: &str) -> Result<LockFile, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let record = LockRecord {
            pid: std::process::id(),
            started_at: Utc::now(),
            feature: feature.to_string(),
            branch: branch.to_string(),
        };

        match Self::try_create(&path, &record) {
            Ok(()) => return Ok(Self::held(path, record.pid)),
            Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => {
                return Err(LockError::Io { path, source: e });
            }
            Err(_) => {}
        }

        // Lock exists. Unparseable or stale holders are removed; one retry.
        let holder: Option<LockRecord> = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok());

        match holder {
            Some(holder) if !holder.is_stale(Utc::now()) => Err(LockError::Held {
                pid: holder.pid,
                feature: holder.feature,
                started_at: holder.started_at.to_rfc3339(),
                path,
            }),
            holder => {
                if let Some(holder) = &holder {
                    warn!(pid = holder.pid, "removing stale run lock");
                } else {
                    warn!(path = %path.display(), "removing unparseable run lock");
                }
                std::fs::remove_file(&path)
                    .map_err(|source| LockError::Io { path: path.clone(), source })?;
                Self::try_create(&path, &record)
                    .map_err(|source| LockError::Io { path: path.clone(), source })?;
                Ok(Self::held(path, record.pid))
            }
        }
    }

    /// Exclusive create; fails with `AlreadyExists` when a lock is present.
    fn try_create(path: &Path, record: &LockRecord) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        file.write_all(&bytes)?;
        file.sync_all()
    }

    fn held(path: PathBuf, pid: u32) -> LockFile {
        LockFile { path, pid, released: false }
    }

    /// Remove the lock file, but only if it still records our PID.
    /// Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let ours = std::fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<LockRecord>(&bytes).ok())
            .is_some_and(|record| record.pid == self.pid);
        if ours {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Signal-0 probe: does the PID name a live process we can see?
fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
