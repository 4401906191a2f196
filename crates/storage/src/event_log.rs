// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rotated per-run JSONL event logs.
//!
//! Each run appends to its own `logs/run-NNN.jsonl`; the sequence number is
//! `max+1` over the existing files. Rotation deletes the oldest files beyond
//! the retention limit before the new file is created. Writes are
//! line-buffered with an explicit flush per event so the log is complete up
//! to the last event even after a crash.

use ralph_core::LogRecord;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const FILE_PREFIX: &str = "run-";
const FILE_SUFFIX: &str = ".jsonl";

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("io error on event log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode event: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only writer for one run's event stream.
pub struct EventLog {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
}

impl EventLog {
    /// Create the next `run-NNN.jsonl` in `logs_dir`, rotating old runs out.
    pub fn create(logs_dir: &Path, max_runs: usize) -> Result<EventLog, EventLogError> {
        let io_err = |path: &Path| {
            let path = path.to_owned();
            move |source| EventLogError::Io { path, source }
        };

        std::fs::create_dir_all(logs_dir).map_err(io_err(logs_dir))?;

        let mut existing = list_run_logs(logs_dir);

        // Retention: keep max_runs - 1 so the new file fits within the cap.
        let keep = max_runs.saturating_sub(1);
        while existing.len() > keep {
            let (_, path) = existing.remove(0);
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to rotate old run log");
            }
        }

        let next_seq = existing.last().map(|(seq, _)| seq + 1).unwrap_or(1);
        let path = logs_dir.join(format!("{FILE_PREFIX}{next_seq:03}{FILE_SUFFIX}"));
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .map_err(io_err(&path))?;

        Ok(EventLog { writer: Some(BufWriter::new(file)), path })
    }

    /// A logger that drops everything, for `logging.enabled = false`.
    pub fn disabled() -> EventLog {
        EventLog { writer: None, path: PathBuf::new() }
    }

    /// Append one record and flush it to disk.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), EventLogError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|source| EventLogError::Io { path: self.path.clone(), source })
    }

    /// Flush and stop writing. Idempotent; further appends are dropped.
    pub fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!(path = %self.path.display(), error = %e, "failed to flush event log");
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Existing run logs in `logs_dir`, ordered by sequence number.
pub fn list_run_logs(logs_dir: &Path) -> Vec<(u32, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(logs_dir) else {
        return Vec::new();
    };
    let mut logs: Vec<(u32, PathBuf)> = entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let seq = name
                .strip_prefix(FILE_PREFIX)?
                .strip_suffix(FILE_SUFFIX)?
                .parse::<u32>()
                .ok()?;
            Some((seq, e.path()))
        })
        .collect();
    logs.sort();
    logs
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
