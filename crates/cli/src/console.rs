// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console rendering of run events.
//!
//! The event log carries the full record; the console shows a readable
//! subset, honoring the `logging.consoleTimestamps` / `consoleDurations`
//! settings. Provider output is echoed verbatim.

use crate::color;
use chrono::{Local, TimeZone};
use ralph_core::{LogRecord, LoggingConfig, RunEvent};
use ralph_engine::EventObserver;

pub struct ConsoleObserver {
    timestamps: bool,
    durations: bool,
}

impl ConsoleObserver {
    pub fn new(logging: &LoggingConfig) -> Self {
        Self {
            timestamps: logging.console_timestamps,
            durations: logging.console_durations,
        }
    }

    fn prefix(&self, ts_ms: u64) -> String {
        if !self.timestamps {
            return String::new();
        }
        let stamp = Local
            .timestamp_millis_opt(ts_ms as i64)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        format!("{} ", color::muted(&stamp))
    }

    fn duration(&self, ms: u64) -> String {
        if !self.durations {
            return String::new();
        }
        format!(" {}", color::muted(&format!("({})", fmt_ms(ms))))
    }
}

impl EventObserver for ConsoleObserver {
    fn observe(&mut self, record: &LogRecord) {
        let p = self.prefix(record.ts);
        match &record.event {
            RunEvent::RunStart { feature, branch, stories } => {
                println!(
                    "{p}{} {feature} — {stories} stories on {branch}",
                    color::header("ralph run:")
                );
            }
            RunEvent::RunEnd { success, reason, duration_ms } => {
                let d = self.duration(*duration_ms);
                match (success, reason) {
                    (true, _) => println!("{p}{}{d}", color::good("run complete")),
                    (false, Some(reason)) => {
                        println!("{p}{}{d} — {reason}", color::bad("run stopped"))
                    }
                    (false, None) => println!("{p}{}{d}", color::bad("run stopped")),
                }
            }
            RunEvent::IterationStart { story_id, iteration } => {
                println!(
                    "{p}{}",
                    color::header(&format!("── {story_id} · attempt {iteration} ──"))
                );
            }
            RunEvent::IterationEnd { story_id, success, duration_ms, .. } => {
                let d = self.duration(*duration_ms);
                if *success {
                    println!("{p}{} {story_id}{d}", color::good("✓"));
                } else {
                    println!("{p}{} {story_id}{d}", color::bad("✗"));
                }
            }
            RunEvent::ProviderStart { command, .. } => {
                println!("{p}provider: {command}");
            }
            RunEvent::ProviderLine { line, .. } => {
                println!("{line}");
            }
            RunEvent::ProviderEnd { duration_ms, exit_code, .. } => {
                let d = self.duration(*duration_ms);
                match exit_code {
                    Some(code) => println!("{p}provider exited with {code}{d}"),
                    None => println!("{p}provider killed{d}"),
                }
            }
            RunEvent::MarkerDetected { marker, value, .. } => {
                match value {
                    Some(value) => println!("{p}marker: {marker} — {value}"),
                    None => println!("{p}marker: {marker}"),
                }
            }
            RunEvent::VerifyStart { commands, .. } => {
                println!("{p}verifying ({commands} commands)");
            }
            RunEvent::VerifyCmdStart { command, .. } => {
                println!("{p}$ {command}");
            }
            RunEvent::VerifyCmdEnd { success, duration_ms, .. } => {
                let d = self.duration(*duration_ms);
                if *success {
                    println!("{p}  {}{d}", color::good("ok"));
                } else {
                    println!("{p}  {}{d}", color::bad("failed"));
                }
            }
            RunEvent::VerifyEnd { success, failure, .. } => {
                if !success {
                    if let Some(failure) = failure {
                        println!("{p}{}: {failure}", color::bad("verification failed"));
                    }
                }
            }
            RunEvent::ServiceStart { name, command } => {
                println!("{p}service {name}: {command}");
            }
            RunEvent::ServiceReady { name, wait_ms } => {
                let d = self.duration(*wait_ms);
                println!("{p}service {name} ready{d}");
            }
            RunEvent::StateChange { story_id, from, to, .. } => {
                println!("{p}{story_id}: {from} → {to}");
            }
            RunEvent::Learning { text } => {
                println!("{p}learning: {text}");
            }
            RunEvent::Warning { message } => {
                println!("{p}{}: {message}", color::bad("warning"));
            }
            RunEvent::Error { message } => {
                println!("{p}{}: {message}", color::bad("error"));
            }
        }
    }
}

/// "850ms", "12.3s", "4m12s"
pub fn fmt_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
