// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle events, persisted one JSON object per line.
//!
//! Serializes with `{"ts":N,"event":"kind:name",...fields}` format. The
//! enumeration is closed: the logger only ever writes these kinds, and the
//! log-rendering tooling relies on that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single event record as it appears in `logs/run-NNN.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Milliseconds since the Unix epoch at capture time.
    pub ts: u64,
    #[serde(flatten)]
    pub event: RunEvent,
}

impl LogRecord {
    pub fn new(ts: u64, event: RunEvent) -> Self {
        Self { ts, event }
    }
}

/// Lifecycle events emitted by the run loop and its subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RunEvent {
    // -- run --
    #[serde(rename = "run:start")]
    RunStart {
        feature: String,
        branch: String,
        stories: usize,
    },

    #[serde(rename = "run:end")]
    RunEnd {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        duration_ms: u64,
    },

    // -- iteration --
    #[serde(rename = "iteration:start")]
    IterationStart { story_id: String, iteration: u32 },

    #[serde(rename = "iteration:end")]
    IterationEnd {
        story_id: String,
        iteration: u32,
        success: bool,
        duration_ms: u64,
    },

    // -- provider --
    #[serde(rename = "provider:start")]
    ProviderStart { story_id: String, command: String },

    #[serde(rename = "provider:line")]
    ProviderLine {
        story_id: String,
        /// "stdout" or "stderr"
        stream: String,
        line: String,
    },

    #[serde(rename = "provider:end")]
    ProviderEnd {
        story_id: String,
        success: bool,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    #[serde(rename = "marker:detected")]
    MarkerDetected {
        story_id: String,
        marker: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    // -- verify --
    #[serde(rename = "verify:start")]
    VerifyStart { story_id: String, commands: usize },

    #[serde(rename = "verify:cmd-start")]
    VerifyCmdStart { story_id: String, command: String },

    #[serde(rename = "verify:cmd-end")]
    VerifyCmdEnd {
        story_id: String,
        command: String,
        success: bool,
        duration_ms: u64,
    },

    #[serde(rename = "verify:end")]
    VerifyEnd {
        story_id: String,
        success: bool,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<String>,
    },

    // -- services --
    #[serde(rename = "service:start")]
    ServiceStart { name: String, command: String },

    #[serde(rename = "service:ready")]
    ServiceReady { name: String, wait_ms: u64 },

    // -- state --
    #[serde(rename = "state:change")]
    StateChange {
        story_id: String,
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        data: BTreeMap<String, String>,
    },

    #[serde(rename = "learning")]
    Learning { text: String },

    #[serde(rename = "warning")]
    Warning { message: String },

    #[serde(rename = "error")]
    Error { message: String },
}

impl RunEvent {
    /// Short kind tag, matching the serialized `event` field.
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::RunStart { .. } => "run:start",
            RunEvent::RunEnd { .. } => "run:end",
            RunEvent::IterationStart { .. } => "iteration:start",
            RunEvent::IterationEnd { .. } => "iteration:end",
            RunEvent::ProviderStart { .. } => "provider:start",
            RunEvent::ProviderLine { .. } => "provider:line",
            RunEvent::ProviderEnd { .. } => "provider:end",
            RunEvent::MarkerDetected { .. } => "marker:detected",
            RunEvent::VerifyStart { .. } => "verify:start",
            RunEvent::VerifyCmdStart { .. } => "verify:cmd-start",
            RunEvent::VerifyCmdEnd { .. } => "verify:cmd-end",
            RunEvent::VerifyEnd { .. } => "verify:end",
            RunEvent::ServiceStart { .. } => "service:start",
            RunEvent::ServiceReady { .. } => "service:ready",
            RunEvent::StateChange { .. } => "state:change",
            RunEvent::Learning { .. } => "learning",
            RunEvent::Warning { .. } => "warning",
            RunEvent::Error { .. } => "error",
        }
    }

    /// The story this event is scoped to, if any.
    pub fn story_id(&self) -> Option<&str> {
        match self {
            RunEvent::IterationStart { story_id, .. }
            | RunEvent::IterationEnd { story_id, .. }
            | RunEvent::ProviderStart { story_id, .. }
            | RunEvent::ProviderLine { story_id, .. }
            | RunEvent::ProviderEnd { story_id, .. }
            | RunEvent::MarkerDetected { story_id, .. }
            | RunEvent::VerifyStart { story_id, .. }
            | RunEvent::VerifyCmdStart { story_id, .. }
            | RunEvent::VerifyCmdEnd { story_id, .. }
            | RunEvent::VerifyEnd { story_id, .. }
            | RunEvent::StateChange { story_id, .. } => Some(story_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
