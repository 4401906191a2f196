// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band marker protocol on provider stdio.
//!
//! The provider signals lifecycle events by emitting whole-line tags of the
//! form `<ralph>BODY</ralph>` on stdout or stderr. Matching is anchored to
//! the entire trimmed line; substrings never match, so provider narration
//! ("the LEARNING section says...") cannot spoof a marker.

const OPEN: &str = "<ralph>";
const CLOSE: &str = "</ralph>";

/// A recognized marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Implementation complete; ready for verification.
    Done,
    /// The provider cannot proceed; counts as a failed attempt.
    Stuck(Option<String>),
    /// A learning to accumulate for this feature.
    Learning(String),
    /// A well-formed tag with no assigned semantics; logged, otherwise ignored.
    Advisory(String),
}

impl Marker {
    /// Parse one output line. Returns `None` for anything that is not a
    /// whole-line `<ralph>...</ralph>` tag.
    pub fn parse_line(line: &str) -> Option<Marker> {
        let body = line.trim().strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
        Some(match body {
            "DONE" => Marker::Done,
            "STUCK" => Marker::Stuck(None),
            _ => {
                if let Some(reason) = body.strip_prefix("STUCK:") {
                    Marker::Stuck(Some(reason.trim().to_string()))
                } else if let Some(text) = body.strip_prefix("LEARNING:") {
                    let text = text.trim();
                    if text.is_empty() {
                        Marker::Advisory(body.to_string())
                    } else {
                        Marker::Learning(text.to_string())
                    }
                } else {
                    Marker::Advisory(body.to_string())
                }
            }
        })
    }

    /// Marker name as logged in `marker:detected` events.
    pub fn kind(&self) -> &'static str {
        match self {
            Marker::Done => "DONE",
            Marker::Stuck(_) => "STUCK",
            Marker::Learning(_) => "LEARNING",
            Marker::Advisory(_) => "ADVISORY",
        }
    }

    /// Payload carried by the marker, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Marker::Done => None,
            Marker::Stuck(reason) => reason.as_deref(),
            Marker::Learning(text) => Some(text),
            Marker::Advisory(body) => Some(body),
        }
    }

    /// The literal lines a provider must emit, for the prompt contract.
    pub fn contract() -> String {
        format!(
            "{OPEN}DONE{CLOSE}\n{OPEN}STUCK:reason{CLOSE}\n{OPEN}LEARNING:text{CLOSE}"
        )
    }
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
