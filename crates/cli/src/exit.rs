// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process exit codes.
//!
//! The contract is small: 0 when the run loop finishes (skipped stories
//! included — a skip is a completed outcome), 1 for configuration,
//! readiness, and runtime failures, 2 for usage errors (clap owns those),
//! and 130 after a signal-initiated shutdown.

use std::fmt;

/// Configuration, readiness, or runtime failure.
pub const FAILURE: i32 = 1;

/// Signal-initiated shutdown.
pub const INTERRUPTED: i32 = 130;

/// Marker error for the signal path. By the time this bubbles up the
/// cleanup coordinator has already run and the handler has already
/// reported to stderr, so `main()` exits 130 without printing anything.
#[derive(Debug)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interrupted by signal")
    }
}

impl std::error::Error for Interrupted {}
