// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ralph-storage: durable state for the ralph orchestrator
//!
//! Everything ralph persists lives under the project-local data directory:
//! the advisory lock, one dated directory per feature holding the PRD and
//! run state, and the rotated per-run event logs. All JSON writes go
//! through the atomic store so a crash never leaves a corrupt file behind.

pub mod atomic;
pub mod event_log;
pub mod layout;
pub mod lock;
pub mod state_store;

pub use atomic::AtomicWriteError;
pub use event_log::{EventLog, EventLogError};
pub use layout::{FeaturePaths, DATA_DIR, LOCK_FILE};
pub use lock::{LockError, LockFile, LockRecord};
pub use state_store::{load_prd, load_run_state, save_run_state, StateStoreError};
