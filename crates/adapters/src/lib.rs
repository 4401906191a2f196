// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ralph-adapters: everything that touches processes and the network
//!
//! The engine stays testable because the messy parts live here: the git
//! CLI, HTTP readiness probes, process-group discipline, the AI provider
//! subprocess, and the managed dev services.

pub mod git;
pub mod probe;
pub mod process;
pub mod provider;
pub mod services;

pub use git::{Git, GitError};
pub use probe::Probe;
pub use provider::{
    CliProvider, ProviderAdapter, ProviderError, ProviderEvent, ProviderGroupHandle,
    ProviderOutcome, ProviderRequest, ProviderStream,
};
pub use services::{ServiceError, ServiceReadiness, ServiceSupervisor};

#[cfg(any(test, feature = "test-support"))]
pub use provider::fake::{FakeAttempt, FakeProvider};
