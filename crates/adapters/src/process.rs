// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-group discipline for supervised children.
//!
//! Every child ralph launches (provider, services, verify commands) is
//! started as its own process-group leader via `process_group(0)`, and all
//! kills signal the whole group. Package-manager wrappers fork the real
//! server; signaling only the wrapper leaks the server and blocks the port
//! for the next run.

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::process::Child;
use tracing::debug;

/// Signal an entire process group. Returns false when the group is gone.
pub fn signal_group(pid: u32, signal: Signal) -> bool {
    killpg(Pid::from_raw(pid as i32), signal).is_ok()
}

/// Graceful group shutdown: SIGTERM, wait up to `grace`, then SIGKILL and
/// reap. Safe to call on an already-exited child.
pub async fn shutdown_group(child: &mut Child, grace: Duration) {
    let Some(pid) = child.id() else {
        // already reaped
        return;
    };

    signal_group(pid, Signal::SIGTERM);
    if tokio::time::timeout(grace, child.wait()).await.is_ok() {
        return;
    }

    debug!(pid, "group survived SIGTERM, escalating to SIGKILL");
    signal_group(pid, Signal::SIGKILL);
    let _ = child.wait().await;
}

/// Kill a process group by id when no `Child` handle is available (e.g. the
/// cleanup coordinator signaling the in-flight provider). The owning task
/// still reaps the child.
pub async fn kill_group_by_id(pid: u32, grace: Duration) {
    if !signal_group(pid, Signal::SIGTERM) {
        return;
    }
    tokio::time::sleep(grace).await;
    signal_group(pid, Signal::SIGKILL);
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
