// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent teardown coordinator.
//!
//! Process exit arrives from many paths (normal completion, runtime error,
//! signal), and signals bypass scope exit, so every resource registers here
//! and teardown happens exactly once. Order: silence the provider first,
//! then stop services, then make the run auditable (final `run:end` event,
//! flush, close), then release the lock so future invocations can start.

use crate::runner::EventObserver;
use parking_lot::Mutex;
use ralph_adapters::{ProviderGroupHandle, ServiceSupervisor};
use ralph_core::{LogRecord, RunEvent};
use ralph_storage::{EventLog, LockFile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Grace between TERM and KILL on the provider group during teardown.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Observer shared between the runner and the coordinator.
pub type SharedObserver = Arc<Mutex<dyn EventObserver + Send>>;

/// Registry of live resources plus a done-flag.
#[derive(Default)]
pub struct CleanupCoordinator {
    finished: AtomicBool,
    provider: Mutex<Option<ProviderGroupHandle>>,
    services: Mutex<Option<Arc<ServiceSupervisor>>>,
    log: Mutex<Option<Arc<Mutex<EventLog>>>>,
    observer: Mutex<Option<SharedObserver>>,
    lock: Mutex<Option<LockFile>>,
    started: Mutex<Option<Instant>>,
}

impl CleanupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&self, handle: ProviderGroupHandle) {
        *self.provider.lock() = Some(handle);
    }

    pub fn register_services(&self, services: Arc<ServiceSupervisor>) {
        *self.services.lock() = Some(services);
    }

    pub fn register_log(&self, log: Arc<Mutex<EventLog>>, observer: SharedObserver) {
        *self.log.lock() = Some(log);
        *self.observer.lock() = Some(observer);
    }

    pub fn register_lock(&self, lock: LockFile) {
        *self.lock.lock() = Some(lock);
    }

    pub fn mark_started(&self, at: Instant) {
        *self.started.lock() = Some(at);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Tear everything down exactly once. Later calls are no-ops, which
    /// also coalesces concurrent signal deliveries.
    pub async fn finish(&self, ts_ms: u64, success: bool, reason: Option<&str>) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(success, reason = reason.unwrap_or(""), "cleaning up run");

        // Take everything out under short lock holds; all awaits happen
        // with no guard held.
        let provider = self.provider.lock().take();
        let services = self.services.lock().take();
        let log = self.log.lock().take();
        let observer = self.observer.lock().take();
        let lock = self.lock.lock().take();
        let started = self.started.lock().take();

        if let Some(provider) = provider {
            provider.kill(KILL_GRACE).await;
        }

        if let Some(services) = services {
            services.stop_all().await;
        }

        let record = LogRecord::new(
            ts_ms,
            RunEvent::RunEnd {
                success,
                reason: reason.map(str::to_string),
                duration_ms: started.map(|s| s.elapsed().as_millis() as u64).unwrap_or(0),
            },
        );
        if let Some(log) = log {
            let mut log = log.lock();
            let _ = log.append(&record);
            log.close();
        }
        if let Some(observer) = observer {
            observer.lock().observe(&record);
        }

        if let Some(mut lock) = lock {
            lock.release();
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
