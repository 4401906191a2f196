// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time sources for the run loop.
//!
//! Event records carry wall-clock timestamps while iteration durations and
//! provider deadlines are measured monotonically. Both readings come from
//! one `Clock` handle so the loop, the logger, and the cleanup coordinator
//! agree on time — and so tests can drive it by hand instead of sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Clone + Send + Sync {
    /// Monotonic reading, for durations and deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, as stamped into
    /// event records.
    fn epoch_ms(&self) -> u64;

    /// Milliseconds elapsed since an earlier `now()` reading.
    fn elapsed_ms(&self, since: Instant) -> u64 {
        self.now().saturating_duration_since(since).as_millis() as u64
    }
}

/// Process clock backed by the operating system.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Hand-driven clock for tests; time moves only through [`FakeClock::advance`].
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeTime>>,
}

struct FakeTime {
    instant: Instant,
    epoch_ms: u64,
}

impl FakeClock {
    /// Start at the given wall-clock time, with an arbitrary monotonic
    /// origin.
    pub fn at_epoch_ms(epoch_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeTime { instant: Instant::now(), epoch_ms })),
        }
    }

    /// Move both readings forward; every clone of this clock sees the
    /// change.
    pub fn advance(&self, by: Duration) {
        let mut time = self.inner.lock();
        time.instant += by;
        time.epoch_ms += by.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at_epoch_ms(0)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
