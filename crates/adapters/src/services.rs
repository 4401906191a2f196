// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed-service lifecycle.
//!
//! Dev servers are started via `sh -c` in their own process groups, probed
//! for readiness over HTTP, optionally restarted before UI verification,
//! and torn down with a group TERM → KILL on every exit path. Output is
//! captured into a bounded ring buffer per service for diagnostics.

use crate::probe::{Probe, ProbeError};
use crate::process;
use parking_lot::Mutex;
use ralph_core::ServiceConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Poll cadence while waiting for a ready URL.
const READY_POLL: Duration = Duration::from_millis(500);

/// Grace between TERM and KILL during a pre-verify restart.
const RESTART_GRACE: Duration = Duration::from_secs(2);

/// Pause after killing a service so its port is released before relaunch.
const PORT_RELEASE_PAUSE: Duration = Duration::from_secs(1);

/// Grace between TERM and KILL during final shutdown.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Soft cap on captured output per service.
const OUTPUT_CAP: usize = 256 * 1024;

/// How much captured output to attach to a readiness failure.
const DIAGNOSTIC_TAIL: usize = 2 * 1024;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to start service {name:?}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("service {name:?} not ready after {timeout:?}: {detail}")]
    NotReady {
        name: String,
        timeout: Duration,
        detail: String,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// How one service came up during `ensure_running` / `restart_for_verify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReadiness {
    pub name: String,
    /// False when the ready URL already answered and nothing was launched.
    pub launched: bool,
    pub wait_ms: u64,
}

/// Bounded capture of a service's combined output, trimmed from the front.
#[derive(Debug)]
pub struct RingBuffer {
    data: VecDeque<u8>,
    cap: usize,
}

impl RingBuffer {
    pub fn new(cap: usize) -> Self {
        Self { data: VecDeque::new(), cap }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.data.extend(bytes);
        while self.data.len() > self.cap {
            self.data.pop_front();
        }
    }

    /// Up to the last `n` bytes, lossily decoded.
    pub fn tail(&self, n: usize) -> String {
        let skip = self.data.len().saturating_sub(n);
        let bytes: Vec<u8> = self.data.iter().skip(skip).copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct ServiceProc {
    child: Child,
    output: Arc<Mutex<RingBuffer>>,
}

/// Supervisor for all configured services.
pub struct ServiceSupervisor {
    services: Vec<ServiceConfig>,
    probe: Probe,
    procs: Mutex<HashMap<String, ServiceProc>>,
}

impl ServiceSupervisor {
    pub fn new(services: Vec<ServiceConfig>) -> Result<Self, ServiceError> {
        Ok(Self {
            services,
            probe: Probe::new()?,
            procs: Mutex::new(HashMap::new()),
        })
    }

    pub fn services(&self) -> &[ServiceConfig] {
        &self.services
    }

    /// Bring every service up: ready URLs that already answer are left
    /// alone; everything else is launched (when a start command exists)
    /// and awaited.
    pub async fn ensure_running(&self) -> Result<Vec<ServiceReadiness>, ServiceError> {
        let mut report = Vec::with_capacity(self.services.len());
        for service in &self.services {
            if self.probe.is_ready(&service.ready).await {
                debug!(service = %service.name, "already answering, not launching");
                report.push(ServiceReadiness {
                    name: service.name.clone(),
                    launched: false,
                    wait_ms: 0,
                });
                continue;
            }
            if service.start.is_none() {
                return Err(ServiceError::NotReady {
                    name: service.name.clone(),
                    timeout: Duration::ZERO,
                    detail: "not answering and no start command configured".to_string(),
                });
            }
            self.launch(service)?;
            let wait_ms = self.ready_wait(service).await?;
            report.push(ServiceReadiness {
                name: service.name.clone(),
                launched: true,
                wait_ms,
            });
        }
        Ok(report)
    }

    /// Restart every restart-before-verify service: group kill, reap,
    /// pause for port release, relaunch, ready-wait.
    pub async fn restart_for_verify(&self) -> Result<Vec<ServiceReadiness>, ServiceError> {
        let mut report = Vec::new();
        for service in &self.services {
            if !service.restart_before_verify {
                continue;
            }
            let existing = self.procs.lock().remove(&service.name);
            if let Some(mut proc) = existing {
                info!(service = %service.name, "restarting before verify");
                process::shutdown_group(&mut proc.child, RESTART_GRACE).await;
                tokio::time::sleep(PORT_RELEASE_PAUSE).await;
            }
            if service.start.is_some() {
                self.launch(service)?;
            }
            let wait_ms = self.ready_wait(service).await?;
            report.push(ServiceReadiness {
                name: service.name.clone(),
                launched: service.start.is_some(),
                wait_ms,
            });
        }
        Ok(report)
    }

    /// Post-verification health check: names of services whose ready URL
    /// no longer answers. Any entry is a verification failure.
    pub async fn check_health(&self) -> Vec<String> {
        let mut failing = Vec::new();
        for service in &self.services {
            if !self.probe.is_ready(&service.ready).await {
                failing.push(service.name.clone());
            }
        }
        failing
    }

    /// Stop every launched service. Idempotent: the process table is
    /// drained on the first call, so repeat calls see nothing to do.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, ServiceProc)> = self.procs.lock().drain().collect();
        for (name, mut proc) in drained {
            info!(service = %name, "stopping");
            process::shutdown_group(&mut proc.child, STOP_GRACE).await;
        }
    }

    /// Recent captured output for a launched service.
    pub fn output_tail(&self, name: &str, n: usize) -> Option<String> {
        self.procs.lock().get(name).map(|p| p.output.lock().tail(n))
    }

    fn launch(&self, service: &ServiceConfig) -> Result<(), ServiceError> {
        // checked by callers; launch without a start command is a bug
        let Some(start) = service.start.as_deref() else {
            return Err(ServiceError::Spawn {
                name: service.name.clone(),
                source: std::io::Error::other("no start command"),
            });
        };

        info!(service = %service.name, command = start, "launching");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(start)
            .process_group(0)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|source| ServiceError::Spawn { name: service.name.clone(), source })?;

        let output = Arc::new(Mutex::new(RingBuffer::new(OUTPUT_CAP)));
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, Arc::clone(&output)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, Arc::clone(&output)));
        }

        self.procs
            .lock()
            .insert(service.name.clone(), ServiceProc { child, output });
        Ok(())
    }

    async fn ready_wait(&self, service: &ServiceConfig) -> Result<u64, ServiceError> {
        let timeout = Duration::from_secs(service.ready_timeout);
        let start = Instant::now();
        loop {
            if self.probe.is_ready(&service.ready).await {
                return Ok(start.elapsed().as_millis() as u64);
            }
            if start.elapsed() >= timeout {
                let detail = self
                    .output_tail(&service.name, DIAGNOSTIC_TAIL)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "no output captured".to_string());
                return Err(ServiceError::NotReady {
                    name: service.name.clone(),
                    timeout,
                    detail,
                });
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

async fn pump<R: AsyncRead + Unpin>(mut pipe: R, buf: Arc<Mutex<RingBuffer>>) {
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.lock().push(&chunk[..n]),
        }
    }
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;
