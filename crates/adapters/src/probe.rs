// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP readiness probing for managed services.
//!
//! A service is ready when a GET of its ready URL answers with any status
//! below 500 — a 404 from a dev server that is up counts. Connection
//! errors and timeouts mean "not ready".

use std::time::Duration;
use thiserror::Error;

/// Per-request timeout; the caller owns the overall readiness deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Shared HTTP prober for ready URLs.
#[derive(Debug, Clone)]
pub struct Probe {
    client: reqwest::Client,
}

impl Probe {
    pub fn new() -> Result<Probe, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ProbeError::Client)?;
        Ok(Probe { client })
    }

    /// Status code of a GET, or `None` when the request failed outright.
    pub async fn status(&self, url: &str) -> Option<u16> {
        match self.client.get(url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(_) => None,
        }
    }

    /// Ready means: responded, and status < 500.
    pub async fn is_ready(&self, url: &str) -> bool {
        matches!(self.status(url).await, Some(status) if status < 500)
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
