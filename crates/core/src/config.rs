// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration, loaded from `ralph.json` at the project root.
//!
//! Unknown keys are tolerated. Defaults follow the documented table; the
//! provider block additionally gets per-command defaults applied by
//! [`crate::provider::ProviderProfile::resolve`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file at the project root.
pub const CONFIG_FILE: &str = "ralph.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    pub provider: ProviderConfig,
    pub services: Vec<ServiceConfig>,
    pub verify: VerifyConfig,
    #[serde(default)]
    pub commits: CommitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub command: String,
    /// `None` means "use the default args for this command name";
    /// an explicit empty array means "no args".
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Per-iteration timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub prompt_mode: Option<crate::provider::PromptMode>,
    #[serde(default)]
    pub prompt_flag: Option<String>,
    #[serde(default)]
    pub knowledge_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub start: Option<String>,
    /// HTTP readiness URL; any response with status < 500 counts as ready.
    pub ready: String,
    /// Readiness timeout in seconds.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout: u64,
    #[serde(default)]
    pub restart_before_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyConfig {
    pub default: Vec<String>,
    #[serde(default)]
    pub ui: Vec<String>,
    /// Per-command timeout in seconds.
    #[serde(default = "default_verify_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitsConfig {
    /// Commit PRD/state-file changes before each provider attempt, so state
    /// updates never mix into the provider's implementation commits.
    #[serde(default = "default_true")]
    pub prd_changes: bool,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self { prd_changes: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_runs")]
    pub max_runs: usize,
    #[serde(default = "default_true")]
    pub console_timestamps: bool,
    #[serde(default = "default_true")]
    pub console_durations: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_runs: default_max_runs(),
            console_timestamps: true,
            console_durations: true,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_provider_timeout() -> u64 {
    1800
}

fn default_ready_timeout() -> u64 {
    30
}

fn default_verify_timeout() -> u64 {
    300
}

fn default_max_runs() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load and validate the config at `<root>/ralph.json`.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let bytes = std::fs::read(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Config = serde_json::from_slice(&bytes)
            .map_err(|source| ConfigError::Json { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.command.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.command is empty".to_string()));
        }
        if self.services.is_empty() {
            return Err(ConfigError::Invalid(
                "services must list at least one service".to_string(),
            ));
        }
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Invalid("service with an empty name".to_string()));
            }
            if service.ready.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "service {:?} has no ready URL",
                    service.name
                )));
            }
        }
        if self.verify.default.is_empty() {
            return Err(ConfigError::Invalid(
                "verify.default must list at least one command".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("maxRetries must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
