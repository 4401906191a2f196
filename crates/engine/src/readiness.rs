// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-run readiness gate.
//!
//! Validates the environment, the configuration, and the PRD before any
//! lock is taken or service started. A non-empty issue list refuses the
//! run; warnings are surfaced but never block.

use ralph_adapters::Git;
use ralph_core::{Config, Prd, ProviderProfile};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Verify commands produced by `ralph init` that were never replaced.
pub const VERIFY_PLACEHOLDER: &str = "replace-with-your-verify-command";

/// Result of the gate: issues refuse the run, warnings do not.
#[derive(Debug, Clone, Default)]
pub struct ReadinessReport {
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl ReadinessReport {
    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }

    /// One issue per line, for the refuse-to-start message.
    pub fn issue_list(&self) -> String {
        self.issues
            .iter()
            .map(|i| format!("  - {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run every check and collect the findings.
pub async fn check(project_root: &Path, data_dir: &Path, config: &Config, prd: &Prd) -> ReadinessReport {
    let mut report = ReadinessReport::default();

    if !Git::new(project_root).is_work_tree().await {
        report
            .issues
            .push(format!("{} is not inside a git repository", project_root.display()));
    }

    for tool in ["sh", "git"] {
        if resolve_on_path(tool).is_none() {
            report.issues.push(format!("required tool {tool:?} not found on PATH"));
        }
    }

    if !data_dir.is_dir() {
        report
            .issues
            .push(format!("data directory {} does not exist", data_dir.display()));
    } else if !dir_writable(data_dir) {
        report
            .issues
            .push(format!("data directory {} is not writable", data_dir.display()));
    }

    for command in config.verify.default.iter().chain(&config.verify.ui) {
        if is_placeholder(command) {
            report.issues.push(format!(
                "verify command {command:?} is still the init placeholder"
            ));
        } else if let Some(base) = base_executable(command) {
            if !resolves(&base) {
                report
                    .issues
                    .push(format!("verify command {command:?}: {base:?} not found on PATH"));
            }
        }
    }

    for service in &config.services {
        if let Some(start) = &service.start {
            if let Some(base) = base_executable(start) {
                if !resolves(&base) {
                    report.issues.push(format!(
                        "service {:?} start command: {base:?} not found on PATH",
                        service.name
                    ));
                }
            }
        }
        if !service.ready.starts_with("http://") && !service.ready.starts_with("https://") {
            report.issues.push(format!(
                "service {:?} ready URL {:?} must start with http:// or https://",
                service.name, service.ready
            ));
        }
    }

    if prd.has_ui_story() && config.verify.ui.is_empty() {
        report.issues.push(
            "PRD has ui-tagged stories but verify.ui lists no commands".to_string(),
        );
    }

    if !ProviderProfile::is_known_command(&config.provider.command) {
        report.warnings.push(format!(
            "unknown provider {:?}; using generic defaults (stdin prompt, no args)",
            config.provider.command
        ));
    }

    report
}

/// First token of a shell command, skipping VAR=value prefixes.
fn base_executable(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .find(|token| !token.contains('='))
        .map(str::to_string)
}

fn is_placeholder(command: &str) -> bool {
    let trimmed = command.trim();
    trimmed.starts_with("echo") && trimmed.contains(VERIFY_PLACEHOLDER)
}

/// Path-qualified names must exist and be executable; bare names resolve
/// through PATH.
fn resolves(base: &str) -> bool {
    if base.contains('/') {
        is_executable(Path::new(base))
    } else {
        resolve_on_path(base).is_some()
    }
}

fn resolve_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(".ralph-write-probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
