// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ralph_core::{
    CommitsConfig, LoggingConfig, ProviderConfig, ServiceConfig, Story, VerifyConfig,
    PRD_SCHEMA_VERSION,
};

async fn git_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg("git init -q -b main && git config user.email r@e.c && git config user.name r")
        .current_dir(dir.path())
        .status()
        .await
        .unwrap();
    assert!(status.success());
    dir
}

fn config() -> Config {
    Config {
        max_retries: 3,
        provider: ProviderConfig {
            command: "claude".to_string(),
            args: None,
            timeout: 1800,
            prompt_mode: None,
            prompt_flag: None,
            knowledge_file: None,
        },
        services: vec![ServiceConfig {
            name: "dev".to_string(),
            start: Some("sleep 1".to_string()),
            ready: "http://localhost:3000".to_string(),
            ready_timeout: 30,
            restart_before_verify: false,
        }],
        verify: VerifyConfig {
            default: vec!["true".to_string()],
            ui: Vec::new(),
            timeout: 300,
        },
        commits: CommitsConfig::default(),
        logging: LoggingConfig::default(),
    }
}

fn prd(ui: bool) -> Prd {
    Prd {
        schema_version: PRD_SCHEMA_VERSION,
        project: "demo".to_string(),
        branch: "ralph/checkout".to_string(),
        description: String::new(),
        stories: vec![Story {
            id: "US-001".to_string(),
            title: "first".to_string(),
            description: String::new(),
            acceptance_criteria: vec!["works".to_string()],
            priority: 1,
            tags: if ui { vec!["ui".to_string()] } else { Vec::new() },
        }],
    }
}

async fn check_in(root: &tempfile::TempDir, config: &Config, prd: &Prd) -> ReadinessReport {
    let data_dir = root.path().join(".ralph");
    std::fs::create_dir_all(&data_dir).unwrap();
    check(root.path(), &data_dir, config, prd).await
}

#[tokio::test]
async fn healthy_setup_passes() {
    let root = git_root().await;
    let report = check_in(&root, &config(), &prd(false)).await;
    assert!(report.ok(), "issues: {:?}", report.issues);
}

#[tokio::test]
async fn non_git_directory_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join(".ralph");
    std::fs::create_dir_all(&data_dir).unwrap();
    let report = check(dir.path(), &data_dir, &config(), &prd(false)).await;
    assert!(report.issues.iter().any(|i| i.contains("git repository")));
}

#[tokio::test]
async fn missing_data_dir_is_refused() {
    let root = git_root().await;
    let report = check(root.path(), &root.path().join(".ralph"), &config(), &prd(false)).await;
    assert!(report.issues.iter().any(|i| i.contains("does not exist")));
}

#[tokio::test]
async fn placeholder_verify_is_refused() {
    let root = git_root().await;
    let mut cfg = config();
    cfg.verify.default = vec![format!("echo {VERIFY_PLACEHOLDER}")];
    let report = check_in(&root, &cfg, &prd(false)).await;
    assert!(report.issues.iter().any(|i| i.contains("placeholder")));
}

#[tokio::test]
async fn unresolvable_verify_command_is_refused() {
    let root = git_root().await;
    let mut cfg = config();
    cfg.verify.default = vec!["definitely-not-a-real-binary-xyz --flag".to_string()];
    let report = check_in(&root, &cfg, &prd(false)).await;
    assert!(report
        .issues
        .iter()
        .any(|i| i.contains("definitely-not-a-real-binary-xyz")));
}

#[tokio::test]
async fn env_prefixes_are_skipped_when_resolving() {
    let root = git_root().await;
    let mut cfg = config();
    cfg.verify.default = vec!["CI=1 true".to_string()];
    let report = check_in(&root, &cfg, &prd(false)).await;
    assert!(report.ok(), "issues: {:?}", report.issues);
}

#[tokio::test]
async fn non_http_ready_url_is_refused() {
    let root = git_root().await;
    let mut cfg = config();
    cfg.services[0].ready = "tcp://localhost:3000".to_string();
    let report = check_in(&root, &cfg, &prd(false)).await;
    assert!(report.issues.iter().any(|i| i.contains("http://")));
}

#[tokio::test]
async fn ui_story_without_ui_commands_is_refused() {
    let root = git_root().await;
    let report = check_in(&root, &config(), &prd(true)).await;
    assert!(report.issues.iter().any(|i| i.contains("verify.ui")));
}

#[tokio::test]
async fn ui_story_with_ui_commands_passes() {
    let root = git_root().await;
    let mut cfg = config();
    cfg.verify.ui = vec!["true".to_string()];
    let report = check_in(&root, &cfg, &prd(true)).await;
    assert!(report.ok(), "issues: {:?}", report.issues);
}

#[tokio::test]
async fn unknown_provider_is_a_warning_not_an_issue() {
    let root = git_root().await;
    let mut cfg = config();
    cfg.provider.command = "goose".to_string();
    let report = check_in(&root, &cfg, &prd(false)).await;
    assert!(report.ok());
    assert!(report.warnings.iter().any(|w| w.contains("goose")));
}

#[tokio::test]
async fn issue_list_is_bulleted() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join(".ralph");
    std::fs::create_dir_all(&data_dir).unwrap();
    let report = check(dir.path(), &data_dir, &config(), &prd(false)).await;
    assert!(report.issue_list().starts_with("  - "));
}
