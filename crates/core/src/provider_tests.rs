// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn config(command: &str) -> ProviderConfig {
    ProviderConfig {
        command: command.to_string(),
        args: None,
        timeout: 1800,
        prompt_mode: None,
        prompt_flag: None,
        knowledge_file: None,
    }
}

#[parameterized(
    amp = { "amp", PromptMode::Stdin, None, &["--dangerously-allow-all"], "AGENTS.md" },
    claude = { "claude", PromptMode::Stdin, None, &["--print", "--dangerously-skip-permissions"], "CLAUDE.md" },
    opencode = { "opencode", PromptMode::Arg, None, &["run"], "AGENTS.md" },
    aider = { "aider", PromptMode::Arg, Some("--message"), &["--yes-always"], "AGENTS.md" },
    codex = { "codex", PromptMode::Arg, None, &["exec", "--full-auto"], "AGENTS.md" },
)]
fn known_commands_get_table_defaults(
    command: &str,
    mode: PromptMode,
    flag: Option<&str>,
    args: &[&str],
    knowledge: &str,
) {
    let profile = ProviderProfile::resolve(&config(command));
    assert_eq!(profile.prompt_mode, mode);
    assert_eq!(profile.prompt_flag.as_deref(), flag);
    assert_eq!(profile.args, args);
    assert_eq!(profile.knowledge_file, knowledge);
    assert_eq!(profile.timeout, Duration::from_secs(1800));
}

#[test]
fn unknown_commands_get_generic_fallback() {
    let profile = ProviderProfile::resolve(&config("goose"));
    assert_eq!(profile.prompt_mode, PromptMode::Stdin);
    assert_eq!(profile.prompt_flag, None);
    assert!(profile.args.is_empty());
    assert_eq!(profile.knowledge_file, "AGENTS.md");
}

#[test]
fn defaults_key_off_base_name() {
    let profile = ProviderProfile::resolve(&config("/usr/local/bin/claude"));
    assert_eq!(profile.knowledge_file, "CLAUDE.md");
    assert!(ProviderProfile::is_known_command("/usr/local/bin/claude"));
    assert!(!ProviderProfile::is_known_command("goose"));
}

#[test]
fn explicit_config_wins_over_table() {
    let mut cfg = config("claude");
    cfg.args = Some(vec!["--custom".to_string()]);
    cfg.prompt_mode = Some(PromptMode::File);
    cfg.prompt_flag = Some("--prompt-file".to_string());
    cfg.knowledge_file = Some("NOTES.md".to_string());
    cfg.timeout = 60;

    let profile = ProviderProfile::resolve(&cfg);
    assert_eq!(profile.args, vec!["--custom".to_string()]);
    assert_eq!(profile.prompt_mode, PromptMode::File);
    assert_eq!(profile.prompt_flag.as_deref(), Some("--prompt-file"));
    assert_eq!(profile.knowledge_file, "NOTES.md");
    assert_eq!(profile.timeout, Duration::from_secs(60));
}

#[test]
fn empty_args_mean_no_args() {
    let mut cfg = config("claude");
    cfg.args = Some(Vec::new());
    let profile = ProviderProfile::resolve(&cfg);
    assert!(profile.args.is_empty());
}
