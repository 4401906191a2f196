// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider capability profiles.
//!
//! The AI CLI is a black box described by a small capability set: command,
//! argv prefix, prompt-delivery mode, optional prompt flag, and knowledge
//! file. Defaults are looked up by command name so recognized CLIs work out
//! of the box, and unknown commands fall back to generic stdin delivery.
//! Explicit config always wins over the table.

use crate::config::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the composed prompt reaches the provider process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Write the prompt to stdin, then close it.
    Stdin,
    /// Append the prompt (after the prompt flag, if any) as a final argument.
    Arg,
    /// Write the prompt to a temp file and pass its path as a final argument.
    File,
}

/// Fully resolved provider invocation profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub command: String,
    pub args: Vec<String>,
    pub prompt_mode: PromptMode,
    pub prompt_flag: Option<String>,
    pub knowledge_file: String,
    pub timeout: Duration,
}

/// Commands with known defaults; anything else gets the generic fallback.
pub const KNOWN_COMMANDS: [&str; 5] = ["amp", "claude", "opencode", "aider", "codex"];

struct Defaults {
    prompt_mode: PromptMode,
    prompt_flag: Option<&'static str>,
    args: &'static [&'static str],
    knowledge_file: &'static str,
}

fn defaults_for(command: &str) -> Defaults {
    match command {
        "amp" => Defaults {
            prompt_mode: PromptMode::Stdin,
            prompt_flag: None,
            args: &["--dangerously-allow-all"],
            knowledge_file: "AGENTS.md",
        },
        "claude" => Defaults {
            prompt_mode: PromptMode::Stdin,
            prompt_flag: None,
            args: &["--print", "--dangerously-skip-permissions"],
            knowledge_file: "CLAUDE.md",
        },
        "opencode" => Defaults {
            prompt_mode: PromptMode::Arg,
            prompt_flag: None,
            args: &["run"],
            knowledge_file: "AGENTS.md",
        },
        "aider" => Defaults {
            prompt_mode: PromptMode::Arg,
            prompt_flag: Some("--message"),
            args: &["--yes-always"],
            knowledge_file: "AGENTS.md",
        },
        "codex" => Defaults {
            prompt_mode: PromptMode::Arg,
            prompt_flag: None,
            args: &["exec", "--full-auto"],
            knowledge_file: "AGENTS.md",
        },
        _ => Defaults {
            prompt_mode: PromptMode::Stdin,
            prompt_flag: None,
            args: &[],
            knowledge_file: "AGENTS.md",
        },
    }
}

impl ProviderProfile {
    /// Resolve a profile from config, filling gaps from the default table.
    ///
    /// Defaults key off the command's base name, so `/usr/local/bin/claude`
    /// resolves the same as `claude`.
    pub fn resolve(config: &ProviderConfig) -> ProviderProfile {
        let base = Self::base_name(&config.command);
        let defaults = defaults_for(base);

        ProviderProfile {
            command: config.command.clone(),
            args: match &config.args {
                Some(args) => args.clone(),
                None => defaults.args.iter().map(|a| a.to_string()).collect(),
            },
            prompt_mode: config.prompt_mode.unwrap_or(defaults.prompt_mode),
            prompt_flag: config
                .prompt_flag
                .clone()
                .or_else(|| defaults.prompt_flag.map(str::to_string)),
            knowledge_file: config
                .knowledge_file
                .clone()
                .unwrap_or_else(|| defaults.knowledge_file.to_string()),
            timeout: Duration::from_secs(config.timeout),
        }
    }

    /// Whether the command has an entry in the default table.
    pub fn is_known_command(command: &str) -> bool {
        KNOWN_COMMANDS.contains(&Self::base_name(command))
    }

    fn base_name(command: &str) -> &str {
        Path::new(command)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(command)
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
