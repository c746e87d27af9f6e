// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Interface language for user-facing REPL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Lang {
    #[default]
    En,
    #[value(name = "zh-CN")]
    ZhCn,
}

#[derive(Parser, Debug)]
#[command(
    name = "sven",
    about = "An efficient AI coding agent for CLI and CI",
    version,
    long_about = None,
)]
pub struct Cli {
    /// Optional initial prompt or task description. When given in headless
    /// mode this is the sole turn submitted; in the interactive REPL it
    /// seeds the first input before handing control to stdin.
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Path to the config file (overrides auto-discovery).
    #[arg(long, short = 'c', env = "AGENT_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Workspace root directory. Defaults to the current working directory.
    #[arg(long, env = "AGENT_WORKSPACE_ROOT")]
    pub cwd: Option<PathBuf>,

    /// Interface language for REPL output.
    #[arg(long, value_enum, default_value = "en", env = "AGENT_LANG")]
    pub lang: Lang,

    /// Run headless (no REPL); reads the prompt, runs one turn, and exits.
    /// Auto-detected when stdin or stdout is not a TTY.
    #[arg(long)]
    pub headless: bool,

    /// Resume a previous session by id instead of starting a new one.
    #[arg(long)]
    pub resume: Option<String>,

    /// Increase verbosity (-v = debug, -vv = trace).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Returns true if the run should be headless.
    ///
    /// Headless is triggered by any of:
    /// - `--headless` flag
    /// - stdin is not a terminal (piped input, e.g. `echo "task" | sven`)
    /// - stdout is not a terminal (piped output, e.g. `sven 'hi' | less`)
    pub fn is_headless(&self) -> bool {
        self.headless || !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal()
    }
}

// TTY detection for stdin and stdout.
trait IsTerminal {
    fn is_terminal(&self) -> bool;
}

impl IsTerminal for std::io::Stdin {
    fn is_terminal(&self) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe { libc::isatty(self.as_raw_fd()) != 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl IsTerminal for std::io::Stdout {
    fn is_terminal(&self) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe { libc::isatty(self.as_raw_fd()) != 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lang_is_en() {
        assert_eq!(Lang::default(), Lang::En);
    }

    #[test]
    fn parses_minimal_prompt() {
        let cli = Cli::parse_from(["sven", "do the thing"]);
        assert_eq!(cli.prompt.as_deref(), Some("do the thing"));
        assert!(!cli.headless);
    }

    #[test]
    fn parses_config_and_cwd() {
        let cli = Cli::parse_from([
            "sven", "--config", "/tmp/x.yaml", "--cwd", "/tmp/proj", "--headless", "hi",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.yaml")));
        assert_eq!(cli.cwd, Some(PathBuf::from("/tmp/proj")));
        assert!(cli.headless);
    }

    #[test]
    fn verbosity_counts_flags() {
        let cli = Cli::parse_from(["sven", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn lang_zh_cn_parses() {
        let cli = Cli::parse_from(["sven", "--lang", "zh-CN"]);
        assert_eq!(cli.lang, Lang::ZhCn);
    }
}
