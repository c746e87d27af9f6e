// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Runtime context types for agent construction.
//!
//! [`RuntimeContext`] holds environment-detected information (project root,
//! git state, CI environment) that is not part of the config file schema.
//!
//! [`ToolSetProfile`] selects which tools to register, and carries the
//! shared state needed by stateful tools (todos, task nesting depth).

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use sven_tools::{events::TodoItem, QuestionRequest};

// ─── RuntimeContext ───────────────────────────────────────────────────────────

/// Git metadata collected for the system prompt.
#[derive(Debug, Clone, Default)]
pub struct GitContext {
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub dirty: bool,
}

impl GitContext {
    /// Render as a short note for the system prompt, or `None` if nothing
    /// was detected (not a git repository).
    pub fn to_prompt_section(&self) -> Option<String> {
        if self.branch.is_none() && self.commit.is_none() {
            return None;
        }
        let mut s = String::from("Git: ");
        if let Some(b) = &self.branch {
            s.push_str(&format!("branch {b}"));
        }
        if let Some(c) = &self.commit {
            s.push_str(&format!(" @ {c}"));
        }
        if self.dirty {
            s.push_str(" (dirty)");
        }
        Some(s)
    }
}

/// CI environment metadata collected for the system prompt.
#[derive(Debug, Clone, Default)]
pub struct CiContext {
    pub is_ci: bool,
    pub provider: Option<String>,
}

impl CiContext {
    /// Render as a short note for the system prompt, or `None` if not running in CI.
    pub fn to_prompt_section(&self) -> Option<String> {
        if !self.is_ci {
            return None;
        }
        match &self.provider {
            Some(p) => Some(format!("Running in CI ({p}).")),
            None => Some("Running in CI.".to_string()),
        }
    }
}

/// Walk up from `start` looking for a `.git` directory.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(".git").exists() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Collect branch/commit/dirty status by shelling out to `git`.
pub fn collect_git_context(root: &Path) -> GitContext {
    let run = |args: &[&str]| -> Option<String> {
        std::process::Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
    };
    let branch = run(&["rev-parse", "--abbrev-ref", "HEAD"]);
    let commit = run(&["rev-parse", "--short", "HEAD"]);
    let dirty = std::process::Command::new("git")
        .args(["status", "--porcelain"])
        .current_dir(root)
        .output()
        .ok()
        .map(|o| !o.stdout.is_empty())
        .unwrap_or(false);
    GitContext {
        branch,
        commit,
        dirty,
    }
}

/// Detect common CI environment variables.
pub fn detect_ci_context() -> CiContext {
    let provider = if std::env::var_os("GITHUB_ACTIONS").is_some() {
        Some("github-actions".to_string())
    } else if std::env::var_os("GITLAB_CI").is_some() {
        Some("gitlab-ci".to_string())
    } else if std::env::var_os("JENKINS_URL").is_some() {
        Some("jenkins".to_string())
    } else {
        None
    };
    CiContext {
        is_ci: std::env::var_os("CI").is_some(),
        provider,
    }
}

/// Read the first of `.sven/context.md`, `AGENTS.md`, `CLAUDE.md` found under `root`.
pub fn load_project_context_file(root: &Path) -> Option<String> {
    for candidate in [".sven/context.md", "AGENTS.md", "CLAUDE.md"] {
        let path = root.join(candidate);
        if let Ok(content) = std::fs::read_to_string(&path) {
            return Some(content);
        }
    }
    None
}

/// Environment-detected context for an agent session.
///
/// This is separate from [`sven_config::AgentConfig`] (which holds only
/// config-file fields) so that the two concerns — "what the user configured"
/// and "what we found at runtime" — stay cleanly separated.
#[derive(Default)]
pub struct RuntimeContext {
    /// Absolute path to the project root (detected from `.git` walk-up).
    pub project_root: Option<PathBuf>,
    /// Live git metadata (branch, commit, dirty state).
    pub git_context: Option<GitContext>,
    /// CI environment metadata.
    pub ci_context: Option<CiContext>,
    /// Contents of `.sven/context.md`, `AGENTS.md`, or `CLAUDE.md`.
    pub project_context_file: Option<String>,
    /// Text appended after the default system prompt Guidelines section.
    pub append_system_prompt: Option<String>,
    /// Full system prompt override (from `--system-prompt-file`).
    pub system_prompt_override: Option<String>,
}

impl RuntimeContext {
    /// Create with auto-detected project, git, and CI context.
    pub fn auto_detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        let project_root = find_project_root(&cwd);
        let git_context = project_root.as_ref().map(|r| collect_git_context(r));
        let ci_context = Some(detect_ci_context());
        let project_context_file = project_root.as_ref().and_then(|r| load_project_context_file(r));

        Self {
            project_root,
            git_context,
            ci_context,
            project_context_file,
            append_system_prompt: None,
            system_prompt_override: None,
        }
    }

    /// Create an empty context (no project/git/CI detection).
    pub fn empty() -> Self {
        Self::default()
    }
}

// ─── ToolSetProfile ───────────────────────────────────────────────────────────

/// Selects which tool set to register and carries the caller-owned shared
/// state that stateful tools require.
///
/// The REPL and headless runs share the same full tool set; only the current
/// `AgentMode` controls which tools are exposed to the model. When
/// `question_tx` is `Some`, `question` uses the TUI channel; when `None`,
/// it uses stdin (headless).
///
/// `mode_lock` and the tool-event channel are intentionally **not** part of
/// this enum — the caller creates them, wires them into the registry, and
/// passes the same instances to `Agent::new()` so that mode-change and
/// todo-write events are correctly observed by the agent loop.
pub enum ToolSetProfile {
    /// Full tool set (REPL and headless). Same tools; mode gates visibility.
    ///
    /// `question_tx`: when `Some`, `question` routes to the TUI; when `None`, uses stdin.
    Full {
        question_tx: Option<mpsc::Sender<QuestionRequest>>,
        todos: Arc<Mutex<Vec<TodoItem>>>,
        task_depth: Arc<AtomicUsize>,
    },

    /// Sub-agent tool set (Full minus TaskTool to prevent unbounded nesting).
    SubAgent { todos: Arc<Mutex<Vec<TodoItem>>> },
}
