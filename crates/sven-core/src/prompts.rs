// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::Local;
use std::path::Path;

use sven_config::AgentMode;

/// All optional contextual blocks that can be injected into the system prompt.
#[derive(Debug, Default)]
pub struct PromptContext<'a> {
    /// Absolute path to the project root (from `.git` detection).
    pub project_root: Option<&'a Path>,
    /// Pre-formatted git context (branch, commit, dirty status).
    ///
    /// **Caching note**: this field is *volatile* — it changes on every commit
    /// and with every file edit (dirty count).  When prompt caching is enabled
    /// this content is placed in a *separate, uncached* system block so that
    /// the stable prefix remains cacheable across sessions.
    pub git_context: Option<&'a str>,
    /// Contents of the project context file (AGENTS.md / .sven/context.md).
    pub project_context_file: Option<&'a str>,
    /// Pre-formatted CI environment block.
    ///
    /// **Caching note**: like `git_context`, this is volatile between CI runs.
    pub ci_context: Option<&'a str>,
    /// Text appended verbatim after the default Guidelines section.
    pub append: Option<&'a str>,
}

impl<'a> PromptContext<'a> {
    /// Return a version of this context with the volatile fields cleared.
    ///
    /// Used to build the *stable* (cacheable) portion of the system prompt.
    pub fn stable_only(&self) -> Self {
        Self {
            project_root: self.project_root,
            git_context: None,
            project_context_file: self.project_context_file,
            ci_context: None,
            append: self.append,
        }
    }

    /// Format the volatile fields (git + CI context) as a block suitable for
    /// appending to the system prompt outside the cached region.
    ///
    /// Returns `None` when neither git nor CI context is present.
    pub fn dynamic_block(&self) -> Option<String> {
        let git = self
            .git_context
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string());
        let ci = self
            .ci_context
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string());
        match (git, ci) {
            (None, None) => None,
            (Some(g), None) => Some(g),
            (None, Some(c)) => Some(c),
            (Some(g), Some(c)) => Some(format!("{g}\n\n{c}")),
        }
    }
}

// ─── Guidelines Module ───────────────────────────────────────────────────────
// Modular guidelines for easier maintenance and testing

mod guidelines {
    pub fn general() -> &'static str {
        "- Be concise and precise. Use tools instead of guessing.\n\
         - Check `todoread` at the start of a multi-step task to see what is already tracked."
    }

    pub fn tool_usage() -> &'static str {
        "- NEVER use `shell`/`run_terminal_command` for file I/O — use `read_file`/`write`/`edit_file`/`grep`/`glob_file_search`.\n\
         - Prefer `edit_file` over `write` for modifying existing files (preserves surrounding context).\n\
         - Discovery workflow: `glob_file_search` to find files → `grep` to narrow → `read_file` with specific ranges for context.\n\
         - Use `apply_patch` for multi-hunk changes spanning several files in one call.\n\
         - Batch `read_file` calls in parallel — read all potentially relevant files in one turn."
    }

    pub fn code_quality() -> &'static str {
        "- Make sure all the code you generate is production quality and follows good separation of concerns and clean code principles.\n\
         - NEVER create new files proactively unless explicitly requested. Do not create 'summary' md files unless requested.\n\
         - Write tests when adding new functionality.\n\
         - Preserve existing code structure and coding style patterns."
    }

    pub fn workflow_efficiency() -> &'static str {
        "- Use `todowrite` for multi-step tasks (3+ steps); update it silently and mark each step complete as you finish it.\n\
         - Use `todoread` to check current progress before starting new work.\n\
         - Batch independent tool calls in parallel to increase efficiency.\n\
         - Delegate focused, isolated sub-tasks to `task` rather than doing everything in one long turn."
    }

    pub fn error_handling() -> &'static str {
        "- When a tool fails, try a different approach.\n\
         - Always set `workdir` in `run_terminal_command`/`shell` to the project root for commands that depend on location.\n\
         - NEVER skip git hooks or force-push without explicit user permission."
    }

    pub fn questions() -> &'static str {
        "- When a task is ambiguous or you need information to proceed, use the `question` tool to \
         collect a structured answer rather than guessing or writing a prose question."
    }
}

fn build_guidelines_section() -> String {
    format!(
        "## Guidelines\n\n\
         ### General Principles\n\
         {}\n\n\
         ### Tool Usage Patterns\n\
         {}\n\n\
         ### Code Quality\n\
         {}\n\n\
         ### Workflow Efficiency\n\
         {}\n\n\
         ### Error Handling\n\
         {}\n\n\
         ### Clarifying Questions\n\
         {}",
        guidelines::general(),
        guidelines::tool_usage(),
        guidelines::code_quality(),
        guidelines::workflow_efficiency(),
        guidelines::error_handling(),
        guidelines::questions(),
    )
}

/// Build the system prompt for the given agent mode.
///
/// `ctx` carries optional project / CI / git context injected when running
/// in headless mode.
pub fn system_prompt(mode: AgentMode, custom: Option<&str>, ctx: PromptContext<'_>) -> String {
    if let Some(custom) = custom {
        // Even with a custom prompt, honour append if set.
        if let Some(extra) = ctx.append {
            return format!("{}\n\n{}", custom.trim_end(), extra);
        }
        return custom.to_string();
    }

    let agent_identity = format!(
        "You are Sven, a specialized AI coding agent built for professional software engineering.\n\n\
         Operating Mode: `{mode}`\n\n\
         Current date and time: `{current_date_time}`\n\n\
         Current working directory: `{current_working_directory}`\n\
         Core Capabilities:\n\
         - Multi-mode operation (plan, default, auto-edit, yolo) with explicit, user-driven mode switching via `/mode`\n\
         - A structured task list tracked through the `todoread`/`todowrite` tools\n\
         - Focused sub-task delegation via the `task` tool\n\
         - Full git/CI environment awareness when running in a project checkout",
        current_date_time = Local::now().format("%Y-%m-%d %H:%M:%S"),
        current_working_directory = std::env::current_dir().unwrap().display());

    let mode_instructions = match mode {
        AgentMode::Plan => {
            "You are in planning mode.  Analyse the request and produce a clear, structured \
             plan with numbered steps.  You may read files to inform the plan, but the write, \
             edit, patch, task, and git commit/add tools are disabled — you MUST NOT modify \
             anything.  Output the plan in Markdown. \
             When a task is ambiguous, use the `question` tool to collect structured answers \
             from the user rather than making assumptions."
        }
        AgentMode::Default => {
            "You are a capable coding agent with full tool access.  Every write, edit, patch, \
             shell, and git-mutating call asks the user for approval before it runs — plan your \
             changes so each approval request is easy to evaluate. \
             Work systematically, verify your changes, and report your progress clearly.\n\
             Keep in mind the following:\n\
             - Maximize parallel tool calls where they are independent.\n\
             - Always complete all todos before completing your turn.\n\
             - Always complete the task requested by the user before completing your turn."
        }
        AgentMode::AutoEdit => {
            "You are a capable coding agent with full tool access.  File edits (`write`, \
             `edit_file`, `apply_patch`, `delete_file`) are auto-approved; shell commands and git \
             mutations still ask for approval. \
             Work systematically, verify your changes, and report your progress clearly.\n\
             Keep in mind the following:\n\
             - Maximize parallel tool calls where they are independent.\n\
             - Always complete all todos before completing your turn.\n\
             - Always complete the task requested by the user before completing your turn."
        }
        AgentMode::Yolo => {
            "You are a capable coding agent with full tool access.  Every tool call, including \
             shell commands and git mutations, is auto-approved — there is no human in the loop \
             for individual actions, so be especially careful to verify your own work. \
             Work systematically, verify your changes, and report your progress clearly.\n\
             Keep in mind the following:\n\
             - Maximize parallel tool calls where they are independent.\n\
             - Always complete all todos before completing your turn.\n\
             - Always complete the task requested by the user before completing your turn."
        }
    };

    let project_section = if let Some(root) = ctx.project_root {
        format!(
            "\n\n## Project Context\n\
             Project root directory: `{}`\n\
             - Use this absolute path for all file read/write operations.\n\
             - Pass this path as the `workdir` argument to `run_terminal_command`/`shell` \
               so commands execute in the correct directory.\n\
             - Prefer absolute paths over relative paths in every tool call.",
            root.display()
        )
    } else {
        String::new()
    };

    let git_section = if let Some(git) = ctx.git_context {
        format!("\n\n{git}")
    } else {
        String::new()
    };

    // Project context file (AGENTS.md / .sven/context.md) — injected as a
    // labelled section so the model treats it as authoritative instructions.
    let context_file_section = if let Some(content) = ctx.project_context_file {
        format!("\n\n## Project Instructions\n\n{content}")
    } else {
        String::new()
    };

    let ci_section = if let Some(ci) = ctx.ci_context {
        format!("\n\n{ci}")
    } else {
        String::new()
    };

    let guidelines_section = build_guidelines_section();

    let append_section = if let Some(extra) = ctx.append {
        format!("\n\n{extra}")
    } else {
        String::new()
    };

    format!(
        "{agent_identity}\n\n\
         {mode_instructions}{project_section}{git_section}\
         {context_file_section}{ci_section}\n\n\
         {guidelines_section}\
         {append_section}",
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
