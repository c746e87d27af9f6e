// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Centralised tool-registry builder.
//!
//! All callers (REPL, headless runner, sub-agents) use `build_tool_registry`
//! with the appropriate [`ToolSetProfile`] instead of each inlining their own
//! registration loop.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use sven_config::{AgentMode, Config};
use sven_model::ModelProvider;
use sven_tools::{
    events::ToolEvent, ApplyPatchTool, AskQuestionTool, DeleteFileTool, EditFileTool,
    GitAddTool, GitCommitTool, GlobFileSearchTool, GrepTool, ListDirTool, ReadFileTool,
    RunTerminalCommandTool, ShellTool, TodoReadTool, TodoWriteTool, ToolRegistry, WriteTool,
};

use sven_core::AgentRuntimeContext;

use crate::context::ToolSetProfile;
use crate::task_tool::TaskTool;

/// Build a [`ToolRegistry`] populated according to the given `profile`.
///
/// This is the single canonical place where tools are wired up.  Adding a
/// new tool to sven means adding it here once and it will appear in every
/// appropriate profile automatically.
///
/// ### Shared-state parameters
///
/// * `mode_lock` — the **same** `Arc` that will be passed to `Agent::new()`.
/// * `tool_event_tx` — the sending half of the channel whose receiving end
///   is passed to `Agent::new()`.  `TodoWriteTool` sends events here; the
///   agent drains them after each tool execution.
/// * `sub_agent_runtime` — inherited by `TaskTool` sub-agents (project root,
///   CI/git notes, project context file). Only used for the `Full` profile;
///   pass `AgentRuntimeContext::default()` otherwise.
pub fn build_tool_registry(
    cfg: &Config,
    model: Arc<dyn ModelProvider>,
    profile: ToolSetProfile,
    mode_lock: Arc<Mutex<AgentMode>>,
    tool_event_tx: mpsc::Sender<ToolEvent>,
    sub_agent_runtime: AgentRuntimeContext,
) -> ToolRegistry {
    match profile {
        ToolSetProfile::Full {
            question_tx,
            todos,
            task_depth,
        } => {
            let mut reg = ToolRegistry::new();

            reg.register(ReadFileTool);
            reg.register(ListDirTool);
            reg.register(GlobFileSearchTool);
            reg.register(GrepTool);
            reg.register(TodoReadTool::new(todos.clone()));
            reg.register(TodoWriteTool::new(todos, tool_event_tx.clone()));
            // Only register `question` when a TUI channel is available.
            // In headless/sub-agent mode there is no UI to display the modal,
            // so we omit the tool entirely — the model won't attempt to call it.
            match question_tx {
                Some(tx) => reg.register(AskQuestionTool::new_tui(tx)),
                None => reg.register(AskQuestionTool::new_headless()),
            }
            reg.register(WriteTool);
            reg.register(EditFileTool);
            reg.register(DeleteFileTool);
            reg.register(ApplyPatchTool);
            reg.register(GitAddTool);
            reg.register(GitCommitTool);
            reg.register(RunTerminalCommandTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            reg.register(ShellTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            reg.register(TaskTool::new(
                model,
                Arc::new(cfg.clone()),
                task_depth,
                sub_agent_runtime,
            ));

            reg
        }

        ToolSetProfile::SubAgent { todos } => {
            let mut reg = ToolRegistry::new();

            reg.register(ReadFileTool);
            reg.register(ListDirTool);
            reg.register(GlobFileSearchTool);
            reg.register(GrepTool);
            reg.register(AskQuestionTool::new_headless());
            reg.register(WriteTool);
            reg.register(EditFileTool);
            reg.register(DeleteFileTool);
            reg.register(ApplyPatchTool);
            reg.register(GitAddTool);
            reg.register(GitCommitTool);
            reg.register(RunTerminalCommandTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            reg.register(ShellTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            // TaskTool and todoread/todowrite intentionally omitted: sub-agents
            // disable task/todo* recursively to cap nesting and keep one todo
            // list owned by the top-level agent.
            let _ = todos;
            let _ = tool_event_tx;
            let _ = mode_lock; // retained for API symmetry with the Full profile

            reg
        }
    }
}
