// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod approval;
pub mod builtin;
pub mod events;
pub mod policy;
pub mod registry;
pub mod tool;

pub use approval::{ApprovalChannel, ApprovalDecision, ApprovalReason, ApprovalRequest, AutoApprovalChannel};
pub use events::{TodoItem, ToolEvent};
pub use policy::{analyze_bash_risk, ApprovalPolicy, ToolPolicy};
pub use registry::{ToolRegistry, ToolSchema};
pub use tool::{OutputCategory, Tool, ToolCall, ToolOutput, ToolOutputPart};

pub use builtin::apply_patch::ApplyPatchTool;
pub use builtin::ask_question::{AskQuestionTool, Question, QuestionRequest};
pub use builtin::delete_file::DeleteFileTool;
pub use builtin::edit_file::EditFileTool;
pub use builtin::git_add::GitAddTool;
pub use builtin::git_commit::GitCommitTool;
pub use builtin::glob_file_search::GlobFileSearchTool;
pub use builtin::grep::GrepTool;
pub use builtin::list_dir::ListDirTool;
pub use builtin::read_file::ReadFileTool;
pub use builtin::run_terminal_command::RunTerminalCommandTool;
pub use builtin::shell::ShellTool;
pub use builtin::todoread::TodoReadTool;
pub use builtin::todowrite::TodoWriteTool;
pub use builtin::write::WriteTool;
