// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::events::TodoItem;
use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Read-only view of the session's current todo list, shared with
/// [`super::todowrite::TodoWriteTool`] through the same `Arc<Mutex<_>>`.
pub struct TodoReadTool {
    todos: Arc<Mutex<Vec<TodoItem>>>,
}

impl TodoReadTool {
    pub fn new(todos: Arc<Mutex<Vec<TodoItem>>>) -> Self {
        Self { todos }
    }
}

#[async_trait]
impl Tool for TodoReadTool {
    fn name(&self) -> &str { "todoread" }

    fn description(&self) -> &str {
        "Read the current structured task list for this session. Takes no arguments."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy { ApprovalPolicy::Auto }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let items = self.todos.lock().await.clone();
        if items.is_empty() {
            return ToolOutput::ok(&call.id, "No todos yet.");
        }
        let lines: Vec<String> = items
            .iter()
            .map(|t| {
                let icon = match t.status.as_str() {
                    "completed" => "✓",
                    "in_progress" => "→",
                    _ => "○",
                };
                format!("{icon} [{}] ({}) {}", t.id, t.priority, t.content)
            })
            .collect();
        ToolOutput::ok(&call.id, lines.join("\n"))
    }
}
