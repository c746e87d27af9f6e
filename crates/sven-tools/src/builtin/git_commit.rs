// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use sven_config::AgentMode;

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

pub struct GitCommitTool;

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Create a commit from the currently staged changes with 'git commit -m <message>'. \
         Only call this after staging the intended files with git_add, and never amend or \
         force anything here."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Commit message"
                }
            },
            "required": ["message"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    fn modes(&self) -> &[AgentMode] {
        &[AgentMode::Default, AgentMode::AutoEdit, AgentMode::Yolo]
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let message = match call.args.get("message").and_then(|v| v.as_str()) {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => return ToolOutput::err(&call.id, "missing 'message' argument"),
        };

        debug!("git_commit tool");

        let mut cmd = Command::new("git");
        cmd.arg("commit").arg("-m").arg(&message);

        match cmd.output().await {
            Ok(output) if output.status.success() => {
                ToolOutput::ok(&call.id, String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => ToolOutput::err(
                &call.id,
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ),
            Err(e) => ToolOutput::err(&call.id, format!("spawn error: {e}")),
        }
    }
}
