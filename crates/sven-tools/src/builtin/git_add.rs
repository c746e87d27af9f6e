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

pub struct GitAddTool;

#[async_trait]
impl Tool for GitAddTool {
    fn name(&self) -> &str {
        "git_add"
    }

    fn description(&self) -> &str {
        "Stage specific files for commit with 'git add'. Always pass explicit paths — \
         never stage with a blanket '.' or '-A' unless the user asked for that."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "File paths to stage, relative to the repo root"
                }
            },
            "required": ["paths"],
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
        let paths: Vec<String> = match call.args.get("paths").and_then(|v| v.as_array()) {
            Some(arr) => arr
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            None => return ToolOutput::err(&call.id, "missing 'paths' argument"),
        };
        if paths.is_empty() {
            return ToolOutput::err(&call.id, "'paths' must contain at least one file");
        }

        debug!(?paths, "git_add tool");

        let mut cmd = Command::new("git");
        cmd.arg("add").args(&paths);

        match cmd.output().await {
            Ok(output) if output.status.success() => {
                ToolOutput::ok(&call.id, format!("staged {} path(s)", paths.len()))
            }
            Ok(output) => ToolOutput::err(
                &call.id,
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ),
            Err(e) => ToolOutput::err(&call.id, format!("spawn error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn call(args: Value) -> ToolCall {
        ToolCall { id: "1".into(), name: "git_add".into(), args }
    }

    #[test]
    fn default_policy_is_ask() {
        assert_eq!(GitAddTool.default_policy(), ApprovalPolicy::Ask);
    }

    #[test]
    fn disabled_in_plan_mode() {
        assert!(!GitAddTool.modes().contains(&AgentMode::Plan));
    }

    #[tokio::test]
    async fn missing_paths_is_error() {
        let out = GitAddTool.execute(&call(json!({}))).await;
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn empty_paths_is_error() {
        let out = GitAddTool.execute(&call(json!({"paths": []}))).await;
        assert!(out.is_error);
    }
}
