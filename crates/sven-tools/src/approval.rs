// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

/// The user's answer to an approval prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Run this one call, ask again next time.
    AllowOnce,
    /// Run this call and remember the command/tool so future `Ask`
    /// decisions for it resolve to `Allow` automatically.
    AllowAlways,
    /// Refuse this call.
    Deny,
}

/// Why a tool call landed on `Ask`: distinguishes an ordinary policy
/// decision from the dangerous-command analyzer forcing one. Non-interactive
/// channels must never auto-allow a `Dangerous` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalReason {
    Policy,
    Dangerous,
}

/// One pending approval request surfaced to the user (or an automated
/// decider in headless mode).
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub reason: ApprovalReason,
    /// The shell command, when the request originates from `shell` /
    /// `run_terminal_command`. `AllowAlways` for these is recorded in the
    /// command allowlist; for other tools it only affects this call.
    pub bash_command: Option<String>,
}

/// Where `Ask` decisions are resolved. A TUI implementation prompts the
/// user interactively; headless/CI runs use [`AutoApprovalChannel`].
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    async fn prompt(&self, request: ApprovalRequest) -> ApprovalDecision;
}

/// Non-interactive approval channel for headless/CI runs.
///
/// `Ask` decisions auto-allow iff `auto_approve_ask` is set AND the request's
/// reason is `Policy` — a `Dangerous` reason (the bash risk analyzer fired)
/// always denies, since there is no one to ask.
pub struct AutoApprovalChannel {
    pub auto_approve_ask: bool,
}

impl AutoApprovalChannel {
    pub fn new(auto_approve_ask: bool) -> Self {
        Self { auto_approve_ask }
    }
}

#[async_trait]
impl ApprovalChannel for AutoApprovalChannel {
    async fn prompt(&self, request: ApprovalRequest) -> ApprovalDecision {
        match request.reason {
            ApprovalReason::Dangerous => ApprovalDecision::Deny,
            ApprovalReason::Policy => {
                if self.auto_approve_ask {
                    ApprovalDecision::AllowOnce
                } else {
                    ApprovalDecision::Deny
                }
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
