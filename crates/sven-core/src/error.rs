// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Errors raised by the agentic loop's internal recovery paths.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A model emitted malformed tool-call JSON and none of the heuristic
    /// repair strategies could recover a parseable value.
    #[error("JSON repair failed: all repair strategies exhausted")]
    JsonRepairExhausted,
}
