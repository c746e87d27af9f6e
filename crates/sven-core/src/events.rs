// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use sven_config::AgentMode;
use sven_tools::{events::TodoItem, ToolCall};

/// Which compaction path produced a `ContextCompacted` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStrategyUsed {
    /// Deterministic heuristic summarization (the normal path).
    Heuristic,
    /// Oldest messages dropped outright because even the heuristic summary
    /// would not fit the remaining budget.
    Emergency,
}

/// Events emitted by the agent during a single turn.
/// Consumers (CI runner, TUI) subscribe to these to drive their output.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A text chunk streamed from the model
    TextDelta(String),
    /// A complete text response from the model (after streaming finishes)
    TextComplete(String),
    /// A thinking/reasoning chunk from the model (extended thinking API).
    /// Consumers should accumulate deltas and finalise them into a Thinking
    /// segment when the model signals the end of the reasoning block.
    ThinkingDelta(String),
    /// A complete thinking/reasoning block (accumulated from ThinkingDelta events).
    ThinkingComplete(String),
    /// The model has requested a tool call
    ToolCallStarted(ToolCall),
    /// A tool call finished
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },
    /// Context was compacted; statistics for the UI
    ContextCompacted {
        tokens_before: usize,
        tokens_after: usize,
        strategy: CompactionStrategyUsed,
        turn: u32,
    },
    /// Current token usage update
    TokenUsage {
        input: u32,
        output: u32,
        /// Tokens served from the provider's prompt cache this turn.
        cache_read: u32,
        /// Tokens written into the provider's prompt cache this turn.
        cache_write: u32,
        /// Cumulative cache-read tokens for the session so far.
        cache_read_total: u64,
        /// Cumulative cache-write tokens for the session so far.
        cache_write_total: u64,
        /// The session's context window size, for computing a fraction.
        max_tokens: usize,
    },
    /// The agent has finished processing the current user turn
    TurnComplete,
    /// A recoverable error occurred
    Error(String),
    /// A turn was cancelled (interrupt or soft-cancel) before completion.
    /// Any text streamed so far has already been committed to the session.
    Aborted { partial_text: String },
    /// The turn was terminated because the tool-call step budget was
    /// exhausted without the model producing a final answer.
    StepLimitReached { max_steps: u32 },
    /// The todo list was updated
    TodoUpdate(Vec<TodoItem>),
    /// The agent mode was changed
    ModeChanged(AgentMode),
    /// The agent is asking the user a question (id links to QuestionAnswer)
    Question { id: String, questions: Vec<String> },
    /// Answer to a previous Question event
    QuestionAnswer { id: String, answer: String },
    /// A permission decision reached the user (an `Ask` that was actually
    /// prompted, an `Ask` resolved by the command allowlist, or a `Deny`).
    /// Pure `Auto` clearances are not reported. `decision` is one of
    /// `"deny"`, `"allow_once"`, `"allow_always"`.
    PermissionDecision {
        tool_name: String,
        decision: String,
        reason: String,
    },
}
