// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable session metadata (one row in `sessions`).
///
/// `id` is immutable once created. `title` is normally derived from the
/// first user message when the session is still untitled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub title: String,
    pub agent_name: String,
    pub model_name: String,
    pub workspace_root: String,
    pub summary: String,
    pub compaction_auto: bool,
    pub compaction_prune: bool,
    pub last_compacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionMeta {
    /// Start a new session with a fresh id and `created_at`/`updated_at` set
    /// to now. `title` is left empty; callers derive it from the first user
    /// message once one exists.
    pub fn new(agent_name: impl Into<String>, model_name: impl Into<String>, workspace_root: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            agent_name: agent_name.into(),
            model_name: model_name.into(),
            workspace_root: workspace_root.into(),
            summary: String::new(),
            compaction_auto: true,
            compaction_prune: true,
            last_compacted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One audit entry for a permission decision that reached the user
/// (an `Ask` that was actually prompted, or a `Deny`). Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub session_id: String,
    pub tool: String,
    pub decision: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl PermissionEntry {
    pub fn new(session_id: impl Into<String>, tool: impl Into<String>, decision: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            tool: tool.into(),
            decision: decision.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}
