// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Persistence for sessions, ordered messages, todos, and the permission
//! audit log. `SqliteStore` is the one real backend; `JsonStore` is a
//! read-only reader for the legacy on-disk layout, used only by the
//! one-time migration importer.

mod error;
mod json;
mod migrate;
mod sqlite;
mod types;

pub use error::{StoreError, StoreResult};
pub use json::JsonStore;
pub use migrate::migrate_json_to_sqlite;
pub use sqlite::SqliteStore;
pub use types::{PermissionEntry, SessionMeta};

use async_trait::async_trait;
use sven_model::Message;
use sven_tools::events::TodoItem;

/// The session store contract. The orchestrator is the only writer; the
/// store itself enforces one writer per session by serializing all access
/// behind a single connection-guarding lock (see `SqliteStore`).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a brand-new session row. Errors if `meta.id` already exists.
    async fn create_session(&self, meta: &SessionMeta) -> StoreResult<()>;

    /// Upsert session metadata (title/summary/compaction flags/timestamps).
    async fn save_session(&self, meta: &SessionMeta) -> StoreResult<()>;

    async fn load_session(&self, id: &str) -> StoreResult<Option<SessionMeta>>;

    /// All known sessions, most recently updated first.
    async fn list_sessions(&self) -> StoreResult<Vec<SessionMeta>>;

    /// Replace the full message history for `session_id` with `messages`,
    /// renumbering sequence from zero.
    async fn save_messages(&self, session_id: &str, messages: &[Message]) -> StoreResult<()>;

    /// Append `messages` starting at `start_seq` without touching earlier
    /// rows. Used for incremental persistence after a turn.
    async fn append_messages(&self, session_id: &str, start_seq: i64, messages: &[Message]) -> StoreResult<()>;

    /// All messages for `session_id`, ordered by sequence (insertion order).
    async fn load_messages(&self, session_id: &str) -> StoreResult<Vec<Message>>;

    async fn list_todos(&self, session_id: &str) -> StoreResult<Vec<TodoItem>>;

    /// Replace the full todo list for `session_id`, normalizing unknown
    /// status/priority values the way the `todowrite` tool does.
    async fn replace_todos(&self, session_id: &str, items: &[TodoItem]) -> StoreResult<()>;

    /// Append one permission-decision audit entry.
    async fn log_permission(&self, entry: PermissionEntry) -> StoreResult<()>;
}
