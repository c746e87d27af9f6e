// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sven_model::Message;
use sven_tools::events::{normalize_priority, normalize_status, TodoItem};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::types::{PermissionEntry, SessionMeta};
use crate::SessionStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id                 TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    agent_name         TEXT NOT NULL,
    model_name         TEXT NOT NULL,
    workspace_root     TEXT NOT NULL,
    summary            TEXT NOT NULL DEFAULT '',
    compaction_auto    INTEGER NOT NULL DEFAULT 1,
    compaction_prune   INTEGER NOT NULL DEFAULT 1,
    last_compacted_at  TEXT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    session_id   TEXT NOT NULL,
    seq          INTEGER NOT NULL,
    content_json TEXT NOT NULL,
    PRIMARY KEY (session_id, seq),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS todos (
    session_id TEXT NOT NULL,
    id         TEXT NOT NULL,
    content    TEXT NOT NULL,
    status     TEXT NOT NULL,
    priority   TEXT NOT NULL,
    sort_order INTEGER NOT NULL,
    PRIMARY KEY (session_id, id),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS permission_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    tool       TEXT NOT NULL,
    decision   TEXT NOT NULL,
    reason     TEXT NOT NULL,
    timestamp  TEXT NOT NULL
);
"#;

/// `rusqlite`-backed session store. One writer per session is enforced by
/// serializing all access behind a single `tokio::sync::Mutex<Connection>`
/// per store handle, matching the orchestrator's own single-writer
/// guarantee rather than relying on SQLite's file-level locking.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if absent) `<base_dir>/coder.db` and apply the schema.
    pub fn open(base_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(base_dir)?;
        let conn = Connection::open(base_dir.join("coder.db"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn row_to_meta(row: &rusqlite::Row) -> rusqlite::Result<SessionMeta> {
        let last_compacted_at: Option<String> = row.get(8)?;
        let created_at: String = row.get(9)?;
        let updated_at: String = row.get(10)?;
        Ok(SessionMeta {
            id: row.get(0)?,
            title: row.get(1)?,
            agent_name: row.get(2)?,
            model_name: row.get(3)?,
            workspace_root: row.get(4)?,
            summary: row.get(5)?,
            compaction_auto: row.get::<_, i64>(6)? != 0,
            compaction_prune: row.get::<_, i64>(7)? != 0,
            last_compacted_at: last_compacted_at.and_then(|s| parse_rfc3339(&s)),
            created_at: parse_rfc3339(&created_at).unwrap_or_else(Utc::now),
            updated_at: parse_rfc3339(&updated_at).unwrap_or_else(Utc::now),
        })
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, meta: &SessionMeta) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sessions (id, title, agent_name, model_name, workspace_root, summary, \
             compaction_auto, compaction_prune, last_compacted_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                meta.id,
                meta.title,
                meta.agent_name,
                meta.model_name,
                meta.workspace_root,
                meta.summary,
                meta.compaction_auto as i64,
                meta.compaction_prune as i64,
                meta.last_compacted_at.map(|t| t.to_rfc3339()),
                meta.created_at.to_rfc3339(),
                meta.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn save_session(&self, meta: &SessionMeta) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sessions (id, title, agent_name, model_name, workspace_root, summary, \
             compaction_auto, compaction_prune, last_compacted_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(id) DO UPDATE SET \
               title = excluded.title, agent_name = excluded.agent_name, \
               model_name = excluded.model_name, workspace_root = excluded.workspace_root, \
               summary = excluded.summary, compaction_auto = excluded.compaction_auto, \
               compaction_prune = excluded.compaction_prune, \
               last_compacted_at = excluded.last_compacted_at, updated_at = excluded.updated_at",
            params![
                meta.id,
                meta.title,
                meta.agent_name,
                meta.model_name,
                meta.workspace_root,
                meta.summary,
                meta.compaction_auto as i64,
                meta.compaction_prune as i64,
                meta.last_compacted_at.map(|t| t.to_rfc3339()),
                meta.created_at.to_rfc3339(),
                meta.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn load_session(&self, id: &str) -> StoreResult<Option<SessionMeta>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, title, agent_name, model_name, workspace_root, summary, \
             compaction_auto, compaction_prune, last_compacted_at, created_at, updated_at \
             FROM sessions WHERE id = ?1",
            params![id],
            Self::row_to_meta,
        )
        .optional()
        .map_err(StoreError::from)
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionMeta>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, title, agent_name, model_name, workspace_root, summary, \
             compaction_auto, compaction_prune, last_compacted_at, created_at, updated_at \
             FROM sessions ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_meta)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    async fn save_messages(&self, session_id: &str, messages: &[Message]) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM messages WHERE session_id = ?1", params![session_id])?;
        for (seq, msg) in messages.iter().enumerate() {
            let content_json = serde_json::to_string(msg)?;
            tx.execute(
                "INSERT INTO messages (session_id, seq, content_json) VALUES (?1, ?2, ?3)",
                params![session_id, seq as i64, content_json],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn append_messages(&self, session_id: &str, start_seq: i64, messages: &[Message]) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;
        for (i, msg) in messages.iter().enumerate() {
            let content_json = serde_json::to_string(msg)?;
            tx.execute(
                "INSERT INTO messages (session_id, seq, content_json) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(session_id, seq) DO UPDATE SET content_json = excluded.content_json",
                params![session_id, start_seq + i as i64, content_json],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn load_messages(&self, session_id: &str) -> StoreResult<Vec<Message>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT content_json FROM messages WHERE session_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            let content_json = r?;
            out.push(serde_json::from_str(&content_json)?);
        }
        Ok(out)
    }

    async fn list_todos(&self, session_id: &str) -> StoreResult<Vec<TodoItem>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, content, status, priority FROM todos WHERE session_id = ?1 ORDER BY sort_order ASC",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(TodoItem {
                id: row.get(0)?,
                content: row.get(1)?,
                status: row.get(2)?,
                priority: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    async fn replace_todos(&self, session_id: &str, items: &[TodoItem]) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM todos WHERE session_id = ?1", params![session_id])?;
        for (i, item) in items.iter().enumerate() {
            tx.execute(
                "INSERT INTO todos (session_id, id, content, status, priority, sort_order) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session_id,
                    item.id,
                    item.content,
                    normalize_status(&item.status),
                    normalize_priority(&item.priority),
                    i as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn log_permission(&self, entry: PermissionEntry) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO permission_log (session_id, tool, decision, reason, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.session_id,
                entry.tool,
                entry.decision,
                entry.reason,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
