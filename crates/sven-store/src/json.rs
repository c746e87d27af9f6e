// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Read-only reader for the legacy on-disk session layout
//! (`<id>.meta.json`, `<id>.messages.json`, `<id>.todo.json`). Never written
//! to by a current-version binary; it exists purely so the one-time
//! migration importer can read sessions created before the SQLite store
//! existed. The `<id>.jsonl` turn log from that layout carries no
//! information the store contract needs and is not read here.

use std::path::PathBuf;

use sven_model::Message;
use sven_tools::events::TodoItem;

use crate::error::StoreResult;
use crate::types::SessionMeta;

pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Session ids present in the legacy layout, derived from `*.meta.json` filenames.
    pub fn list_session_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        if !self.dir.is_dir() {
            return Ok(ids);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(".meta.json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Read one legacy session in full. Returns `None` if its meta file is
    /// absent; missing messages/todo files are treated as empty rather than
    /// an error, since older layouts may predate the todo feature.
    pub fn load_session(&self, id: &str) -> StoreResult<Option<(SessionMeta, Vec<Message>, Vec<TodoItem>)>> {
        let meta_path = self.dir.join(format!("{id}.meta.json"));
        if !meta_path.is_file() {
            return Ok(None);
        }
        let meta: SessionMeta = serde_json::from_str(&std::fs::read_to_string(meta_path)?)?;

        let messages_path = self.dir.join(format!("{id}.messages.json"));
        let messages: Vec<Message> = if messages_path.is_file() {
            serde_json::from_str(&std::fs::read_to_string(messages_path)?)?
        } else {
            Vec::new()
        };

        let todo_path = self.dir.join(format!("{id}.todo.json"));
        let todos: Vec<TodoItem> = if todo_path.is_file() {
            serde_json::from_str(&std::fs::read_to_string(todo_path)?)?
        } else {
            Vec::new()
        };

        Ok(Some((meta, messages, todos)))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
