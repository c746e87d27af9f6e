// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! One-time importer: copy any legacy JSON session not already present in
//! the database. Idempotent — safe to call on every startup.

use crate::error::StoreResult;
use crate::json::JsonStore;
use crate::sqlite::SqliteStore;
use crate::SessionStore;

/// Copy every session from `json` that `sqlite` doesn't already have.
/// Returns the number of sessions imported.
pub async fn migrate_json_to_sqlite(json: &JsonStore, sqlite: &SqliteStore) -> StoreResult<usize> {
    let mut imported = 0;
    for id in json.list_session_ids()? {
        if sqlite.load_session(&id).await?.is_some() {
            continue;
        }
        let Some((meta, messages, todos)) = json.load_session(&id)? else {
            continue;
        };
        sqlite.create_session(&meta).await?;
        sqlite.save_messages(&id, &messages).await?;
        sqlite.replace_todos(&id, &todos).await?;
        imported += 1;
    }
    Ok(imported)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
