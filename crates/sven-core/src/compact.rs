// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::OnceLock;

use regex::Regex;
use sven_model::{Message, MessageContent, Role};
use sven_tools::OutputCategory;

// ─── Heuristic section regexes ────────────────────────────────────────────────

fn accomplished_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(updated|implemented|created|fixed|completed|已完成)\b").unwrap())
}
fn next_steps_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(next|todo|下一步)\b").unwrap())
}
fn risk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(error|denied)\b").unwrap())
}
fn file_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:[\w.\-/]+/)?[\w.\-]+\.[A-Za-z0-9]{1,8}\b").unwrap())
}

const TRUNCATION_MARKER: &str = "...[truncated]";

// ─── Public API ───────────────────────────────────────────────────────────────

/// Deterministic, heuristic conversation-history compactor.
///
/// No model call is made. `messages` is split at `len - keep_recent`; the
/// head is reduced to a single synthesized `[COMPACTION_SUMMARY]` assistant
/// message built from regex/keyword heuristics, and the tail is kept
/// verbatim. No-ops when there is nothing worth summarizing
/// (`len(messages) <= keep_recent + 2`).
///
/// When `prune_tool_outputs` is set, every tool-result message (in the
/// preserved tail too) has its content truncated to keep large outputs from
/// dominating the budget even after compaction.
///
/// Returns the original message count, mirroring the legacy API so callers
/// can still report `tokens_before`/counts the same way.
pub fn compact_session(
    messages: &mut Vec<Message>,
    system_msg: Option<Message>,
    keep_recent: usize,
    prune_tool_outputs: bool,
) -> usize {
    let before = messages.len();

    let non_system: Vec<Message> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();

    if prune_tool_outputs {
        for m in messages.iter_mut() {
            prune_tool_result(m);
        }
    }

    if non_system.len() <= keep_recent + 2 {
        return before;
    }

    let split = non_system.len() - keep_recent;
    let head = &non_system[..split];
    let tail: Vec<Message> = non_system[split..]
        .iter()
        .map(|m| {
            let mut m = m.clone();
            if prune_tool_outputs {
                prune_tool_result(&mut m);
            }
            m
        })
        .collect();

    let summary = synthesize_summary(head);

    messages.clear();
    if let Some(sys) = system_msg {
        messages.push(sys);
    }
    messages.push(Message::assistant(format!(
        "[COMPACTION_SUMMARY]\n{summary}"
    )));
    messages.extend(tail);
    before
}

/// Build the structured Goal/Instructions/Accomplished/Risks/Next
/// Steps/Relevant Files summary for a prefix of non-system messages.
fn synthesize_summary(head: &[Message]) -> String {
    let goal = head
        .iter()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.as_text())
        .unwrap_or("(no initial user request found)")
        .to_string();

    let mut instructions: Vec<String> = Vec::new();
    let mut accomplished: Vec<String> = Vec::new();
    let mut risks: Vec<String> = Vec::new();
    let mut next_steps: Vec<String> = Vec::new();
    let mut files: Vec<String> = Vec::new();

    for (i, m) in head.iter().enumerate() {
        match (&m.role, &m.content) {
            (Role::User, _) if i > 0 => {
                if let Some(text) = m.as_text() {
                    instructions.push(first_line(text));
                }
            }
            (Role::Assistant, MessageContent::Text(text)) => {
                for line in text.lines() {
                    if accomplished_re().is_match(line) {
                        accomplished.push(line.trim().to_string());
                    }
                    if next_steps_re().is_match(line) {
                        next_steps.push(line.trim().to_string());
                    }
                }
                collect_file_paths(text, &mut files);
            }
            (Role::Tool, MessageContent::ToolResult { content, .. }) => {
                if risk_re().is_match(content) {
                    risks.push(first_line(content));
                }
                collect_file_paths(content, &mut files);
            }
            _ => {}
        }
    }

    dedup_preserve_order(&mut instructions);
    dedup_preserve_order(&mut accomplished);
    dedup_preserve_order(&mut risks);
    dedup_preserve_order(&mut next_steps);
    dedup_preserve_order(&mut files);

    let render = |items: &[String]| -> String {
        if items.is_empty() {
            "(none)".to_string()
        } else {
            items.iter().map(|s| format!("- {s}")).collect::<Vec<_>>().join("\n")
        }
    };

    format!(
        "## Goal\n{goal}\n\n\
         ## Instructions\n{}\n\n\
         ## Accomplished\n{}\n\n\
         ## Risks\n{}\n\n\
         ## Next Steps\n{}\n\n\
         ## Relevant Files\n{}",
        render(&instructions),
        render(&accomplished),
        render(&risks),
        render(&next_steps),
        render(&files),
    )
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or(text).trim().to_string()
}

fn collect_file_paths(text: &str, out: &mut Vec<String>) {
    for m in file_path_re().find_iter(text) {
        out.push(m.as_str().to_string());
    }
}

fn dedup_preserve_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|s| seen.insert(s.clone()));
}

/// Truncate a tool-result message's content in place to `prune_tool_outputs`'s
/// 1200-rune budget, falling back to 2000-byte truncation if the content
/// does not parse as a JSON object with `content`/`stdout`/`stderr` fields.
fn prune_tool_result(m: &mut Message) {
    if let MessageContent::ToolResult { content, .. } = &mut m.content {
        *content = truncate_tool_content(content);
    }
}

fn truncate_tool_content(content: &str) -> String {
    const RUNE_CAP: usize = 1200;
    const BYTE_CAP: usize = 2000;

    if let Ok(mut value) = serde_json::from_str::<serde_json::Value>(content) {
        if let Some(obj) = value.as_object_mut() {
            let mut changed = false;
            for key in ["content", "stdout", "stderr"] {
                if let Some(s) = obj.get(key).and_then(|v| v.as_str()) {
                    if s.chars().count() > RUNE_CAP {
                        let truncated: String = s.chars().take(RUNE_CAP).collect();
                        obj.insert(
                            key.to_string(),
                            serde_json::Value::String(format!("{truncated}{TRUNCATION_MARKER}")),
                        );
                        changed = true;
                    }
                }
            }
            if changed {
                return serde_json::to_string(&value).unwrap_or_else(|_| content.to_string());
            }
            return content.to_string();
        }
    }

    if content.len() > BYTE_CAP {
        let cut = content
            .char_indices()
            .take_while(|(i, _)| *i < BYTE_CAP)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(BYTE_CAP.min(content.len()));
        format!("{}{TRUNCATION_MARKER}", &content[..cut])
    } else {
        content.to_string()
    }
}

/// Emergency fallback compaction used when the session is too large to fit even
/// a compaction prompt within the context window.
///
/// Drops all but the last `keep_n` non-system messages and prepends a canned
/// notice.  No model call is made — this is a purely deterministic operation
/// that always succeeds regardless of session size.
pub fn emergency_compact(
    messages: &mut Vec<Message>,
    system_msg: Option<Message>,
    keep_n: usize,
) -> usize {
    let before = messages.len();
    let non_system: Vec<Message> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();
    let keep = keep_n.min(non_system.len());
    let preserved: Vec<Message> = non_system[non_system.len() - keep..].to_vec();
    let notice = Message::assistant(
        "[Context emergency-compacted: earlier history was dropped to prevent a \
         context-window overflow. The agent may lack full context for earlier \
         decisions. Proceed carefully and ask the user to re-provide any missing \
         requirements if needed.]",
    );
    messages.clear();
    if let Some(sys) = system_msg {
        messages.push(sys);
    }
    messages.push(notice);
    messages.extend(preserved);
    before
}

/// Deterministic, content-aware tool-result truncation.
///
/// Returns `content` unchanged when it fits within `cap_tokens`.
/// Otherwise applies a category-specific extraction strategy that preserves
/// the most useful portion of the output.  Dispatching on [`OutputCategory`]
/// (not on tool names) keeps this function independent of the tools crate's
/// concrete tool list; each tool declares its own category.
///
/// - [`OutputCategory::HeadTail`]: keep the first 60 + last 40 lines so both
///   the command preamble and the final result are visible.
/// - [`OutputCategory::MatchList`]: keep leading matches (highest relevance
///   first); the tail is not preserved because later matches are less relevant.
/// - [`OutputCategory::FileContent`]: balanced head + tail with a separator,
///   preserving both the imports/declarations and the most recent changes.
/// - [`OutputCategory::Generic`]: hard-truncate at the nearest line boundary.
///
/// Every truncated result ends with an explicit notice so the model knows
/// that additional content exists and how to retrieve it.
pub fn smart_truncate(content: &str, category: OutputCategory, cap_tokens: usize) -> String {
    if cap_tokens == 0 {
        return content.to_string();
    }
    let cap_chars = cap_tokens * 4;
    if content.len() <= cap_chars {
        return content.to_string();
    }
    let omitted_bytes = content.len().saturating_sub(cap_chars);
    match category {
        OutputCategory::HeadTail => head_tail_lines(
            content,
            cap_chars,
            60,
            40,
            &format!("[... {{lines}} lines / {omitted_bytes} bytes omitted ...]"),
        ),
        OutputCategory::MatchList => head_lines(
            content,
            cap_chars,
            &format!(
                "[... {{lines}} more matches omitted ({omitted_bytes} bytes); \
                     use a more specific pattern to see them ...]"
            ),
        ),
        OutputCategory::FileContent => head_tail_lines(
            content,
            cap_chars,
            usize::MAX,
            usize::MAX,
            &format!(
                "[... {{lines}} lines omitted ({omitted_bytes} bytes); \
                     use read_file with offset/limit to see more ...]"
            ),
        ),
        OutputCategory::Generic => {
            let cut = content[..cap_chars]
                .rfind('\n')
                .map(|p| p + 1)
                .unwrap_or(cap_chars);
            format!(
                "{}\n[... {omitted_bytes} bytes omitted; \
                 content truncated to fit context budget ...]",
                &content[..cut]
            )
        }
    }
}

// ─── Private helpers ──────────────────────────────────────────────────────────

/// Keep only the leading lines that fit within `cap_chars`.
fn head_lines(content: &str, cap_chars: usize, notice_template: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut kept = String::with_capacity(cap_chars);
    let mut kept_count = 0usize;
    for line in &lines {
        let needed = if kept.is_empty() {
            line.len()
        } else {
            line.len() + 1
        };
        if kept.len() + needed > cap_chars {
            break;
        }
        if !kept.is_empty() {
            kept.push('\n');
        }
        kept.push_str(line);
        kept_count += 1;
    }
    let omitted = lines.len().saturating_sub(kept_count);
    if omitted == 0 {
        return content[..cap_chars.min(content.len())].to_string();
    }
    let notice = notice_template.replace("{lines}", &omitted.to_string());
    format!("{kept}\n{notice}")
}

/// Keep `max_head` leading lines and `max_tail` trailing lines, inserting a
/// notice between them.  Pass `usize::MAX` to split evenly by character budget.
fn head_tail_lines(
    content: &str,
    cap_chars: usize,
    max_head: usize,
    max_tail: usize,
    notice_template: &str,
) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let half_cap = cap_chars / 2;

    // Head
    let mut head = String::with_capacity(half_cap);
    let mut head_count = 0usize;
    for line in lines.iter().take(max_head) {
        let needed = if head.is_empty() {
            line.len()
        } else {
            line.len() + 1
        };
        if head.len() + needed > half_cap {
            break;
        }
        if !head.is_empty() {
            head.push('\n');
        }
        head.push_str(line);
        head_count += 1;
    }

    // Tail (collect from the end)
    let mut tail_lines: Vec<&str> = Vec::new();
    let mut tail_chars = 0usize;
    for line in lines.iter().rev().take(max_tail) {
        let needed = if tail_lines.is_empty() {
            line.len()
        } else {
            line.len() + 1
        };
        if tail_chars + needed > half_cap {
            break;
        }
        tail_chars += needed;
        tail_lines.push(line);
    }
    tail_lines.reverse();
    let tail_count = tail_lines.len();
    let tail = tail_lines.join("\n");

    let omitted = lines.len().saturating_sub(head_count + tail_count);
    if omitted == 0 {
        return content[..cap_chars.min(content.len())].to_string();
    }
    let notice = notice_template.replace("{lines}", &omitted.to_string());
    format!("{head}\n{notice}\n{tail}")
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
