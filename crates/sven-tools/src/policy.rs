// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use regex::Regex;
use sven_config::PermissionConfig;

/// Per-tool approval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Always run without asking
    Auto,
    /// Ask user before each invocation
    Ask,
    /// Never run; return an error
    Deny,
}

impl ApprovalPolicy {
    fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "allow" | "auto" => ApprovalPolicy::Auto,
            "deny" => ApprovalPolicy::Deny,
            _ => ApprovalPolicy::Ask,
        }
    }
}

/// Permission Policy: a pure function from (tool name, bash command) to an
/// [`ApprovalPolicy`] decision, plus the persistent command allowlist that
/// `AllowAlways` responses extend.
///
/// The dangerous-command risk analyzer lives in the `shell`/`run_terminal_command`
/// tool bodies (see [`analyze_bash_risk`]), not here: the policy itself stays a
/// pure lookup over config, and the analyzer's "force Ask, bypass allowlist"
/// result is applied by the caller before consulting this policy.
#[derive(Debug, Clone)]
pub struct ToolPolicy {
    default: ApprovalPolicy,
    /// Glob pattern → decision, for the `bash`/`shell` tools.
    bash_patterns: Vec<(Regex, usize, ApprovalPolicy)>,
    /// Per-tool name → decision.
    tools: std::collections::HashMap<String, ApprovalPolicy>,
    /// Normalized (lowercase base-name) commands promoted to Allow by a past
    /// `AllowAlways` response.
    command_allowlist: std::collections::HashSet<String>,
}

impl ToolPolicy {
    pub fn from_config(cfg: &PermissionConfig) -> Self {
        let default = ApprovalPolicy::from_str(&cfg.default);

        let mut bash_patterns: Vec<(Regex, usize, ApprovalPolicy)> = cfg
            .bash
            .iter()
            .filter_map(|(pattern, decision)| {
                glob_to_regex(pattern)
                    .map(|re| (re, pattern.len(), ApprovalPolicy::from_str(decision)))
            })
            .collect();
        // Longest pattern wins on a tie between multiple matches.
        bash_patterns.sort_by(|a, b| b.1.cmp(&a.1));

        let tools = cfg
            .tools
            .iter()
            .map(|(name, decision)| (name.clone(), ApprovalPolicy::from_str(decision)))
            .collect();

        let command_allowlist = cfg
            .command_allowlist
            .iter()
            .map(|c| normalize_command(c))
            .collect();

        Self {
            default,
            bash_patterns,
            tools,
            command_allowlist,
        }
    }

    /// Decide the policy for a non-bash tool by name.
    ///
    /// Resolution order: `permission.tools.<name>` > `permission.default` >
    /// `"ask"`.
    pub fn decide_tool(&self, tool_name: &str) -> ApprovalPolicy {
        self.tools
            .get(tool_name)
            .copied()
            .unwrap_or(self.default)
    }

    /// Decide the policy for a shell/bash command string.
    ///
    /// The longest matching glob in `permission.bash` wins. If that decision
    /// is `Ask`, the normalized command base-name is checked against the
    /// command allowlist and upgraded to `Allow` when present. Callers that
    /// have already run [`analyze_bash_risk`] and found it dangerous must
    /// skip this upgrade entirely — dangerous commands never consult the
    /// allowlist.
    pub fn decide_bash(&self, command: &str) -> ApprovalPolicy {
        let decision = self
            .bash_patterns
            .iter()
            .find(|(re, _, _)| re.is_match(command))
            .map(|(_, _, d)| *d)
            .unwrap_or(self.default);

        if decision == ApprovalPolicy::Ask && self.is_allowlisted(command) {
            return ApprovalPolicy::Auto;
        }
        decision
    }

    fn is_allowlisted(&self, command: &str) -> bool {
        self.command_allowlist.contains(&normalize_command(command))
    }

    /// Record `command`'s base-name in the allowlist so future `Ask`
    /// decisions for it resolve to `Allow`. No-op if already present.
    pub fn add_to_command_allowlist(&mut self, command: &str) {
        self.command_allowlist.insert(normalize_command(command));
    }

    /// Human-readable summary for the `/permissions` REPL command: the
    /// default decision, per-tool overrides, and commands promoted to
    /// Allow by a past `AllowAlways` response.
    pub fn describe(&self) -> String {
        let mut out = format!("default: {:?}\n", self.default);
        if !self.tools.is_empty() {
            out.push_str("tools:\n");
            let mut entries: Vec<_> = self.tools.iter().collect();
            entries.sort_by_key(|(name, _)| name.clone());
            for (name, decision) in entries {
                out.push_str(&format!("  {name}: {decision:?}\n"));
            }
        }
        if !self.command_allowlist.is_empty() {
            out.push_str("allowlisted commands:\n");
            let mut commands: Vec<_> = self.command_allowlist.iter().collect();
            commands.sort();
            for command in commands {
                out.push_str(&format!("  {command}\n"));
            }
        }
        out
    }
}

/// Normalize a command (or bare base-name) to the lowercase base-name used
/// for allowlist matching: strips a leading path, leading `VAR=value`
/// environment assignments, and any arguments.
fn normalize_command(command: &str) -> String {
    let mut token = command.trim();
    loop {
        let Some((head, rest)) = token.split_once(char::is_whitespace) else {
            break;
        };
        if head.contains('=') && !head.starts_with('/') {
            token = rest.trim_start();
            continue;
        }
        token = head;
        break;
    }
    let base = token.rsplit('/').next().unwrap_or(token);
    base.to_ascii_lowercase()
}

/// Dangerous-command risk analyzer, applied inside the bash/shell tool body
/// (not the policy above): detects destructive commands, command
/// substitution, and other patterns that must always force an `Ask`
/// decision and bypass the command allowlist regardless of policy config.
///
/// Returns `Some(reason)` when the command is judged dangerous.
pub fn analyze_bash_risk(command: &str) -> Option<&'static str> {
    static DANGEROUS_LEADING: &[&str] = &[
        "rm", "mv", "chmod", "chown", "dd", "mkfs", "shutdown", "reboot",
    ];

    let trimmed = command.trim();
    for part in split_on_shell_separators(trimmed) {
        let leading = part
            .trim()
            .split_whitespace()
            .next()
            .map(|w| w.rsplit('/').next().unwrap_or(w));
        if let Some(cmd) = leading {
            if DANGEROUS_LEADING.contains(&cmd) {
                return Some("dangerous command");
            }
        }
    }

    if command.contains("$(") || command.contains('`') {
        return Some("command substitution");
    }

    None
}

/// Split a shell command line on `;`, `&&`, `||`, and `|` so each segment's
/// leading command can be checked independently.
fn split_on_shell_separators(command: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let bytes = command.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &command[i..];
        let sep_len = if rest.starts_with("&&") || rest.starts_with("||") {
            Some(2)
        } else if rest.starts_with(';') || rest.starts_with('|') {
            Some(1)
        } else {
            None
        };
        if let Some(len) = sep_len {
            parts.push(&command[start..i]);
            i += len;
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(&command[start..]);
    parts
}

/// Convert a simple shell glob pattern to a [`Regex`].
/// Only `*` (match anything) and `?` (match one char) are supported.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => {
                for esc in regex::escape(&c.to_string()).chars() {
                    re.push(esc);
                }
            }
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sven_config::PermissionConfig;
    use std::collections::BTreeMap;

    fn policy_with(bash: &[(&str, &str)], allowlist: &[&str]) -> ToolPolicy {
        let mut bash_map = BTreeMap::new();
        for (pat, dec) in bash {
            bash_map.insert(pat.to_string(), dec.to_string());
        }
        ToolPolicy::from_config(&PermissionConfig {
            default: "ask".into(),
            bash: bash_map,
            command_allowlist: allowlist.iter().map(|s| s.to_string()).collect(),
            tools: BTreeMap::new(),
        })
    }

    // ── Per-tool default table ─────────────────────────────────────────────────

    #[test]
    fn default_table_allows_read() {
        let p = ToolPolicy::from_config(&PermissionConfig::default());
        assert_eq!(p.decide_tool("read_file"), ApprovalPolicy::Auto);
    }

    #[test]
    fn default_table_asks_for_write() {
        let p = ToolPolicy::from_config(&PermissionConfig::default());
        assert_eq!(p.decide_tool("write"), ApprovalPolicy::Ask);
    }

    #[test]
    fn unknown_tool_falls_back_to_default() {
        let p = ToolPolicy::from_config(&PermissionConfig::default());
        assert_eq!(p.decide_tool("some_unknown_tool"), ApprovalPolicy::Ask);
    }

    #[test]
    fn config_default_of_allow_applies_to_unknown_tool() {
        let p = ToolPolicy::from_config(&PermissionConfig {
            default: "allow".into(),
            ..PermissionConfig::default()
        });
        assert_eq!(p.decide_tool("some_unknown_tool"), ApprovalPolicy::Auto);
    }

    // ── Bash longest-glob-match ────────────────────────────────────────────────

    #[test]
    fn bash_longest_pattern_wins() {
        let p = policy_with(&[("git *", "allow"), ("git push *", "ask")], &[]);
        assert_eq!(p.decide_bash("git push origin main"), ApprovalPolicy::Ask);
        assert_eq!(p.decide_bash("git status"), ApprovalPolicy::Auto);
    }

    #[test]
    fn bash_no_match_falls_back_to_default() {
        let p = policy_with(&[("git *", "allow")], &[]);
        assert_eq!(p.decide_bash("npm install"), ApprovalPolicy::Ask);
    }

    // ── Allowlist upgrade ──────────────────────────────────────────────────────

    #[test]
    fn allowlisted_command_upgrades_ask_to_allow() {
        let p = policy_with(&[("npm *", "ask")], &["npm"]);
        assert_eq!(p.decide_bash("npm install"), ApprovalPolicy::Auto);
    }

    #[test]
    fn allowlist_does_not_upgrade_deny() {
        let p = policy_with(&[("rm *", "deny")], &["rm"]);
        assert_eq!(p.decide_bash("rm -rf /tmp/x"), ApprovalPolicy::Deny);
    }

    #[test]
    fn add_to_command_allowlist_then_upgrades() {
        let mut p = policy_with(&[("npm *", "ask")], &[]);
        assert_eq!(p.decide_bash("npm install"), ApprovalPolicy::Ask);
        p.add_to_command_allowlist("npm install");
        assert_eq!(p.decide_bash("npm install"), ApprovalPolicy::Auto);
    }

    #[test]
    fn add_to_command_allowlist_is_idempotent() {
        let mut p = policy_with(&[], &["npm"]);
        p.add_to_command_allowlist("npm");
        p.add_to_command_allowlist("npm");
        assert_eq!(p.decide_bash("npm test"), ApprovalPolicy::Ask); // no bash pattern matches; default ask
    }

    #[test]
    fn normalize_strips_path_and_env_assignment() {
        assert_eq!(normalize_command("FOO=bar /usr/bin/npm install"), "npm");
        assert_eq!(normalize_command("NPM_CONFIG_X=1 npm"), "npm");
        assert_eq!(normalize_command("/usr/local/bin/Git status"), "git");
    }

    // ── Dangerous-command analyzer ────────────────────────────────────────────

    #[test]
    fn analyzer_flags_rm() {
        assert!(analyze_bash_risk("rm -rf /tmp/x").is_some());
    }

    #[test]
    fn analyzer_flags_rm_after_separator() {
        assert!(analyze_bash_risk("cd /tmp && rm -rf x").is_some());
    }

    #[test]
    fn analyzer_flags_command_substitution() {
        assert!(analyze_bash_risk("echo $(cat /etc/passwd)").is_some());
        assert!(analyze_bash_risk("echo `whoami`").is_some());
    }

    #[test]
    fn analyzer_allows_benign_command() {
        assert!(analyze_bash_risk("git status").is_none());
        assert!(analyze_bash_risk("ls -la").is_none());
    }

    #[test]
    fn analyzer_allows_commands_mentioning_rm_as_argument() {
        // "rm" only counts as dangerous when it's the leading word of a segment.
        assert!(analyze_bash_risk("echo removing rm-like-text").is_none());
    }
}
