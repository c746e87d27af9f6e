use sven_config::AgentMode;

/// A structured todo item managed by the `todowrite`/`todoread` tools.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    /// One of: "pending", "in_progress", "completed". Unknown values normalize to "pending".
    pub status: String,
    /// One of: "high", "medium", "low". Unknown values normalize to "medium".
    pub priority: String,
}

/// Normalize a status string to one of the three known values, defaulting
/// anything unrecognized to `pending` rather than rejecting the call.
pub fn normalize_status(status: &str) -> String {
    match status {
        "pending" | "in_progress" | "completed" => status.to_string(),
        _ => "pending".to_string(),
    }
}

/// Normalize a priority string the same way, defaulting to `medium`.
pub fn normalize_priority(priority: &str) -> String {
    match priority {
        "high" | "medium" | "low" => priority.to_string(),
        _ => "medium".to_string(),
    }
}

/// Events emitted by tools to communicate state changes back to the agent loop.
/// The agent translates these into `AgentEvent` variants for the UI.
#[derive(Debug)]
pub enum ToolEvent {
    TodoUpdate(Vec<TodoItem>),
    ModeChanged(AgentMode),
}
