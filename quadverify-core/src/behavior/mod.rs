//! Behavior tracking - maintain per-session history across short-lived hook
//! processes and detect suspicious cross-call sequences.

mod patterns;
mod state;

pub use patterns::{bigram_similarity, detect, permission_change_target, BehaviorWarning};
pub use state::{
    BehaviorEntry, RuleStats, SessionState, SessionStore, EDIT_HISTORY_CAP, EDIT_SNAPSHOT_CHARS,
    HISTORY_CAP, RETRY_HISTORY_CAP,
};

use chrono::Utc;

/// Build a history entry from a post-tool event.
pub fn entry_from_tool(tool_name: &str, tool_input: &serde_json::Value) -> BehaviorEntry {
    let file_path = tool_input
        .get("file_path")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let command = tool_input
        .get("command")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let url = tool_input
        .get("url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let perm_changed_path = command.as_deref().and_then(permission_change_target);

    BehaviorEntry {
        tool: tool_name.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        file_path,
        command,
        url,
        perm_changed_path,
    }
}

/// Record one tool call into the session state and run every detector.
///
/// The caller owns persistence; this function only mutates the in-memory
/// state so the read-modify-write cycle stays in one place.
pub fn record_and_detect(
    state: &mut SessionState,
    tool_name: &str,
    tool_input: &serde_json::Value,
) -> Vec<BehaviorWarning> {
    let entry = entry_from_tool(tool_name, tool_input);

    match tool_name {
        "Read" => {
            if let Some(path) = &entry.file_path {
                state.files_read.insert(path.clone());
            }
        }
        "Write" | "Edit" => {
            if let Some(path) = &entry.file_path {
                state.files_written.insert(path.clone());
                let content_key = if tool_name == "Edit" { "new_string" } else { "content" };
                if let Some(content) = tool_input.get(content_key).and_then(|v| v.as_str()) {
                    state.push_edit_snapshot(path, content);
                }
            }
        }
        "Bash" => {
            if let Some(command) = &entry.command {
                state.push_retry(command);
            }
        }
        _ => {}
    }

    state.push_entry(entry.clone());
    detect(state, &entry)
}
