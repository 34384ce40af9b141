//! Hook protocol translation - parse stdin events, format stdout envelopes.

mod events;
mod response;

pub use events::{CommonEventData, HookEvent, StopPayload, ToolEventPayload};
pub use response::DecisionEnvelope;

use crate::Result;

/// Pure translator between the host's hook protocol and the engine.
pub struct HookHarness;

impl HookHarness {
    /// Parse the raw hook event from stdin.
    pub fn parse_event(input: &str) -> Result<HookEvent> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Kind of content a tool invocation carries, used for rule dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolContext {
    FileWrite,
    Bash,
    Mcp,
    Web,
    Other,
}

/// Content extracted from a tool invocation for rule scanning.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub file_path: Option<String>,
    pub context: ToolContext,
}

/// Classify a tool name into its scan context.
pub fn tool_context(tool_name: &str) -> ToolContext {
    match tool_name {
        "Write" | "Edit" => ToolContext::FileWrite,
        "Bash" => ToolContext::Bash,
        "WebFetch" | "WebSearch" => ToolContext::Web,
        name if name.starts_with("mcp__") || name.starts_with("mcp_") => ToolContext::Mcp,
        _ => ToolContext::Other,
    }
}

/// Extract scannable content from a tool invocation.
///
/// The extraction map follows the hook protocol: `Write -> content`,
/// `Edit -> new_string`, `Bash -> command`, `WebFetch|WebSearch -> url|query`,
/// and MCP tools concatenate every string-typed input value. Returns `None`
/// when the tool carries nothing worth scanning.
pub fn extract_content(
    tool_name: &str,
    tool_input: &serde_json::Value,
    max_mcp_bytes: usize,
) -> Option<ExtractedContent> {
    let context = tool_context(tool_name);
    let file_path = tool_input
        .get("file_path")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let text = match context {
        ToolContext::FileWrite => {
            let key = if tool_name == "Edit" { "new_string" } else { "content" };
            tool_input.get(key)?.as_str()?.to_string()
        }
        ToolContext::Bash => tool_input.get("command")?.as_str()?.to_string(),
        ToolContext::Web => tool_input
            .get("url")
            .or_else(|| tool_input.get("query"))?
            .as_str()?
            .to_string(),
        ToolContext::Mcp => {
            let mut parts = Vec::new();
            if let Some(map) = tool_input.as_object() {
                for value in map.values() {
                    if let Some(s) = value.as_str() {
                        parts.push(s);
                    }
                }
            }
            if parts.is_empty() {
                return None;
            }
            let mut joined = parts.join("\n");
            if joined.len() > max_mcp_bytes {
                // Truncate on a char boundary so downstream regexes stay valid UTF-8.
                let mut cut = max_mcp_bytes;
                while cut > 0 && !joined.is_char_boundary(cut) {
                    cut -= 1;
                }
                joined.truncate(cut);
            }
            joined
        }
        ToolContext::Other => return None,
    };

    Some(ExtractedContent {
        text,
        file_path,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_extract_write_content() {
        let input = json!({"file_path": "a.py", "content": "def f():\n    pass\n"});
        let extracted = extract_content("Write", &input, 1 << 20).unwrap();
        assert_eq!(extracted.context, ToolContext::FileWrite);
        assert_eq!(extracted.file_path.as_deref(), Some("a.py"));
        assert!(extracted.text.contains("pass"));
    }

    #[test]
    fn test_extract_edit_new_string() {
        let input = json!({"file_path": "a.js", "old_string": "x", "new_string": "eval(x)"});
        let extracted = extract_content("Edit", &input, 1 << 20).unwrap();
        assert_eq!(extracted.text, "eval(x)");
    }

    #[test]
    fn test_extract_bash_command() {
        let input = json!({"command": "ls -la"});
        let extracted = extract_content("Bash", &input, 1 << 20).unwrap();
        assert_eq!(extracted.context, ToolContext::Bash);
        assert_eq!(extracted.text, "ls -la");
    }

    #[test]
    fn test_extract_web_url_or_query() {
        let input = json!({"url": "https://example.com"});
        let extracted = extract_content("WebFetch", &input, 1 << 20).unwrap();
        assert_eq!(extracted.context, ToolContext::Web);
        assert_eq!(extracted.text, "https://example.com");

        let input = json!({"query": "rust atomics"});
        let extracted = extract_content("WebSearch", &input, 1 << 20).unwrap();
        assert_eq!(extracted.text, "rust atomics");
    }

    #[test]
    fn test_extract_mcp_concatenates_strings() {
        let input = json!({"a": "one", "n": 42, "b": "two"});
        let extracted = extract_content("mcp__server__tool", &input, 1 << 20).unwrap();
        assert_eq!(extracted.context, ToolContext::Mcp);
        assert!(extracted.text.contains("one"));
        assert!(extracted.text.contains("two"));
        assert!(!extracted.text.contains("42"));
    }

    #[test]
    fn test_extract_mcp_truncates_oversized_input() {
        let input = json!({"payload": "x".repeat(100)});
        let extracted = extract_content("mcp__big", &input, 10).unwrap();
        assert_eq!(extracted.text.len(), 10);
    }

    #[test]
    fn test_unknown_tool_yields_none() {
        let input = json!({"anything": "goes"});
        assert!(extract_content("Task", &input, 1 << 20).is_none());
    }
}
