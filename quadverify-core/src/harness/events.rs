use serde::{Deserialize, Serialize};

/// Common fields present in every hook event.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommonEventData {
    /// Session identifier, stable across the three hook points of one agent run.
    #[serde(default)]
    pub session_id: Option<String>,

    /// Working directory when the hook was invoked.
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Payload for pre-tool and post-tool hook events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEventPayload {
    #[serde(flatten)]
    pub common: CommonEventData,

    /// Name of the tool being called.
    pub tool_name: String,

    /// Input parameters for the tool.
    #[serde(default)]
    pub tool_input: serde_json::Value,

    /// Tool result, present on post-tool events for tools that return content.
    #[serde(default)]
    pub tool_response: Option<serde_json::Value>,
}

/// Payload for the stop (pre-finalize) hook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopPayload {
    #[serde(flatten)]
    pub common: CommonEventData,

    /// The finalized response text, when the host supplies it.
    #[serde(default)]
    pub response: Option<String>,

    /// The original request text, when the host supplies it.
    #[serde(default)]
    pub request: Option<String>,
}

/// All hook events the verifier handles, tagged by hook point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hook_point")]
pub enum HookEvent {
    /// Before tool execution - may block.
    #[serde(rename = "pre-tool")]
    PreTool(ToolEventPayload),

    /// After tool execution - observe only.
    #[serde(rename = "post-tool")]
    PostTool(ToolEventPayload),

    /// Before the agent finalizes its response - may inject a prompt.
    #[serde(rename = "stop")]
    Stop(StopPayload),
}

impl HookEvent {
    /// Get the common event data.
    pub fn common(&self) -> &CommonEventData {
        match self {
            HookEvent::PreTool(payload) => &payload.common,
            HookEvent::PostTool(payload) => &payload.common,
            HookEvent::Stop(payload) => &payload.common,
        }
    }

    /// Tool name for tool-related events.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            HookEvent::PreTool(payload) => Some(&payload.tool_name),
            HookEvent::PostTool(payload) => Some(&payload.tool_name),
            HookEvent::Stop(_) => None,
        }
    }

    /// The hook point name as used in audit entries.
    pub fn hook_point(&self) -> &'static str {
        match self {
            HookEvent::PreTool(_) => "preTool",
            HookEvent::PostTool(_) => "postTool",
            HookEvent::Stop(_) => "stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pre_tool_deserialization() {
        let json = r#"
        {
            "hook_point": "pre-tool",
            "session_id": "sess-1",
            "cwd": "/home/user/project",
            "tool_name": "Bash",
            "tool_input": {"command": "echo hello"}
        }
        "#;

        let event: HookEvent = serde_json::from_str(json).unwrap();
        match &event {
            HookEvent::PreTool(payload) => {
                assert_eq!(payload.common.session_id.as_deref(), Some("sess-1"));
                assert_eq!(payload.tool_name, "Bash");
                assert_eq!(payload.tool_input["command"], "echo hello");
            }
            _ => panic!("wrong event type"),
        }
        assert_eq!(event.hook_point(), "preTool");
        assert_eq!(event.tool_name(), Some("Bash"));
    }

    #[test]
    fn test_stop_deserialization_without_tool() {
        let json = r#"
        {
            "hook_point": "stop",
            "session_id": "sess-1",
            "cwd": "/home/user/project",
            "response": "done"
        }
        "#;

        let event: HookEvent = serde_json::from_str(json).unwrap();
        match &event {
            HookEvent::Stop(payload) => {
                assert_eq!(payload.response.as_deref(), Some("done"));
            }
            _ => panic!("wrong event type"),
        }
        assert_eq!(event.tool_name(), None);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"hook_point": "post-tool", "tool_name": "Read"}"#;
        let event: HookEvent = serde_json::from_str(json).unwrap();
        match event {
            HookEvent::PostTool(payload) => {
                assert!(payload.common.session_id.is_none());
                assert!(payload.tool_response.is_none());
            }
            _ => panic!("wrong event type"),
        }
    }
}
