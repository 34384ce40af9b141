//! Capability gate - maps tools to required capabilities and checks them
//! against the allowed set from configuration.

use crate::config::CapabilityConfig;

/// Capabilities a tool may require.
pub const CAP_FILESYSTEM: &str = "filesystem";
pub const CAP_SHELL: &str = "shell";
pub const CAP_NETWORK: &str = "network";
pub const CAP_MCP: &str = "mcp";

/// Outcome of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityDecision {
    Allowed,
    /// Blocked, naming the missing capabilities (or `unknown` for an
    /// unrecognized tool under fail-closed).
    Denied { missing: Vec<String> },
}

/// Capabilities required by a tool, or `None` for unrecognized tools.
pub fn required_capabilities(tool_name: &str) -> Option<&'static [&'static str]> {
    match tool_name {
        "Write" | "Edit" | "Read" | "Glob" | "Grep" => Some(&[CAP_FILESYSTEM]),
        "Bash" => Some(&[CAP_SHELL, CAP_FILESYSTEM, CAP_NETWORK]),
        "WebFetch" | "WebSearch" => Some(&[CAP_NETWORK]),
        name if name.starts_with("mcp__") || name.starts_with("mcp_") => Some(&[CAP_MCP]),
        _ => None,
    }
}

/// Check a tool against the capability configuration.
pub fn check(tool_name: &str, config: &CapabilityConfig) -> CapabilityDecision {
    if !config.enabled {
        return CapabilityDecision::Allowed;
    }

    match required_capabilities(tool_name) {
        Some(required) => {
            let missing: Vec<String> = required
                .iter()
                .filter(|cap| !config.allowed.contains(**cap))
                .map(|cap| cap.to_string())
                .collect();
            if missing.is_empty() {
                CapabilityDecision::Allowed
            } else {
                CapabilityDecision::Denied { missing }
            }
        }
        None if config.fail_closed => CapabilityDecision::Denied {
            missing: vec!["unknown".to_string()],
        },
        None => CapabilityDecision::Allowed,
    }
}
