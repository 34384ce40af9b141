//! Model routing - classify an invocation as light, standard, or strict so
//! the rule engine can scale its effort to the risk of the call.

use crate::harness::ToolContext;
use crate::sensitive;

/// Effort tier for one tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTier {
    /// Critical-severity rules only.
    Light,
    Standard,
    /// Disabled-rule lists are ignored for this call.
    Strict,
}

const LIGHT_COMMAND_MAX: usize = 50;
const LIGHT_CONTENT_MAX: usize = 200;

/// Route one invocation. Returns `Standard` when routing is disabled.
pub fn route(enabled: bool, context: ToolContext, content: &str) -> RouteTier {
    if !enabled {
        return RouteTier::Standard;
    }

    match context {
        ToolContext::Bash => {
            if !sensitive::scan_command(content).is_empty() {
                RouteTier::Strict
            } else if content.len() < LIGHT_COMMAND_MAX
                && !content.contains('|')
                && !content.contains(';')
            {
                RouteTier::Light
            } else {
                RouteTier::Standard
            }
        }
        ToolContext::FileWrite if content.len() < LIGHT_CONTENT_MAX => RouteTier::Light,
        ToolContext::Mcp => RouteTier::Standard,
        _ => RouteTier::Standard,
    }
}
