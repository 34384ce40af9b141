//! Prompt budget management - cap the tokens the verifier injects into the
//! agent's context across one session.
//!
//! Token counts use a deterministic `ceil(bytes / 4)` heuristic; precision is
//! not the point, bounded growth is. When the session total passes the
//! configured ceiling, pending violation messages are condensed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::decision::Violation;

/// Message length ceiling applied when condensing.
const CONDENSED_MAX_CHARS: usize = 80;

/// Where injected text came from, for per-source accounting.
pub mod source {
    pub const BLOCK_MESSAGE: &str = "block-message";
    pub const STOP_PROMPT: &str = "stop-prompt";
    pub const BEHAVIORAL_WARNING: &str = "behavioral-warning";
    pub const CORRECTION_HINT: &str = "correction-hint";
}

/// Deterministic token estimate for a piece of injected text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceUsage {
    pub tokens: usize,
    pub count: usize,
}

/// Per-session budget counters, persisted inside the session state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetState {
    pub total_tokens: usize,
    pub sources: HashMap<String, SourceUsage>,
}

impl BudgetState {
    /// Record an injection and return its token estimate.
    pub fn record(&mut self, source_tag: &str, text: &str) -> usize {
        let tokens = estimate_tokens(text);
        self.total_tokens += tokens;
        let usage = self.sources.entry(source_tag.to_string()).or_default();
        usage.tokens += tokens;
        usage.count += 1;
        tokens
    }

    pub fn is_over(&self, max_tokens: usize) -> bool {
        self.total_tokens > max_tokens
    }
}

/// Condense violation messages when the session is over budget.
///
/// Messages longer than 80 characters are truncated with an ellipsis; shorter
/// ones pass through unchanged. Every message touched by a condensation pass
/// carries `condensed = true`.
pub fn condense_if_over_budget(
    violations: &mut [Violation],
    budget: &BudgetState,
    max_tokens: usize,
) {
    if !budget.is_over(max_tokens) {
        return;
    }

    for violation in violations.iter_mut() {
        if violation.message.chars().count() > CONDENSED_MAX_CHARS {
            let truncated: String = violation
                .message
                .chars()
                .take(CONDENSED_MAX_CHARS - 3)
                .collect();
            violation.message = format!("{truncated}...");
        }
        violation.condensed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decision::Severity;
    use pretty_assertions::assert_eq;

    fn violation(message: &str) -> Violation {
        Violation {
            rule_id: "test-rule".to_string(),
            cycle: 1,
            priority: 100,
            severity: Severity::Warn,
            code: "quality.test".to_string(),
            remediation: String::new(),
            message: message.to_string(),
            condensed: false,
        }
    }

    #[test]
    fn test_token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_record_accumulates_per_source() {
        let mut budget = BudgetState::default();
        budget.record(source::BLOCK_MESSAGE, "12345678"); // 2 tokens
        budget.record(source::BLOCK_MESSAGE, "1234"); // 1 token
        budget.record(source::STOP_PROMPT, "12345678"); // 2 tokens

        assert_eq!(budget.total_tokens, 5);
        assert_eq!(budget.sources[source::BLOCK_MESSAGE].count, 2);
        assert_eq!(budget.sources[source::BLOCK_MESSAGE].tokens, 3);
        assert_eq!(budget.sources[source::STOP_PROMPT].count, 1);
    }

    #[test]
    fn test_under_budget_leaves_messages_alone() {
        let mut violations = vec![violation(&"m".repeat(120))];
        let budget = BudgetState::default();
        condense_if_over_budget(&mut violations, &budget, 500);
        assert_eq!(violations[0].message.len(), 120);
        assert!(!violations[0].condensed);
    }

    #[test]
    fn test_over_budget_condenses_long_messages() {
        let mut violations = vec![violation(&"m".repeat(120)), violation("short")];
        let mut budget = BudgetState::default();
        budget.record(source::BLOCK_MESSAGE, &"x".repeat(2004)); // 501 tokens

        condense_if_over_budget(&mut violations, &budget, 500);

        assert!(violations[0].message.chars().count() <= 80);
        assert!(violations[0].message.ends_with("..."));
        assert!(violations[0].condensed);
        // Short messages pass through but are still marked.
        assert_eq!(violations[1].message, "short");
        assert!(violations[1].condensed);
    }
}
