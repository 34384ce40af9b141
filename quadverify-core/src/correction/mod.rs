//! Self-correction tracking - per-file block counters, remediation hints,
//! and the escalation block after repeated failures on the same path.
//!
//! State lives in the session file and never crosses sessions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::engine::decision::Violation;

/// Escalate after this many blocks on the same path.
pub const ESCALATION_THRESHOLD: u32 = 3;

const HISTORY_CAP: usize = 10;

/// One recorded block attempt against a path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionAttempt {
    /// Epoch milliseconds.
    pub ts: i64,
    /// Rule ids of the violations in that block.
    pub violations: Vec<String>,
}

/// Per-file correction state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionState {
    pub attempts: u32,
    pub history: VecDeque<CorrectionAttempt>,
}

impl CorrectionState {
    /// Record one block against this path.
    pub fn record_block(&mut self, violations: &[Violation]) {
        self.attempts += 1;
        self.history.push_back(CorrectionAttempt {
            ts: Utc::now().timestamp_millis(),
            violations: violations.iter().map(|v| v.rule_id.clone()).collect(),
        });
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// Union of rule ids across all recorded attempts, first-seen order.
    pub fn all_rule_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for attempt in &self.history {
            for rule_id in &attempt.violations {
                if !seen.contains(rule_id) {
                    seen.push(rule_id.clone());
                }
            }
        }
        seen
    }

    pub fn should_escalate(&self) -> bool {
        self.attempts >= ESCALATION_THRESHOLD
    }
}

/// Numbered remediation hints appended after the block reason.
pub fn format_hints(violations: &[Violation]) -> String {
    let mut lines = vec!["Remediation:".to_string()];
    for (index, violation) in violations.iter().enumerate() {
        lines.push(format!(
            "{}. [{}] {}",
            index + 1,
            violation.rule_id,
            violation.remediation
        ));
    }
    lines.join("\n")
}

/// The escalation block emitted once a path has been blocked three times.
pub fn escalation_message(path: &str, state: &CorrectionState) -> Option<String> {
    if !state.should_escalate() {
        return None;
    }
    let rule_ids = state.all_rule_ids().join(", ");
    Some(format!(
        "ESCALATION: {path} has been blocked {} times (rules: {rule_ids}). \
         Repeating the same edit is not converging. Step back and take a \
         different approach to this file.",
        state.attempts
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decision::Severity;
    use pretty_assertions::assert_eq;

    fn violation(rule_id: &str) -> Violation {
        Violation {
            rule_id: rule_id.to_string(),
            cycle: 2,
            priority: 200,
            severity: Severity::Critical,
            code: format!("security.{rule_id}"),
            remediation: format!("fix {rule_id}"),
            message: String::new(),
            condensed: false,
        }
    }

    #[test]
    fn test_no_escalation_below_threshold() {
        let mut state = CorrectionState::default();
        state.record_block(&[violation("no-eval")]);
        state.record_block(&[violation("no-eval")]);

        assert_eq!(state.attempts, 2);
        assert!(escalation_message("src/a.py", &state).is_none());
    }

    #[test]
    fn test_escalation_at_third_block() {
        let mut state = CorrectionState::default();
        state.record_block(&[violation("no-eval")]);
        state.record_block(&[violation("no-eval")]);
        state.record_block(&[violation("no-exec")]);

        let message = escalation_message("src/a.py", &state).unwrap();
        assert!(message.contains("blocked 3 times"));
        assert!(message.contains("no-eval, no-exec"));
    }

    #[test]
    fn test_history_is_capped() {
        let mut state = CorrectionState::default();
        for _ in 0..15 {
            state.record_block(&[violation("no-eval")]);
        }
        assert_eq!(state.attempts, 15);
        assert_eq!(state.history.len(), 10);
    }

    #[test]
    fn test_hints_are_numbered() {
        let hints = format_hints(&[violation("no-eval"), violation("no-exec")]);
        assert!(hints.starts_with("Remediation:"));
        assert!(hints.contains("1. [no-eval] fix no-eval"));
        assert!(hints.contains("2. [no-exec] fix no-exec"));
    }
}
