use serde::{Deserialize, Serialize};

use crate::config::TrustLevel;

/// Severity of a rule finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warn,
    Info,
}

/// A single rule finding, ordered by descending priority in engine output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Short human rule name, e.g. `no-eval`.
    pub rule_id: String,

    /// Which verification cycle produced it (1, 2, or 4).
    pub cycle: u8,

    /// Sort key; security rules carry 200, the default is 100.
    pub priority: u32,

    pub severity: Severity,

    /// Namespace-qualified stable identifier, e.g. `security.no-eval`.
    pub code: String,

    /// How to fix it, surfaced as a correction hint.
    pub remediation: String,

    /// The user-facing finding text.
    pub message: String,

    /// Set once the budget manager has squeezed the message.
    #[serde(default)]
    pub condensed: bool,
}

impl Violation {
    /// Whether this violation forces a block under the given trust level.
    ///
    /// Info findings are reported but approved, except under strict trust
    /// where they are upgraded to warn.
    pub fn is_blocking(&self, trust: TrustLevel) -> bool {
        match self.severity {
            Severity::Critical | Severity::Warn => true,
            Severity::Info => trust == TrustLevel::Strict,
        }
    }
}

/// Sort violations descending by priority, stable within equal priorities.
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| b.priority.cmp(&a.priority));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn violation(rule_id: &str, priority: u32) -> Violation {
        Violation {
            rule_id: rule_id.to_string(),
            cycle: 1,
            priority,
            severity: Severity::Warn,
            code: format!("quality.{rule_id}"),
            remediation: String::new(),
            message: String::new(),
            condensed: false,
        }
    }

    #[test]
    fn test_sort_is_stable_within_priority() {
        let mut violations = vec![
            violation("a", 100),
            violation("b", 200),
            violation("c", 100),
            violation("d", 200),
        ];
        sort_violations(&mut violations);
        let ids: Vec<&str> = violations.iter().map(|v| v.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_info_blocks_only_under_strict() {
        let mut v = violation("x", 100);
        v.severity = Severity::Info;
        assert!(!v.is_blocking(TrustLevel::Standard));
        assert!(v.is_blocking(TrustLevel::Strict));

        v.severity = Severity::Critical;
        assert!(v.is_blocking(TrustLevel::Minimal));
    }
}
