use serde_json::{json, Value};

/// The decision emitted on stdout at the end of a hook invocation.
///
/// Per the hook contract, post-tool invocations emit nothing, stop emits a
/// prompt object when there is something to inject, and pre-tool emits either
/// an approve or a block envelope. Exit code is always 0 regardless.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionEnvelope {
    /// Pre-tool: let the call proceed.
    Approve,

    /// Pre-tool: stop the call, with the formatted violation bundle as reason.
    Block { reason: String },

    /// Stop: inject the composed prompt.
    Prompt { prompt: String },

    /// Post-tool (and stop with nothing to say): no stdout output.
    Empty,
}

impl DecisionEnvelope {
    /// Render the envelope as the stdout JSON body, or `None` for empty output.
    pub fn to_stdout(&self) -> Option<Value> {
        match self {
            DecisionEnvelope::Approve => Some(json!({"decision": "approve"})),
            DecisionEnvelope::Block { reason } => {
                Some(json!({"decision": "block", "reason": reason}))
            }
            DecisionEnvelope::Prompt { prompt } => Some(json!({"prompt": prompt})),
            DecisionEnvelope::Empty => None,
        }
    }

    /// The decision label recorded in audit entries.
    pub fn audit_decision(&self) -> &'static str {
        match self {
            DecisionEnvelope::Approve => "approve",
            DecisionEnvelope::Block { .. } => "block",
            DecisionEnvelope::Prompt { .. } | DecisionEnvelope::Empty => "logOnly",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, DecisionEnvelope::Block { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_approve_envelope() {
        let envelope = DecisionEnvelope::Approve;
        assert_eq!(
            envelope.to_stdout().unwrap(),
            json!({"decision": "approve"})
        );
        assert_eq!(envelope.audit_decision(), "approve");
    }

    #[test]
    fn test_block_envelope_carries_reason() {
        let envelope = DecisionEnvelope::Block {
            reason: "nope".to_string(),
        };
        let body = envelope.to_stdout().unwrap();
        assert_eq!(body["decision"], "block");
        assert_eq!(body["reason"], "nope");
        assert!(envelope.is_block());
    }

    #[test]
    fn test_empty_envelope_emits_nothing() {
        assert_eq!(DecisionEnvelope::Empty.to_stdout(), None);
    }
}
