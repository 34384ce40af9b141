use serde::{Deserialize, Serialize};

/// Input to the Cycle-5 second-opinion evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceInput {
    /// First 500 characters of the original request.
    pub request_excerpt: String,

    /// First 2000 characters of the finalized response.
    pub response_excerpt: String,
}

const REQUEST_EXCERPT_CHARS: usize = 500;
const RESPONSE_EXCERPT_CHARS: usize = 2000;

impl InferenceInput {
    pub fn from_texts(request: &str, response: &str) -> Self {
        Self {
            request_excerpt: request.chars().take(REQUEST_EXCERPT_CHARS).collect(),
            response_excerpt: response.chars().take(RESPONSE_EXCERPT_CHARS).collect(),
        }
    }
}

/// Outcome of the Cycle-5 evaluation. Never produces a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceOutcome {
    /// Whether the second opinion considers the response adequate.
    pub pass: bool,

    /// True only when the verifier never ran (disabled or below threshold).
    pub skipped: bool,

    /// Explanation, or the fail-open cause.
    pub reasoning: String,
}

impl InferenceOutcome {
    /// The verifier ran into an error; pass with the cause recorded.
    pub fn fail_open(cause: &str) -> Self {
        Self {
            pass: true,
            skipped: false,
            reasoning: format!("fail-open: {cause}"),
        }
    }

    /// The verifier never ran.
    pub fn skipped(reason: &str) -> Self {
        Self {
            pass: true,
            skipped: true,
            reasoning: reason.to_string(),
        }
    }
}

/// The JSON document the model is asked to return.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelVerdict {
    pub pass: bool,
    #[serde(default)]
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_excerpts_are_truncated() {
        let input = InferenceInput::from_texts(&"r".repeat(900), &"s".repeat(5000));
        assert_eq!(input.request_excerpt.chars().count(), 500);
        assert_eq!(input.response_excerpt.chars().count(), 2000);
    }

    #[test]
    fn test_fail_open_names_cause() {
        let outcome = InferenceOutcome::fail_open("connect timeout");
        assert!(outcome.pass);
        assert!(!outcome.skipped);
        assert_eq!(outcome.reasoning, "fail-open: connect timeout");
    }

    #[test]
    fn test_skipped_passes() {
        let outcome = InferenceOutcome::skipped("cycle5 disabled");
        assert!(outcome.pass);
        assert!(outcome.skipped);
    }
}
