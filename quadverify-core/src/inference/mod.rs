//! Cycle-5 inference verification - an optional second-opinion LLM scoring
//! the finalized response.
//!
//! Strictly opt-in and strictly fail-open: the system's correctness never
//! depends on this module. Network, status, and parse failures all reduce to
//! a passing outcome naming the cause.

mod backend;
mod http;
mod types;

pub use backend::InferenceBackend;
pub use http::{HttpBackend, REQUEST_TIMEOUT_SECS};
pub use types::{InferenceInput, InferenceOutcome};

use tracing::{debug, warn};

use crate::budget::estimate_tokens;
use crate::config::{Cycle5Config, ResolvedConfig};

/// Orchestrates the optional second-opinion evaluation.
pub struct InferenceVerifier {
    config: Cycle5Config,
    backend: Option<Box<dyn InferenceBackend>>,
}

impl InferenceVerifier {
    /// Build from resolved configuration. A missing API key downgrades the
    /// verifier to disabled with a warning rather than failing the hook.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let cycle5 = config.cycle5.clone();
        if !cycle5.enabled {
            return Self {
                config: cycle5,
                backend: None,
            };
        }

        let Some(api_key) = config.cycle5_api_key() else {
            warn!("cycle5 enabled but no API key configured; disabling");
            return Self {
                config: cycle5,
                backend: None,
            };
        };

        let backend = match HttpBackend::new(&cycle5.endpoint, &cycle5.model, &api_key, cycle5.dry_run)
        {
            Ok(backend) => Some(Box::new(backend) as Box<dyn InferenceBackend>),
            Err(e) => {
                warn!("cycle5 backend init failed: {e}");
                None
            }
        };

        Self {
            config: cycle5,
            backend,
        }
    }

    /// Test seam: inject a backend directly.
    pub fn with_backend(config: Cycle5Config, backend: Box<dyn InferenceBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.backend.is_some()
    }

    /// Score the finalized response. Never blocks, never errors.
    pub async fn evaluate(&self, request: &str, response: &str) -> InferenceOutcome {
        let Some(backend) = &self.backend else {
            return InferenceOutcome::skipped("cycle5 disabled");
        };

        if estimate_tokens(response) < self.config.min_response_tokens {
            debug!("response below minResponseTokens, skipping cycle5");
            return InferenceOutcome::skipped("response below minResponseTokens");
        }

        let input = InferenceInput::from_texts(request, response);
        match backend.verify(&input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("cycle5 evaluation failed: {e}");
                InferenceOutcome::fail_open(&e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct CannedBackend {
        outcome: std::result::Result<InferenceOutcome, String>,
    }

    #[async_trait]
    impl InferenceBackend for CannedBackend {
        async fn verify(&self, _input: &InferenceInput) -> crate::Result<InferenceOutcome> {
            self.outcome
                .clone()
                .map_err(crate::VerifierError::Inference)
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn enabled_config() -> Cycle5Config {
        Cycle5Config {
            enabled: true,
            min_response_tokens: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_verifier_skips() {
        let verifier = InferenceVerifier::from_config(&ResolvedConfig::default());
        assert!(!verifier.is_enabled());
        let outcome = verifier.evaluate("request", &"r".repeat(200)).await;
        assert!(outcome.skipped);
        assert!(outcome.pass);
    }

    #[tokio::test]
    async fn test_short_response_skips() {
        let verifier = InferenceVerifier::with_backend(
            enabled_config(),
            Box::new(CannedBackend {
                outcome: Ok(InferenceOutcome {
                    pass: false,
                    skipped: false,
                    reasoning: "should not run".to_string(),
                }),
            }),
        );
        let outcome = verifier.evaluate("request", "tiny").await;
        assert!(outcome.skipped);
        assert!(outcome.pass);
    }

    #[tokio::test]
    async fn test_backend_verdict_passes_through() {
        let verifier = InferenceVerifier::with_backend(
            enabled_config(),
            Box::new(CannedBackend {
                outcome: Ok(InferenceOutcome {
                    pass: false,
                    skipped: false,
                    reasoning: "incomplete work".to_string(),
                }),
            }),
        );
        let outcome = verifier.evaluate("request", &"r".repeat(200)).await;
        assert!(!outcome.pass);
        assert_eq!(outcome.reasoning, "incomplete work");
    }

    #[tokio::test]
    async fn test_backend_error_fails_open() {
        let verifier = InferenceVerifier::with_backend(
            enabled_config(),
            Box::new(CannedBackend {
                outcome: Err("socket reset".to_string()),
            }),
        );
        let outcome = verifier.evaluate("request", &"r".repeat(200)).await;
        assert!(outcome.pass);
        assert!(!outcome.skipped);
        assert!(outcome.reasoning.starts_with("fail-open:"));
        assert!(outcome.reasoning.contains("socket reset"));
    }
}
