//! HTTP chat-completions backend for the Cycle-5 verifier.
//!
//! A single POST to the configured endpoint with a hard deadline. Timeout,
//! status, and parse failures all surface as errors; the caller converts
//! them to fail-open outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::backend::InferenceBackend;
use super::types::{InferenceInput, InferenceOutcome, ModelVerdict};
use crate::{Result, VerifierError};

pub const REQUEST_TIMEOUT_SECS: u64 = 10;

const SYSTEM_PROMPT: &str = "\
You are a verification reviewer for an AI coding assistant. Given a user \
request excerpt and the assistant's finalized response excerpt, judge whether \
the response plausibly completes the request. Respond with exactly one JSON \
object: {\"pass\": true|false, \"reasoning\": \"<one sentence>\"}.";

/// Chat-completions backend with a bounded deadline.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    dry_run: bool,
}

impl HttpBackend {
    pub fn new(endpoint: &str, model: &str, api_key: &str, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| VerifierError::Inference(format!("HTTP client init: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            dry_run,
        })
    }

    fn build_user_message(input: &InferenceInput) -> String {
        format!(
            "REQUEST (excerpt):\n{}\n\nRESPONSE (excerpt):\n{}",
            input.request_excerpt, input.response_excerpt
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn verify(&self, input: &InferenceInput) -> Result<InferenceOutcome> {
        if self.dry_run {
            let user_message = Self::build_user_message(input);
            info!(
                "cycle5 dry_run: would send {} chars to {} ({})",
                user_message.len(),
                self.endpoint,
                self.model
            );
            return Ok(InferenceOutcome {
                pass: true,
                skipped: false,
                reasoning: "dry_run: API call skipped".to_string(),
            });
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: Self::build_user_message(input),
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| VerifierError::Inference(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("cycle5 endpoint error: {status} - {body}");
            return Err(VerifierError::Inference(format!("endpoint status {status}")));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| VerifierError::Inference(format!("response parse: {e}")))?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        debug!("cycle5 raw verdict: {content}");

        // Models love to fence their JSON.
        let cleaned = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let verdict: ModelVerdict = serde_json::from_str(cleaned)
            .map_err(|e| VerifierError::Inference(format!("verdict parse: {e}")))?;

        Ok(InferenceOutcome {
            pass: verdict.pass,
            skipped: false,
            reasoning: verdict.reasoning,
        })
    }

    fn name(&self) -> &'static str {
        "http-chat-completions"
    }
}
