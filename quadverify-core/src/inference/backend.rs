use async_trait::async_trait;

use super::types::{InferenceInput, InferenceOutcome};
use crate::Result;

/// A backend capable of scoring a finalized response.
///
/// The trait seam exists so tests can substitute a canned backend and so the
/// endpoint flavor can change without touching the verifier.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn verify(&self, input: &InferenceInput) -> Result<InferenceOutcome>;

    fn name(&self) -> &'static str;
}
