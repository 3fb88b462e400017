//! The completion-model seam.
//!
//! The pipeline only needs "prompt in, text out". [`CompletionModel`] captures
//! that contract so the loaded model is an explicit service handed to the
//! generator, and tests can substitute a scripted double. [`ProviderModel`]
//! implements it on top of any `edgequake_llm` provider.

use crate::config::GenerationParams;
use crate::error::ModelError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use tracing::debug;

/// Approximate characters per token (rough estimate for English text).
pub const CHARS_PER_TOKEN: usize = 4;

/// Text returned by a model call, with token accounting when available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A text-completion model.
///
/// Implementations are shared across requests behind an `Arc` and must be
/// safe to call concurrently, or serialise calls internally.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, ModelError>;
}

/// [`CompletionModel`] backed by an `edgequake_llm` chat provider.
///
/// Hosted chat APIs expose sampling controls but not beam search, so greedy
/// and beam decoding both map to temperature 0. With sampling enabled the
/// configured temperature and top-p are both forwarded.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CompletionModel for ProviderModel {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, ModelError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(params);

        if params.sampling.is_none() && params.num_beams > 1 {
            debug!(
                "num_beams={} not supported by chat providers; using greedy decoding",
                params.num_beams
            );
        }

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::new(e.to_string()))?;

        Ok(Completion {
            text: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }
}

/// Build `CompletionOptions` from the decoding parameters.
fn build_options(params: &GenerationParams) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(params.effective_temperature()),
        top_p: params.sampling.map(|s| s.top_p),
        max_tokens: Some(params.max_output_tokens),
        ..Default::default()
    }
}

/// Cut a prompt to the model's input budget on a char boundary.
///
/// Returns the prompt unchanged when it fits.
pub fn fit_prompt<'a>(prompt: &'a str, params: &GenerationParams) -> &'a str {
    let budget = params.max_input_tokens.saturating_mul(CHARS_PER_TOKEN);
    crate::pipeline::chunk::truncate_chars(prompt, budget)
}
