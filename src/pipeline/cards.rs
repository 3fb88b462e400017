//! Card generation: run one chunk through the model and parse the reply.
//!
//! Prompt wording and reply parsing live in [`crate::pipeline::format`]; this
//! module owns only the call, retry and fallback policy.
//!
//! ## Retry Strategy
//!
//! Only *unparseable* replies are retried, and only for formats that ask for
//! it (JSON mode). A backend error is not retried: it short-circuits straight
//! to the fallback record so a broken provider cannot multiply request latency.
//! Attempts are capped by `GenerationConfig::max_attempts`.

use crate::config::GenerationConfig;
use crate::error::{ChunkError, FormatError};
use crate::output::ChunkResult;
use crate::pipeline::format::CardFormat;
use crate::pipeline::model::{fit_prompt, CompletionModel};
use std::time::Instant;
use tracing::{debug, warn};

/// Generate flashcards for a single chunk.
///
/// ## Return Value
///
/// Always returns a `ChunkResult` with at least one card, except when the
/// model returned a well-formed but empty JSON array. Failures are recorded in
/// `result.error` next to the substituted sentinel or fallback card, never
/// propagated, so one bad chunk doesn't fail the whole request.
pub async fn process_chunk(
    model: &dyn CompletionModel,
    format: &dyn CardFormat,
    index: usize,
    chunk: &str,
    subject: &str,
    config: &GenerationConfig,
) -> ChunkResult {
    let start = Instant::now();
    let rendered = format.render(chunk, subject);
    let prompt = fit_prompt(&rendered, &config.params);
    if prompt.len() < rendered.len() {
        warn!(
            "Chunk {}: prompt cut to {} of {} bytes to fit the input budget",
            index,
            prompt.len(),
            rendered.len()
        );
    }

    let mut input_tokens = 0u64;
    let mut output_tokens = 0u64;
    let mut attempts = 0u32;

    let error = loop {
        attempts += 1;

        let completion = match model.complete(prompt, &config.params).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Chunk {}: model call failed: {}", index, e);
                break ChunkError::ModelFailed {
                    chunk: index,
                    detail: e.to_string(),
                };
            }
        };
        input_tokens += completion.prompt_tokens;
        output_tokens += completion.completion_tokens;

        match format.parse(&completion.text, subject) {
            Ok(cards) => {
                let duration = start.elapsed();
                debug!(
                    "Chunk {}: {} cards ({} format, attempt {}, {:?})",
                    index,
                    cards.len(),
                    format.name(),
                    attempts,
                    duration
                );
                return ChunkResult {
                    index,
                    cards,
                    attempts,
                    input_tokens,
                    output_tokens,
                    duration_ms: duration.as_millis() as u64,
                    error: None,
                };
            }
            Err(e) if format.retry_unparseable() && attempts < config.max_attempts => {
                warn!(
                    "Chunk {}: unparseable reply ({}); retry {}/{}",
                    index,
                    e,
                    attempts,
                    config.max_attempts - 1
                );
            }
            Err(FormatError::NoCompleteBlocks) => break ChunkError::NoCards { chunk: index },
            Err(e) => {
                break ChunkError::ParseFailed {
                    chunk: index,
                    attempts,
                    detail: e.to_string(),
                }
            }
        }
    };

    warn!("Chunk {}: using fallback card ({})", index, error);
    let card = format.fallback(chunk, subject, &error);

    ChunkResult {
        index,
        cards: vec![card],
        attempts,
        input_tokens,
        output_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationParams, ResponseFormat};
    use crate::error::ModelError;
    use crate::output::Difficulty;
    use crate::pipeline::format::format_for;
    use crate::pipeline::model::Completion;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order; `Err` entries simulate backend failures.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionModel for Scripted {
        async fn complete(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<Completion, ModelError> {
            *self.calls.lock().unwrap() += 1;
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(Completion {
                    text,
                    prompt_tokens: 10,
                    completion_tokens: 5,
                }),
                Some(Err(e)) => Err(ModelError::new(e)),
                None => Err(ModelError::new("script exhausted")),
            }
        }
    }

    fn config(format: ResponseFormat) -> GenerationConfig {
        GenerationConfig::builder().format(format).build().unwrap()
    }

    #[tokio::test]
    async fn json_success_first_attempt() {
        let model = Scripted::new(vec![Ok(r#"[{"question":"Q1","answer":"A1"}]"#)]);
        let cfg = config(ResponseFormat::Json);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 1, "text", "Science", &cfg).await;
        assert!(r.error.is_none());
        assert_eq!(r.attempts, 1);
        assert_eq!(r.cards[0].topic, "Science");
        assert_eq!(r.input_tokens, 10);
        assert_eq!(r.output_tokens, 5);
    }

    #[tokio::test]
    async fn json_retries_then_succeeds() {
        let model = Scripted::new(vec![
            Ok("not json"),
            Ok(r#"[{"question":"Q","answer":"A"}]"#),
        ]);
        let cfg = config(ResponseFormat::Json);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 1, "text", "S", &cfg).await;
        assert!(r.error.is_none());
        assert_eq!(r.attempts, 2);
        assert_eq!(r.input_tokens, 20);
    }

    #[tokio::test]
    async fn json_exhausted_retries_yield_single_sentinel() {
        let model = Scripted::new(vec![Ok("{bad"), Ok("{bad"), Ok("{bad"), Ok("[]")]);
        let cfg = config(ResponseFormat::Json);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 2, "text", "History", &cfg).await;
        assert_eq!(model.calls(), 3);
        assert_eq!(r.cards.len(), 1);
        assert_eq!(r.cards[0].question, "Error");
        assert_eq!(r.cards[0].topic, "History");
        assert_eq!(r.cards[0].difficulty, Difficulty::NotApplicable);
        assert!(matches!(
            r.error,
            Some(ChunkError::ParseFailed { chunk: 2, attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn json_records_missing_fields_are_retried_like_bad_json() {
        let reply = r#"[{"q":"What is DNA?","a":"A nucleic acid"}]"#;
        let model = Scripted::new(vec![Ok(reply), Ok(reply), Ok(reply)]);
        let cfg = config(ResponseFormat::Json);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 1, "text", "Biology", &cfg).await;
        assert_eq!(model.calls(), 3);
        assert_eq!(r.cards.len(), 1);
        assert_eq!(r.cards[0].question, "Error");
        assert!(matches!(
            r.error,
            Some(ChunkError::ParseFailed { chunk: 1, attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn model_error_short_circuits_without_retry() {
        let model = Scripted::new(vec![Err("connection refused"), Ok("[]")]);
        let cfg = config(ResponseFormat::Json);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 1, "text", "S", &cfg).await;
        assert_eq!(model.calls(), 1);
        assert_eq!(r.cards[0].answer, "Model error: connection refused");
        assert!(matches!(r.error, Some(ChunkError::ModelFailed { .. })));
    }

    #[tokio::test]
    async fn lines_unparseable_falls_back_without_retry() {
        let model = Scripted::new(vec![Ok("I cannot help with that."), Ok("unused")]);
        let cfg = config(ResponseFormat::Lines);
        let format = format_for(&cfg);
        let r = process_chunk(
            &model,
            format.as_ref(),
            1,
            "Water boils at 100C. It freezes at 0C.",
            "Science",
            &cfg,
        )
        .await;
        assert_eq!(model.calls(), 1);
        assert_eq!(r.cards.len(), 1);
        assert_eq!(r.cards[0].answer, "Water boils at 100C.");
        assert_eq!(r.cards[0].topic, "Science");
        assert_eq!(r.error, Some(ChunkError::NoCards { chunk: 1 }));
    }

    #[tokio::test]
    async fn lines_model_error_falls_back() {
        let model = Scripted::new(vec![Err("boom")]);
        let cfg = config(ResponseFormat::Lines);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 1, "Facts. More.", "S", &cfg).await;
        assert_eq!(r.cards[0].answer, "Facts.");
        assert_eq!(r.cards[0].difficulty, Difficulty::Medium);
    }

    #[tokio::test]
    async fn json_empty_array_is_not_an_error() {
        let model = Scripted::new(vec![Ok("```json\n[]\n```")]);
        let cfg = config(ResponseFormat::Json);
        let format = format_for(&cfg);
        let r = process_chunk(&model, format.as_ref(), 1, "text", "S", &cfg).await;
        assert!(r.cards.is_empty());
        assert!(r.error.is_none());
    }
}
