//! Request-level entry points.
//!
//! [`generate`] runs the whole pipeline and returns the deduplicated cards in
//! memory; [`generate_to_dir`] additionally writes the CSV/JSON/TXT artifacts.
//! Chunks are sent to the model one at a time, in order, so the card list and
//! the progress events follow the source document.

use crate::config::GenerationConfig;
use crate::error::FlashcardError;
use crate::output::{ChunkResult, GenerationOutput, GenerationStats, SavedArtifacts};
use crate::pipeline::input::{self, FlashcardRequest};
use crate::pipeline::model::{CompletionModel, ProviderModel};
use crate::pipeline::{cards, chunk, dedup, format, persist};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Generate flashcards for a request.
///
/// # Returns
/// `Ok(GenerationOutput)` whenever content could be extracted, even if some
/// chunks fell back to sentinel cards (see `output.stats.degraded_chunks`).
///
/// # Errors
/// Only fatal errors are returned:
/// - missing, unsupported or empty content
/// - unreadable file or PDF
/// - no model backend could be configured
pub async fn generate(
    request: &FlashcardRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, FlashcardError> {
    let total_start = Instant::now();
    let subject = request.effective_subject();
    info!("Starting flashcard generation for '{}'", subject);

    // ── Step 1: Validate and extract ─────────────────────────────────────
    let content = input::resolve_content(request, config.pdfium_lib_path.as_deref()).await?;

    // ── Step 2: Resolve model backend ────────────────────────────────────
    let model = resolve_backend(config).await?;

    // ── Step 3: Chunk ────────────────────────────────────────────────────
    let (selected, discarded) =
        chunk::select_chunks(&content.text, config.chunk_size, config.max_chunks);
    let total_chunks = selected.len() + discarded;
    if discarded > 0 {
        info!(
            "Processing first {} of {} chunks; {} discarded",
            selected.len(),
            total_chunks,
            discarded
        );
    }

    // ── Step 4: Generate per chunk ───────────────────────────────────────
    let card_format = format::format_for(config);
    let processed = selected.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(processed);
    }

    let llm_start = Instant::now();
    let mut chunk_results: Vec<ChunkResult> = Vec::with_capacity(processed);
    for (i, piece) in selected.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(index, processed);
        }

        let result = cards::process_chunk(
            model.as_ref(),
            card_format.as_ref(),
            index,
            piece,
            &subject,
            config,
        )
        .await;

        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_chunk_complete(index, processed, result.cards.len()),
                Some(e) => cb.on_chunk_fallback(index, processed, &e.to_string()),
            }
        }
        chunk_results.push(result);
    }
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 5: Deduplicate ──────────────────────────────────────────────
    let cards_generated: usize = chunk_results.iter().map(|r| r.cards.len()).sum();
    let (final_cards, duplicates_removed) = dedup::deduplicate(
        chunk_results.iter().flat_map(|r| r.cards.iter().cloned()),
        &subject,
        config.dedup,
    );
    if duplicates_removed > 0 {
        debug!("Removed {} duplicate questions", duplicates_removed);
    }

    // ── Step 6: Stats ────────────────────────────────────────────────────
    let degraded = chunk_results.iter().filter(|r| r.error.is_some()).count();
    if degraded == processed && processed > 0 {
        warn!("Every chunk fell back to a placeholder card");
    }

    let stats = GenerationStats {
        content_chars: content.text.chars().count(),
        total_chunks,
        processed_chunks: processed,
        discarded_chunks: discarded,
        degraded_chunks: degraded,
        cards_generated,
        duplicates_removed,
        total_input_tokens: chunk_results.iter().map(|r| r.input_tokens).sum(),
        total_output_tokens: chunk_results.iter().map(|r| r.output_tokens).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        llm_duration_ms,
    };

    info!(
        "Generation complete: {} cards from {}/{} chunks, {}ms total",
        final_cards.len(),
        processed,
        total_chunks,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(processed, final_cards.len());
    }

    Ok(GenerationOutput {
        subject,
        cards: final_cards,
        chunks: chunk_results,
        stats,
    })
}

/// Generate flashcards and write them to `config.output_dir`.
///
/// The subject is checked before any model call, so an unusable subject
/// fails fast instead of after generation.
pub async fn generate_to_dir(
    request: &FlashcardRequest,
    config: &GenerationConfig,
) -> Result<(GenerationOutput, SavedArtifacts), FlashcardError> {
    persist::validate_subject(&request.effective_subject())?;
    let output = generate(request, config).await?;
    let saved = persist::save_flashcards(&output.cards, &output.subject, &config.output_dir).await?;
    Ok((output, saved))
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    request: &FlashcardRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, FlashcardError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FlashcardError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(request, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, FlashcardError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        FlashcardError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the model backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`, model defaulting to
///    [`DEFAULT_MODEL`]); the provider reads its own API key variable.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, otherwise full
///    auto-detection via [`ProviderFactory::from_env`].
pub async fn resolve_backend(
    config: &GenerationConfig,
) -> Result<Arc<dyn CompletionModel>, FlashcardError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(ProviderModel::new(provider)))
}

fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, FlashcardError> {
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    // Prefer OpenAI when its key is present, even if other provider keys are set.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| FlashcardError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
