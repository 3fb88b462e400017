//! # edgequake-flashcards
//!
//! Turn study material (pasted text, `.txt` or `.pdf` files) into
//! question/answer flashcards using an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text / .txt / .pdf
//!  │
//!  ├─ 1. Input    validate the request, read UTF-8 or extract the PDF text layer
//!  ├─ 2. Chunk    split into bounded chunks, keep only the leading few
//!  ├─ 3. Prompt   render a JSON-mode or line-mode instruction per chunk
//!  ├─ 4. Generate call the model, parse, retry or fall back per chunk
//!  ├─ 5. Dedup    drop repeated questions, first occurrence wins
//!  └─ 6. Persist  flashcards_<subject>.{csv,json,txt}
//! ```
//!
//! A chunk that cannot be turned into real cards never fails the request: it
//! contributes a single placeholder card and the reason is recorded in
//! [`ChunkResult::error`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_flashcards::{generate_to_dir, FlashcardRequest, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::default();
//!     let request = FlashcardRequest::from_file("Biology", "cells.pdf");
//!     let (output, saved) = generate_to_dir(&request, &config).await?;
//!     for card in &output.cards {
//!         println!("{} -> {}", card.question, card.answer);
//!     }
//!     eprintln!("wrote {}", saved.csv.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Plugging in a model
//!
//! Anything implementing [`CompletionModel`] can be passed via
//! [`GenerationConfigBuilder::backend`]; [`ProviderModel`] wraps an
//! `edgequake_llm` provider and is what the default resolution chain builds.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `flashcards` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ```toml
//! edgequake-flashcards = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DedupPolicy, GenerationConfig, GenerationConfigBuilder, GenerationParams, ResponseFormat,
    Sampling, DEFAULT_SUBJECT,
};
pub use error::{ChunkError, FlashcardError, FormatError, ModelError};
pub use generate::{generate, generate_sync, generate_to_dir, resolve_backend, DEFAULT_MODEL};
pub use output::{
    ChunkResult, Difficulty, Flashcard, GenerationOutput, GenerationStats, SavedArtifacts,
};
pub use pipeline::format::{CardFormat, JsonFormat, LineFormat};
pub use pipeline::input::{FlashcardRequest, SourceFile};
pub use pipeline::model::{Completion, CompletionModel, ProviderModel};
pub use pipeline::persist::{artifact_path, save_flashcards};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
