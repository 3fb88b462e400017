//! Configuration types for flashcard generation.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. One struct holds every knob so a config
//! can be shared between requests, logged, and diffed between two runs.

use crate::error::FlashcardError;
use crate::pipeline::model::CompletionModel;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Subject used when the caller supplies none.
pub const DEFAULT_SUBJECT: &str = "General";

/// Configuration for a flashcard generation request.
///
/// # Example
/// ```rust
/// use edgequake_flashcards::{GenerationConfig, ResponseFormat};
///
/// let config = GenerationConfig::builder()
///     .chunk_size(1000)
///     .max_chunks(3)
///     .format(ResponseFormat::Lines)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Maximum characters per chunk. Default: 1500.
    pub chunk_size: usize,

    /// Number of leading chunks sent to the model. Default: 2.
    ///
    /// Later chunks are dropped to bound latency and cost per request.
    pub max_chunks: usize,

    /// Hard character cap applied to a chunk when rendering the prompt. Default: 2000.
    pub prompt_chunk_chars: usize,

    /// Prompt/response style. Default: [`ResponseFormat::Json`].
    pub format: ResponseFormat,

    /// Cards requested per chunk in line mode. Default: 5.
    pub cards_per_chunk: usize,

    /// Cards kept per chunk after parsing. Default: 10.
    pub max_cards_per_chunk: usize,

    /// Total model calls allowed per chunk when JSON output is unparseable. Default: 3.
    pub max_attempts: u32,

    /// Decoding knobs forwarded to the model backend.
    pub params: GenerationParams,

    /// Duplicate-question policy. Default: [`DedupPolicy::Exact`].
    pub dedup: DedupPolicy,

    /// Directory receiving the CSV/JSON/TXT artifacts. Default: `output`.
    pub output_dir: PathBuf,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `backend`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed model backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn CompletionModel>>,

    /// Explicit pdfium library location. Falls back to `PDFIUM_LIB_PATH`,
    /// then the system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Receives per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            max_chunks: 2,
            prompt_chunk_chars: 2000,
            format: ResponseFormat::default(),
            cards_per_chunk: 5,
            max_cards_per_chunk: 10,
            max_attempts: 3,
            params: GenerationParams::default(),
            dedup: DedupPolicy::default(),
            output_dir: PathBuf::from("output"),
            model: None,
            provider_name: None,
            backend: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("chunk_size", &self.chunk_size)
            .field("max_chunks", &self.max_chunks)
            .field("prompt_chunk_chars", &self.prompt_chunk_chars)
            .field("format", &self.format)
            .field("cards_per_chunk", &self.cards_per_chunk)
            .field("max_cards_per_chunk", &self.max_cards_per_chunk)
            .field("max_attempts", &self.max_attempts)
            .field("params", &self.params)
            .field("dedup", &self.dedup)
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionModel>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn chunk_size(mut self, chars: usize) -> Self {
        self.config.chunk_size = chars;
        self
    }

    pub fn max_chunks(mut self, n: usize) -> Self {
        self.config.max_chunks = n;
        self
    }

    pub fn prompt_chunk_chars(mut self, chars: usize) -> Self {
        self.config.prompt_chunk_chars = chars;
        self
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn cards_per_chunk(mut self, n: usize) -> Self {
        self.config.cards_per_chunk = n;
        self
    }

    pub fn max_cards_per_chunk(mut self, n: usize) -> Self {
        self.config.max_cards_per_chunk = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn max_input_tokens(mut self, n: usize) -> Self {
        self.config.params.max_input_tokens = n;
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.params.max_output_tokens = n;
        self
    }

    pub fn num_beams(mut self, n: u32) -> Self {
        self.config.params.num_beams = n.max(1);
        self
    }

    /// Switch from beam/greedy decoding to sampling.
    pub fn sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.config.params.sampling = Some(Sampling {
            temperature: temperature.clamp(0.0, 2.0),
            top_p: top_p.clamp(0.0, 1.0),
        });
        self
    }

    pub fn dedup(mut self, policy: DedupPolicy) -> Self {
        self.config.dedup = policy;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionModel>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, FlashcardError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(FlashcardError::InvalidConfig(
                "Chunk size must be ≥ 1".into(),
            ));
        }
        if c.max_chunks == 0 {
            return Err(FlashcardError::InvalidConfig(
                "At least one chunk must be processed".into(),
            ));
        }
        if c.prompt_chunk_chars == 0 {
            return Err(FlashcardError::InvalidConfig(
                "Prompt chunk cap must be ≥ 1".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(FlashcardError::InvalidConfig(
                "Max attempts must be ≥ 1".into(),
            ));
        }
        if c.cards_per_chunk == 0 || c.max_cards_per_chunk == 0 {
            return Err(FlashcardError::InvalidConfig(format!(
                "Card counts must be ≥ 1 (cards_per_chunk={}, max_cards_per_chunk={})",
                c.cards_per_chunk, c.max_cards_per_chunk
            )));
        }
        if c.params.max_output_tokens == 0 || c.params.max_input_tokens == 0 {
            return Err(FlashcardError::InvalidConfig(
                "Token limits must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums & parameter structs ────────────────────────────────────────────

/// Which prompt/response contract is used with the model.
///
/// | Format | Prompt asks for | On failure |
/// |--------|-----------------|------------|
/// | `Json`  | a fenced JSON array of card objects | regenerate, then an `"Error"` sentinel |
/// | `Lines` | `Question:`/`Answer:`/`Difficulty:` blocks | one card synthesized from the chunk |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseFormat {
    #[default]
    Json,
    Lines,
}

/// How questions are compared when removing duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DedupPolicy {
    /// Exact string equality: case-sensitive, no trimming. (default)
    #[default]
    Exact,
    /// Trimmed, whitespace-collapsed, lower-cased comparison.
    Normalized,
}

/// Decoding parameters handed to the model backend on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Approximate prompt budget; prompts are cut at `max_input_tokens * 4` chars.
    pub max_input_tokens: usize,
    /// Maximum tokens the model may generate per call.
    pub max_output_tokens: usize,
    /// Beam width for backends that support beam search.
    pub num_beams: u32,
    /// `Some` switches from greedy/beam decoding to sampling.
    pub sampling: Option<Sampling>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            max_output_tokens: 1500,
            num_beams: 4,
            sampling: None,
        }
    }
}

impl GenerationParams {
    /// Temperature to request from providers that only expose sampling controls.
    pub fn effective_temperature(&self) -> f32 {
        self.sampling.map(|s| s.temperature).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
}
