//! Error types for the edgequake-flashcards library.
//!
//! Failures fall into two groups:
//!
//! * [`FlashcardError`] — **Fatal**: the request cannot proceed at all
//!   (no content, unsupported upload, unreadable PDF, output not written).
//!   Returned as `Err(FlashcardError)` from the top-level `generate*` functions.
//!
//! * [`ChunkError`] — **Non-fatal**: a single chunk could not be turned into
//!   real flashcards and a sentinel or fallback card was substituted. Stored
//!   inside [`crate::output::ChunkResult`] so callers can see which chunks
//!   degraded without losing the rest of the request.
//!
//! [`ModelError`] and [`FormatError`] are the internal currency between the
//! model backend, the response parsers and the generator; they are folded
//! into a [`ChunkError`] before they reach the caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-flashcards library.
#[derive(Debug, Error)]
pub enum FlashcardError {
    // ── Input validation ──────────────────────────────────────────────────
    /// Neither pasted text nor a file was supplied.
    #[error("Please provide text or a file.")]
    NoContent,

    /// The uploaded file is not a `.txt` or `.pdf`.
    #[error("Only .txt and .pdf files are supported (got '{file_name}').")]
    UnsupportedFileType { file_name: String },

    /// Extraction succeeded but produced no usable text.
    #[error("No text content found in '{source_name}'.")]
    EmptyContent { source_name: String },

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A `.txt` input is not valid UTF-8.
    #[error("'{source_name}' is not valid UTF-8 text")]
    InvalidUtf8 { source_name: String },

    // ── Extraction ────────────────────────────────────────────────────────
    /// The PDF could not be opened or a page's text layer could not be read.
    #[error("Error reading PDF '{source_name}': {detail}")]
    ExtractionFailed { source_name: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model ─────────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output ────────────────────────────────────────────────────────────
    /// The subject cannot be used as a file-name segment.
    #[error("Subject '{subject}' cannot be used in an output file name")]
    InvalidSubject { subject: String },

    /// A requested download does not exist or is not a plain file name.
    #[error("No generated file named '{file_name}'")]
    ArtifactNotFound { file_name: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialising flashcards to CSV or JSON failed.
    #[error("Failed to encode '{path}': {detail}")]
    OutputEncodeFailed { path: PathBuf, detail: String },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a chunk fell back to a sentinel or synthesized card.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// The model backend returned an error; no retry was attempted.
    #[error("Chunk {chunk}: model call failed: {detail}")]
    ModelFailed { chunk: usize, detail: String },

    /// Every attempt produced output that could not be parsed.
    #[error("Chunk {chunk}: response unparseable after {attempts} attempts: {detail}")]
    ParseFailed {
        chunk: usize,
        attempts: u32,
        detail: String,
    },

    /// The response parsed but contained no complete card.
    #[error("Chunk {chunk}: no complete flashcards in model output")]
    NoCards { chunk: usize },
}

/// Failure reported by a [`crate::pipeline::model::CompletionModel`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

impl ModelError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Failure to interpret raw model output in the selected response format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The output is not the JSON shape the prompt asked for.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The output contained no block with both a question and an answer.
    #[error("no complete question/answer blocks")]
    NoCompleteBlocks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            FlashcardError::NoContent.to_string(),
            "Please provide text or a file."
        );
        let e = FlashcardError::UnsupportedFileType {
            file_name: "notes.docx".into(),
        };
        assert!(e.to_string().contains("notes.docx"));
        assert!(e.to_string().contains(".txt and .pdf"));
    }

    #[test]
    fn extraction_failure_display() {
        let e = FlashcardError::ExtractionFailed {
            source_name: "scan.pdf".into(),
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.pdf"), "got: {msg}");
        assert!(msg.contains("bad xref"), "got: {msg}");
    }

    #[test]
    fn chunk_error_display() {
        let e = ChunkError::ParseFailed {
            chunk: 2,
            attempts: 3,
            detail: "invalid JSON: eof".into(),
        };
        assert!(e.to_string().contains("Chunk 2"));
        assert!(e.to_string().contains("3 attempts"));
    }

    #[test]
    fn chunk_error_serialises() {
        let e = ChunkError::NoCards { chunk: 1 };
        let json = serde_json::to_string(&e).unwrap();
        let back: ChunkError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn model_error_is_transparent() {
        assert_eq!(ModelError::new("quota exceeded").to_string(), "quota exceeded");
    }
}
