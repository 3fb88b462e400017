//! Flashcard records and the per-request output types.

use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Difficulty label attached to every flashcard.
///
/// Serialises as `"Easy"`, `"Medium"`, `"Hard"` or `"N/A"`, which is also the
/// text written to the CSV and JSON artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    /// Only used on sentinel records produced when generation failed.
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Difficulty {
    /// Parse a model-supplied label, falling back to [`Difficulty::Medium`].
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace and a
    /// trailing period, so `"hard"`, `" Hard."` and `"HARD"` all parse.
    pub fn parse_lenient(label: &str) -> Self {
        let label = label.trim().trim_end_matches('.').trim().to_ascii_lowercase();
        match label.as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            "n/a" | "na" | "none" => Difficulty::NotApplicable,
            _ => Difficulty::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single study flashcard.
///
/// Field order matches the CSV column order: `question, answer, topic, difficulty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl Flashcard {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        topic: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            topic: topic.into(),
            difficulty,
        }
    }

    /// The record substituted when a JSON-mode chunk cannot produce cards.
    pub fn sentinel(subject: &str, answer: impl Into<String>) -> Self {
        Self::new("Error", answer, subject, Difficulty::NotApplicable)
    }

    /// True for records produced by [`Flashcard::sentinel`].
    pub fn is_sentinel(&self) -> bool {
        self.question == "Error" && self.difficulty == Difficulty::NotApplicable
    }
}

/// Outcome of running one chunk through the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 1-indexed position of the chunk in the processed prefix.
    pub index: usize,
    /// Cards produced for this chunk (never empty unless the model returned `[]`).
    pub cards: Vec<Flashcard>,
    /// Number of model calls made for this chunk.
    pub attempts: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    /// Set when `cards` holds a sentinel or fallback record.
    pub error: Option<ChunkError>,
}

/// Aggregate numbers for a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Characters of extracted content.
    pub content_chars: usize,
    /// Chunks the content was split into.
    pub total_chunks: usize,
    /// Chunks actually sent to the model.
    pub processed_chunks: usize,
    /// Chunks beyond the configured prefix, never sent.
    pub discarded_chunks: usize,
    /// Chunks that fell back to a sentinel or synthesized card.
    pub degraded_chunks: usize,
    /// Cards before deduplication.
    pub cards_generated: usize,
    /// Cards removed as duplicates.
    pub duplicates_removed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Everything a caller needs to render the result of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub subject: String,
    /// Final deduplicated cards, in first-seen order.
    pub cards: Vec<Flashcard>,
    pub chunks: Vec<ChunkResult>,
    pub stats: GenerationStats,
}

/// Paths of the three files written for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifacts {
    pub csv: PathBuf,
    pub json: PathBuf,
    pub txt: PathBuf,
}

impl SavedArtifacts {
    pub fn paths(&self) -> [&PathBuf; 3] {
        [&self.csv, &self.json, &self.txt]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parse_lenient() {
        assert_eq!(Difficulty::parse_lenient("Hard"), Difficulty::Hard);
        assert_eq!(Difficulty::parse_lenient("  easy "), Difficulty::Easy);
        assert_eq!(Difficulty::parse_lenient("MEDIUM."), Difficulty::Medium);
        assert_eq!(Difficulty::parse_lenient("N/A"), Difficulty::NotApplicable);
        assert_eq!(Difficulty::parse_lenient("very hard"), Difficulty::Medium);
        assert_eq!(Difficulty::parse_lenient(""), Difficulty::Medium);
    }

    #[test]
    fn difficulty_serialises_as_label() {
        assert_eq!(
            serde_json::to_string(&Difficulty::NotApplicable).unwrap(),
            "\"N/A\""
        );
        assert_eq!(serde_json::to_string(&Difficulty::Easy).unwrap(), "\"Easy\"");
        let d: Difficulty = serde_json::from_str("\"N/A\"").unwrap();
        assert_eq!(d, Difficulty::NotApplicable);
    }

    #[test]
    fn sentinel_shape() {
        let card = Flashcard::sentinel("Physics", "Model error: timeout");
        assert_eq!(card.question, "Error");
        assert_eq!(card.topic, "Physics");
        assert_eq!(card.difficulty, Difficulty::NotApplicable);
        assert!(card.is_sentinel());
        assert!(!Flashcard::new("Error", "a", "t", Difficulty::Hard).is_sentinel());
    }
}
