//! Response formats: how a chunk becomes a prompt, and how the model's reply
//! becomes flashcards.
//!
//! Two interchangeable strategies implement [`CardFormat`]:
//!
//! * [`JsonFormat`] asks for a fenced JSON array and, when the reply cannot be
//!   parsed, wants the chunk regenerated before giving up with an `"Error"`
//!   sentinel.
//! * [`LineFormat`] asks for `Question:` / `Answer:` / `Difficulty:` blocks and
//!   never retries; an unusable reply is replaced by a card synthesized from
//!   the chunk's first sentence.
//!
//! Both parsers are deliberately permissive. A reply that is half right still
//! yields the cards that are complete.

use crate::config::{GenerationConfig, ResponseFormat};
use crate::error::{ChunkError, FormatError};
use crate::output::{Difficulty, Flashcard};
use crate::pipeline::chunk::truncate_chars;
use crate::pipeline::postprocess::{clean_response, first_sentence};
use crate::prompts;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// A prompt/response contract with the model.
pub trait CardFormat: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Render the instruction for one chunk.
    fn render(&self, chunk: &str, subject: &str) -> String;

    /// Parse raw model output into flashcards.
    fn parse(&self, raw: &str, subject: &str) -> Result<Vec<Flashcard>, FormatError>;

    /// Whether an unparseable reply should trigger another model call.
    fn retry_unparseable(&self) -> bool;

    /// The record substituted when the chunk produced no usable cards.
    fn fallback(&self, chunk: &str, subject: &str, error: &ChunkError) -> Flashcard;
}

/// Build the format selected by `config.format`.
pub fn format_for(config: &GenerationConfig) -> Box<dyn CardFormat> {
    match config.format {
        ResponseFormat::Json => Box::new(JsonFormat {
            max_chunk_chars: config.prompt_chunk_chars,
            max_cards: config.max_cards_per_chunk,
        }),
        ResponseFormat::Lines => Box::new(LineFormat {
            max_chunk_chars: config.prompt_chunk_chars,
            cards_per_chunk: config.cards_per_chunk,
            max_cards: config.max_cards_per_chunk,
        }),
    }
}

// ── JSON mode ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsonFormat {
    pub max_chunk_chars: usize,
    pub max_cards: usize,
}

impl CardFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&self, chunk: &str, subject: &str) -> String {
        prompts::json_prompt(truncate_chars(chunk, self.max_chunk_chars), subject)
    }

    fn parse(&self, raw: &str, subject: &str) -> Result<Vec<Flashcard>, FormatError> {
        let value = parse_json_payload(&clean_response(raw))?;

        let items = match value {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            other => {
                return Err(FormatError::InvalidJson(format!(
                    "expected an array of flashcards, got {}",
                    json_kind(&other)
                )))
            }
        };

        let cards: Vec<Flashcard> = items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| card_from_object(obj, subject))
            .take(self.max_cards)
            .collect();

        // Only a literal `[]` counts as "no cards"; records that all lack a
        // question or answer are treated like unparseable output.
        if cards.is_empty() && !items.is_empty() {
            return Err(FormatError::InvalidJson(format!(
                "no usable flashcard records among {} item(s)",
                items.len()
            )));
        }
        Ok(cards)
    }

    fn retry_unparseable(&self) -> bool {
        true
    }

    fn fallback(&self, _chunk: &str, subject: &str, error: &ChunkError) -> Flashcard {
        let answer = match error {
            ChunkError::ModelFailed { detail, .. } => format!("Model error: {detail}"),
            ChunkError::ParseFailed { attempts, .. } => {
                format!("Failed to parse model response after {attempts} attempts")
            }
            ChunkError::NoCards { .. } => "Model response contained no flashcards".to_string(),
        };
        Flashcard::sentinel(subject, answer)
    }
}

static RE_EMBEDDED_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\n(.*?)\n?```").unwrap());

/// Parse the reply as JSON, falling back to a fenced block or the outermost
/// `[...]` span when the model wrapped the payload in prose.
fn parse_json_payload(cleaned: &str) -> Result<Value, FormatError> {
    let direct = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => FormatError::InvalidJson(e.to_string()),
    };

    if let Some(caps) = RE_EMBEDDED_FENCE.captures(cleaned) {
        if let Ok(value) = serde_json::from_str::<Value>(caps[1].trim()) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (cleaned.find('['), cleaned.rfind(']')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(direct)
}

fn card_from_object(obj: &Map<String, Value>, subject: &str) -> Option<Flashcard> {
    let question = field_text(obj, "question")?;
    let answer = field_text(obj, "answer")?;
    let topic = field_text(obj, "topic").unwrap_or_else(|| subject.to_string());
    let difficulty = field_text(obj, "difficulty")
        .map(|d| Difficulty::parse_lenient(&d))
        .unwrap_or_default();
    Some(Flashcard::new(question, answer, topic, difficulty))
}

/// Look up `name` case-insensitively and render scalar values as text.
/// Missing, null, empty and non-scalar values are `None`.
fn field_text(obj: &Map<String, Value>, name: &str) -> Option<String> {
    let value = obj
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v)?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Line mode ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LineFormat {
    pub max_chunk_chars: usize,
    pub cards_per_chunk: usize,
    pub max_cards: usize,
}

static RE_BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Numbering and bullet prefixes models put in front of labels
/// (`1. Question:`, `- Answer:`, `**Difficulty**:`).
static RE_LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]\s*|[-*•]\s+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Question,
    Answer,
    Difficulty,
}

#[derive(Default)]
struct PartialCard {
    question: Option<String>,
    answer: Option<String>,
    difficulty: Option<String>,
}

impl PartialCard {
    fn finish(self, subject: &str) -> Option<Flashcard> {
        let question = self.question.filter(|q| !q.is_empty())?;
        let answer = self.answer.filter(|a| !a.is_empty())?;
        let difficulty = self
            .difficulty
            .map(|d| Difficulty::parse_lenient(&d))
            .unwrap_or_default();
        Some(Flashcard::new(question, answer, subject, difficulty))
    }
}

/// Split a line on its first colon and classify the label.
fn labelled_line(line: &str) -> Option<(Label, String)> {
    let line = RE_LABEL_PREFIX.replace(line.trim(), "");
    let (label, value) = line.split_once(':')?;
    let label = label.trim().trim_matches('*').trim().to_ascii_lowercase();
    let kind = match label.as_str() {
        "question" | "q" => Label::Question,
        "answer" | "a" => Label::Answer,
        "difficulty" | "level" => Label::Difficulty,
        _ => return None,
    };
    let value = value.trim().trim_matches('*').trim().to_string();
    Some((kind, value))
}

impl LineFormat {
    fn parse_block(block: &str, subject: &str, cards: &mut Vec<Flashcard>) {
        let mut current = PartialCard::default();
        for line in block.lines() {
            let Some((label, value)) = labelled_line(line) else {
                continue;
            };
            match label {
                // A second question inside one block starts a new card.
                Label::Question if current.question.is_some() => {
                    let done = std::mem::take(&mut current);
                    cards.extend(done.finish(subject));
                    current.question = Some(value);
                }
                Label::Question => current.question = Some(value),
                Label::Answer => current.answer = Some(value),
                Label::Difficulty => current.difficulty = Some(value),
            }
        }
        cards.extend(current.finish(subject));
    }
}

impl CardFormat for LineFormat {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn render(&self, chunk: &str, subject: &str) -> String {
        prompts::line_prompt(
            truncate_chars(chunk, self.max_chunk_chars),
            subject,
            self.cards_per_chunk,
        )
    }

    fn parse(&self, raw: &str, subject: &str) -> Result<Vec<Flashcard>, FormatError> {
        let cleaned = clean_response(raw);
        let mut cards = Vec::new();
        for block in RE_BLANK_LINE.split(&cleaned) {
            Self::parse_block(block, subject, &mut cards);
        }
        if cards.is_empty() {
            return Err(FormatError::NoCompleteBlocks);
        }
        cards.truncate(self.max_cards);
        Ok(cards)
    }

    fn retry_unparseable(&self) -> bool {
        false
    }

    fn fallback(&self, chunk: &str, subject: &str, _error: &ChunkError) -> Flashcard {
        Flashcard::new(
            format!("What is a key point about {subject}?"),
            first_sentence(chunk),
            subject,
            Difficulty::Medium,
        )
    }
}
