//! Post-processing: deterministic cleanup of raw model output before parsing.
//!
//! Even well-prompted models wrap answers in code fences they were told to
//! omit, emit Windows line endings, or sprinkle zero-width characters into
//! text. These rules remove such artefacts without touching content, so the
//! parsers in [`crate::pipeline::format`] only deal with the shape they asked
//! for.
//!
//! ## Rule Order
//!
//! Line endings are normalised before fence stripping so the fence regex only
//! has to match `\n`; invisible characters are removed first because a BOM in
//! front of a fence would otherwise hide it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw model output.
///
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip an outer code fence (` ```json ` or bare ` ``` `)
/// 4. Trim surrounding whitespace
pub fn clean_response(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let s = strip_code_fence(&s);
    s.trim().to_string()
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip outer code fence ───────────────────────────────────────────
//
// Models sometimes put the fence on the same line as the payload
// (```json[{...}]```), so the newlines around the body are optional.

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n?(.*?)\n?```\s*$").unwrap());

fn strip_code_fence(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCE.captures(trimmed) {
        caps[1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// The first sentence of `text`: everything up to and including the first
/// period, after trimming. Returns the whole trimmed text when it has no period.
pub fn first_sentence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.find('.') {
        Some(idx) => &trimmed[..=idx],
        None => trimmed,
    }
}
