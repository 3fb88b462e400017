//! Content chunking: split text into bounded, contiguous pieces.
//!
//! Lengths are counted in Unicode scalar values, not bytes, so a chunk never
//! splits a multi-byte character. Chunks borrow from the source string; no
//! text is copied until a prompt is rendered.

/// Split `text` into contiguous, non-overlapping chunks of at most
/// `max_chars` characters each.
///
/// Concatenating the result reproduces `text` exactly. An empty input yields
/// no chunks.
///
/// # Panics
/// Panics if `max_chars` is zero (rejected earlier by config validation).
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    assert!(max_chars > 0, "chunk size must be positive");

    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

/// The leading chunks submitted to the model, plus how many were dropped.
pub fn select_chunks(text: &str, max_chars: usize, max_chunks: usize) -> (Vec<&str>, usize) {
    let mut chunks = chunk_text(text, max_chars);
    let discarded = chunks.len().saturating_sub(max_chunks);
    chunks.truncate(max_chunks);
    (chunks, discarded)
}

/// Truncate `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
