//! Merge chunk results into the final card list.
//!
//! Cards arrive in chunk order; the first card with a given question wins and
//! later duplicates are dropped, so the output keeps cross-chunk arrival order.
//! Every surviving card has a non-empty question and topic.

use crate::config::DedupPolicy;
use crate::output::Flashcard;
use std::borrow::Cow;
use std::collections::HashSet;

/// Remove duplicate questions and fill in missing fields.
///
/// Returns the surviving cards and the number of duplicates removed. Cards
/// with an empty question are discarded outright and not counted as
/// duplicates.
pub fn deduplicate(
    cards: impl IntoIterator<Item = Flashcard>,
    subject: &str,
    policy: DedupPolicy,
) -> (Vec<Flashcard>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();
    let mut duplicates = 0;

    for mut card in cards {
        if card.question.trim().is_empty() {
            continue;
        }
        if !seen.insert(dedup_key(&card.question, policy).into_owned()) {
            duplicates += 1;
            continue;
        }
        if card.topic.trim().is_empty() {
            card.topic = subject.to_string();
        }
        unique.push(card);
    }

    (unique, duplicates)
}

fn dedup_key(question: &str, policy: DedupPolicy) -> Cow<'_, str> {
    match policy {
        DedupPolicy::Exact => Cow::Borrowed(question),
        DedupPolicy::Normalized => Cow::Owned(
            question
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        ),
    }
}
