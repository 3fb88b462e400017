//! Progress-callback trait for per-chunk generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each chunk. Callers can forward them
//! to a terminal progress bar, a log, or a web response without the library
//! knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use edgequake_flashcards::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CardCounter {
//!     cards: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CardCounter {
//!     fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, card_count: usize) {
//!         self.cards.fetch_add(card_count, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{}: {} cards", chunk, total_chunks, card_count);
//!     }
//! }
//!
//! let counter = Arc::new(CardCounter { cards: AtomicUsize::new(0) });
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline as it processes each chunk.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Chunks are processed sequentially, but the trait is
/// `Send + Sync` so a single callback can be shared by concurrent requests.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before the first chunk is sent.
    ///
    /// # Arguments
    /// * `total_chunks` — number of chunks that will be processed
    fn on_generation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the model is invoked for a chunk.
    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        let _ = (chunk, total_chunks);
    }

    /// Called when a chunk produced real flashcards.
    ///
    /// # Arguments
    /// * `chunk`        — 1-indexed chunk number
    /// * `total_chunks` — chunks being processed
    /// * `card_count`   — cards parsed from the model output
    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, card_count: usize) {
        let _ = (chunk, total_chunks, card_count);
    }

    /// Called when a chunk was replaced by a sentinel or synthesized card.
    fn on_chunk_fallback(&self, chunk: usize, total_chunks: usize, reason: &str) {
        let _ = (chunk, total_chunks, reason);
    }

    /// Called once after deduplication.
    ///
    /// # Arguments
    /// * `total_chunks` — chunks processed
    /// * `card_count`   — cards remaining after deduplication
    fn on_generation_complete(&self, total_chunks: usize, card_count: usize) {
        let _ = (total_chunks, card_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        fallbacks: AtomicUsize,
        final_cards: AtomicUsize,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_chunk_start(&self, _chunk: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _chunk: usize, _total: usize, _cards: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_fallback(&self, _chunk: usize, _total: usize, _reason: &str) {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_generation_complete(&self, _total: usize, card_count: usize) {
            self.final_cards.store(card_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_generation_start(2);
        cb.on_chunk_start(1, 2);
        cb.on_chunk_complete(1, 2, 7);
        cb.on_chunk_fallback(2, 2, "model error");
        cb.on_generation_complete(2, 8);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_chunk_start(1, 2);
        tracker.on_chunk_complete(1, 2, 4);
        tracker.on_chunk_start(2, 2);
        tracker.on_chunk_fallback(2, 2, "unparseable");
        tracker.on_generation_complete(2, 5);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.final_cards.load(Ordering::SeqCst), 5);
    }
}
