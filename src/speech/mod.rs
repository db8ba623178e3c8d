//! Speech synthesis service boundary and utterance queue.
//!
//! # Overview
//!
//! [`SpeechService`] is a one-request/one-ack seam: `speak` resolves with
//! [`UtteranceOutcome::Spoken`] when the utterance finishes naturally, or
//! [`UtteranceOutcome::Canceled`] after a `cancel` call interrupts it.
//! The distinction matters to the workflow — a natural finish advances the
//! pass, a cancellation confirms a cleanup.
//!
//! [`UtteranceQueue`] is the FIFO the workflow machine feeds the service
//! from: at most one utterance in flight, the rest queued, the whole queue
//! discarded on cancellation.
//!
//! [`MockSpeech`] (available under `#[cfg(test)]`) records spoken phrases;
//! its `held` variant stays in flight until canceled, for exercising the
//! cancel sub-flow.

use std::collections::VecDeque;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// UtteranceOutcome / UtteranceId
// ---------------------------------------------------------------------------

/// How an utterance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceOutcome {
    /// The utterance played to its natural end.
    Spoken,
    /// The utterance was interrupted by `cancel`.
    Canceled,
}

/// Identifies one enqueued utterance.
///
/// Ids are unique within a queue's lifetime; the workflow uses them to
/// tell "the reading finished" apart from "some announcement finished".
pub type UtteranceId = u64;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// All errors that can arise from the speech subsystem.
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// The synthesizer backend failed to play the utterance.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
}

// ---------------------------------------------------------------------------
// SpeechService trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the speech synthesizer.
///
/// # Contract
///
/// - At most one `speak` call is in flight at a time; the caller is
///   responsible for queueing (see [`UtteranceQueue`]).
/// - `speak` resolves only when the utterance ends, reporting *how* it
///   ended. A `cancel` with nothing in flight is a no-op.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Speak `text` and resolve when playback ends.
    async fn speak(&self, text: &str) -> Result<UtteranceOutcome, SpeechError>;

    /// Request cancellation of the in-flight utterance, if any.
    async fn cancel(&self);
}

// Compile-time assertion: Box<dyn SpeechService> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechService>) {}
};

// ---------------------------------------------------------------------------
// UtteranceQueue
// ---------------------------------------------------------------------------

/// FIFO of utterances awaiting the synthesizer.
///
/// The queue only stores text and hands out ids; actually speaking (and
/// tracking the in-flight utterance) is the machine's job. `clear`
/// discards everything pending without touching ids already handed out.
#[derive(Debug, Default)]
pub struct UtteranceQueue {
    next_id: UtteranceId,
    pending: VecDeque<(UtteranceId, String)>,
}

impl UtteranceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and return the id assigned to it.
    pub fn enqueue(&mut self, text: impl Into<String>) -> UtteranceId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push_back((id, text.into()));
        id
    }

    /// Remove and return the oldest pending utterance.
    pub fn dequeue(&mut self) -> Option<(UtteranceId, String)> {
        self.pending.pop_front()
    }

    /// Discard all pending utterances.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// MockSpeech  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records every phrase passed to `speak`.
///
/// `instant` resolves `Spoken` immediately; `held` parks each `speak`
/// until `cancel` is called, then resolves `Canceled` — mirroring a long
/// utterance interrupted mid-playback.
#[cfg(test)]
pub struct MockSpeech {
    held: bool,
    gate: std::sync::Arc<tokio::sync::Notify>,
    pub spoken: std::sync::Mutex<Vec<String>>,
    pub cancels: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSpeech {
    /// Every utterance completes immediately with `Spoken`.
    pub fn instant() -> Self {
        Self {
            held: false,
            gate: std::sync::Arc::new(tokio::sync::Notify::new()),
            spoken: Default::default(),
            cancels: Default::default(),
        }
    }

    /// Every utterance stays in flight until `cancel`, then resolves
    /// `Canceled`.
    pub fn held() -> Self {
        Self {
            held: true,
            ..Self::instant()
        }
    }

    /// Phrases passed to `speak`, in order.
    pub fn spoken_phrases(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechService for MockSpeech {
    async fn speak(&self, text: &str) -> Result<UtteranceOutcome, SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.held {
            self.gate.notified().await;
            Ok(UtteranceOutcome::Canceled)
        } else {
            Ok(UtteranceOutcome::Spoken)
        }
    }

    async fn cancel(&self) {
        self.cancels
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.gate.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- UtteranceQueue ---

    #[test]
    fn queue_preserves_fifo_order() {
        let mut q = UtteranceQueue::new();
        let a = q.enqueue("first");
        let b = q.enqueue("second");
        assert_ne!(a, b);

        assert_eq!(q.dequeue(), Some((a, "first".to_string())));
        assert_eq!(q.dequeue(), Some((b, "second".to_string())));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn queue_ids_stay_unique_after_clear() {
        let mut q = UtteranceQueue::new();
        let a = q.enqueue("one");
        q.clear();
        assert!(q.is_empty());

        let b = q.enqueue("two");
        assert_ne!(a, b);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn clear_discards_all_pending() {
        let mut q = UtteranceQueue::new();
        q.enqueue("a");
        q.enqueue("b");
        q.enqueue("c");
        q.clear();
        assert_eq!(q.dequeue(), None);
    }

    // --- MockSpeech ---

    #[tokio::test]
    async fn instant_mock_resolves_spoken() {
        let mock = MockSpeech::instant();
        let outcome = mock.speak("hello").await.unwrap();
        assert_eq!(outcome, UtteranceOutcome::Spoken);
        assert_eq!(mock.spoken_phrases(), vec!["hello"]);
    }

    #[tokio::test]
    async fn held_mock_resolves_canceled_after_cancel() {
        let mock = std::sync::Arc::new(MockSpeech::held());
        let task_mock = mock.clone();
        let task = tokio::spawn(async move { task_mock.speak("long story").await });

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        mock.cancel().await;
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("canceled utterance should resolve")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, UtteranceOutcome::Canceled);
        assert_eq!(mock.cancel_count(), 1);
    }

    #[test]
    fn box_dyn_speech_service_compiles() {
        // If this test compiles, the trait is object-safe.
        let _speech: Box<dyn SpeechService> = Box::new(MockSpeech::instant());
    }
}
