//! Text recognition (OCR) service boundary.
//!
//! # Overview
//!
//! [`TextRecognizer`] turns the assembled [`OcrImage`] into a plain text
//! string. Engine internals (model choice, languages, accuracy modes) live
//! behind this trait; the workflow only consumes the final text.
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) returns a
//! pre-configured string, and its `manual` variant holds the call open
//! until a test releases it — the tool for exercising stale-completion
//! handling in the workflow.

use async_trait::async_trait;
use thiserror::Error;

use crate::assemble::OcrImage;

// ---------------------------------------------------------------------------
// RecognizeError
// ---------------------------------------------------------------------------

/// All errors that can arise from the recognition subsystem.
#[derive(Debug, Clone, Error)]
pub enum RecognizeError {
    /// The OCR backend rejected or failed on the supplied image.
    #[error("Text recognition failed: {0}")]
    Recognition(String),
}

// ---------------------------------------------------------------------------
// TextRecognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for OCR engines.
///
/// # Contract
///
/// - Returns the recognized text in reading order, lines joined by spaces
///   or newlines at the implementation's discretion.
/// - An empty (or whitespace-only) string is a successful "nothing
///   readable" result; the workflow treats it like empty detection.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in `image`.
    async fn recognize(&self, image: &OcrImage) -> Result<String, RecognizeError>;
}

// Compile-time assertion: Box<dyn TextRecognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TextRecognizer>) {}
};

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double for the OCR seam.
///
/// `text` / `err` resolve immediately; `manual` parks the call on a
/// `tokio::sync::Notify` until the test calls [`MockRecognizer::release`],
/// letting tests interleave a cancellation between request and completion.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<String, RecognizeError>,
    gate: Option<std::sync::Arc<tokio::sync::Notify>>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockRecognizer {
    /// Create a mock that immediately returns `Ok(text)`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            gate: None,
            calls: Default::default(),
        }
    }

    /// Create a mock that immediately returns `Err(error)`.
    pub fn err(error: RecognizeError) -> Self {
        Self {
            response: Err(error),
            gate: None,
            calls: Default::default(),
        }
    }

    /// Create a mock that holds every call open until [`release`] is
    /// called, then returns `Ok(text)`.
    ///
    /// [`release`]: MockRecognizer::release
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            gate: Some(std::sync::Arc::new(tokio::sync::Notify::new())),
            calls: Default::default(),
        }
    }

    /// Let one parked `recognize` call complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, _image: &OcrImage) -> Result<String, RecognizeError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image() -> OcrImage {
        OcrImage::new(8, 8)
    }

    #[tokio::test]
    async fn mock_text_returns_configured_string() {
        let mock = MockRecognizer::text("HELLO");
        assert_eq!(mock.recognize(&test_image()).await.unwrap(), "HELLO");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let mock = MockRecognizer::err(RecognizeError::Recognition("boom".into()));
        let err = mock.recognize(&test_image()).await.unwrap_err();
        assert!(matches!(err, RecognizeError::Recognition(_)));
    }

    #[tokio::test]
    async fn manual_mock_parks_until_released() {
        let mock = std::sync::Arc::new(MockRecognizer::manual("LATE"));
        let task_mock = mock.clone();
        let task =
            tokio::spawn(async move { task_mock.recognize(&test_image()).await });

        // Not yet released: the call must still be parked.
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        mock.release();
        let text = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("released call should finish")
            .unwrap()
            .unwrap();
        assert_eq!(text, "LATE");
    }

    #[test]
    fn box_dyn_text_recognizer_compiles() {
        // If this test compiles, the trait is object-safe.
        let _recognizer: Box<dyn TextRecognizer> = Box::new(MockRecognizer::text("ok"));
    }
}
