//! Camera capture service boundary.
//!
//! # Overview
//!
//! [`CaptureService`] is the interface the workflow machine drives the
//! camera through. It is object-safe and `Send + Sync` so it can be held
//! behind an `Arc<dyn CaptureService>` and called from spawned tasks.
//!
//! [`Frame`] is the payload a successful capture produces: raw RGBA pixels
//! plus the [`CaptureOrientation`] they were taken under.
//!
//! [`MockCapture`] (available under `#[cfg(test)]`) records calls and
//! returns pre-configured frames — useful for unit-testing the workflow
//! without camera hardware.

pub mod frame;

pub use frame::{CaptureOrientation, Frame};

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// All errors that can arise from the capture subsystem.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// No usable camera device is present.
    #[error("No camera device available")]
    NoCamera,

    /// The live preview session could not be started or stopped.
    #[error("Preview session error: {0}")]
    Preview(String),

    /// Snapping a still frame failed.
    #[error("Frame capture failed: {0}")]
    Capture(String),
}

// ---------------------------------------------------------------------------
// CaptureService trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the camera.
///
/// # Contract
///
/// - `start_preview` on an already-running preview is a no-op and returns
///   `Ok(())`; likewise `stop_preview` on a stopped one. The machine
///   relies on this to keep its cleanup path idempotent.
/// - `capture_frame` snaps one still from the running preview and stamps
///   it with the device orientation *at that instant*.
/// - `capture_frame` without a running preview returns
///   [`CaptureError::Capture`].
#[async_trait]
pub trait CaptureService: Send + Sync {
    /// Start (or keep running) the live camera preview.
    async fn start_preview(&self) -> Result<(), CaptureError>;

    /// Stop the live camera preview if it is running.
    async fn stop_preview(&self) -> Result<(), CaptureError>;

    /// Snap a single still frame from the running preview.
    async fn capture_frame(&self) -> Result<Frame, CaptureError>;
}

// Compile-time assertion: Box<dyn CaptureService> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CaptureService>) {}
};

// ---------------------------------------------------------------------------
// MockCapture  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured frame and records how many
/// times each method was called.
#[cfg(test)]
pub struct MockCapture {
    response: Result<Frame, CaptureError>,
    pub starts: std::sync::atomic::AtomicUsize,
    pub stops: std::sync::atomic::AtomicUsize,
    pub captures: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockCapture {
    /// Create a mock whose `capture_frame` always returns `Ok(frame)`.
    pub fn ok(frame: Frame) -> Self {
        Self {
            response: Ok(frame),
            starts: Default::default(),
            stops: Default::default(),
            captures: Default::default(),
        }
    }

    /// Create a mock with a 4×4 upright test frame.
    pub fn upright() -> Self {
        Self::ok(Frame::new(
            image::RgbaImage::new(4, 4),
            CaptureOrientation::Upright,
        ))
    }

    /// Create a mock whose `capture_frame` always returns `Err(error)`.
    pub fn err(error: CaptureError) -> Self {
        Self {
            response: Err(error),
            starts: Default::default(),
            stops: Default::default(),
            captures: Default::default(),
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl CaptureService for MockCapture {
    async fn start_preview(&self) -> Result<(), CaptureError> {
        self.starts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn stop_preview(&self) -> Result<(), CaptureError> {
        self.stops.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Frame, CaptureError> {
        self.captures
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_ok_returns_configured_frame() {
        let mock = MockCapture::upright();
        let frame = mock.capture_frame().await.unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(mock.capture_count(), 1);
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let mock = MockCapture::err(CaptureError::NoCamera);
        let err = mock.capture_frame().await.unwrap_err();
        assert!(matches!(err, CaptureError::NoCamera));
    }

    #[tokio::test]
    async fn mock_records_preview_calls() {
        let mock = MockCapture::upright();
        mock.start_preview().await.unwrap();
        mock.start_preview().await.unwrap();
        mock.stop_preview().await.unwrap();
        assert_eq!(mock.start_count(), 2);
        assert_eq!(mock.stop_count(), 1);
    }

    #[test]
    fn capture_error_display_no_camera() {
        let e = CaptureError::NoCamera;
        assert!(e.to_string().contains("camera"));
    }

    #[test]
    fn box_dyn_capture_service_compiles() {
        // If this test compiles, the trait is object-safe.
        let _service: Box<dyn CaptureService> = Box::new(MockCapture::upright());
    }
}
