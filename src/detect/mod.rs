//! Text detection service boundary.
//!
//! # Overview
//!
//! [`TextDetector`] scans a captured [`Frame`] and reports where text
//! appears as a list of normalized [`Region`]s. Finding nothing is a
//! legitimate outcome, not an error — the workflow announces it and
//! returns to the live preview.
//!
//! [`MockDetector`] (available under `#[cfg(test)]`) returns a
//! pre-configured region list for unit-testing the workflow without a
//! vision backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::Frame;

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// An axis-aligned text region in normalized image coordinates.
///
/// All four fields are fractions of the *orientation-corrected* image, in
/// `[0, 1]`, with the origin at the **top-left** corner and `y` growing
/// downward. `(x, y)` is the region's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Left edge, as a fraction of image width.
    pub x: f32,
    /// Top edge, as a fraction of image height.
    pub y: f32,
    /// Width, as a fraction of image width.
    pub width: f32,
    /// Height, as a fraction of image height.
    pub height: f32,
}

impl Region {
    /// Construct a normalized region from its top-left corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert to absolute pixel coordinates `(x, y, width, height)` on an
    /// image of the given dimensions.
    ///
    /// The result is clamped so the rectangle never extends past the image
    /// edge, and its size is always at least 1×1 pixel.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let iw = image_width as f32;
        let ih = image_height as f32;

        let x = (self.x.clamp(0.0, 1.0) * iw) as u32;
        let y = (self.y.clamp(0.0, 1.0) * ih) as u32;
        let x = x.min(image_width.saturating_sub(1));
        let y = y.min(image_height.saturating_sub(1));

        let w = ((self.width.max(0.0) * iw).ceil() as u32).max(1);
        let h = ((self.height.max(0.0) * ih).ceil() as u32).max(1);
        let w = w.min(image_width - x);
        let h = h.min(image_height - y);

        (x, y, w, h)
    }
}

// ---------------------------------------------------------------------------
// DetectError
// ---------------------------------------------------------------------------

/// All errors that can arise from the detection subsystem.
#[derive(Debug, Clone, Error)]
pub enum DetectError {
    /// The vision backend rejected or failed on the supplied frame.
    #[error("Text detection failed: {0}")]
    Detection(String),
}

// ---------------------------------------------------------------------------
// TextDetector trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for text-region detectors.
///
/// # Contract
///
/// - Returned regions are normalized to `[0, 1]` with a top-left origin,
///   expressed against the orientation-corrected image (see [`Region`]).
/// - An empty `Vec` means the frame contains no readable text; it is a
///   successful result.
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Detect text regions in `frame`.
    async fn detect_regions(&self, frame: &Frame) -> Result<Vec<Region>, DetectError>;
}

// Compile-time assertion: Box<dyn TextDetector> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TextDetector>) {}
};

// ---------------------------------------------------------------------------
// MockDetector  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured region list and counts calls.
#[cfg(test)]
pub struct MockDetector {
    response: Result<Vec<Region>, DetectError>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockDetector {
    /// Create a mock that always returns `Ok(regions)`.
    pub fn regions(regions: Vec<Region>) -> Self {
        Self {
            response: Ok(regions),
            calls: Default::default(),
        }
    }

    /// Create a mock that finds a single centered region.
    pub fn one_region() -> Self {
        Self::regions(vec![Region::new(0.25, 0.25, 0.5, 0.5)])
    }

    /// Create a mock that finds no text at all.
    pub fn empty() -> Self {
        Self::regions(Vec::new())
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: DetectError) -> Self {
        Self {
            response: Err(error),
            calls: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TextDetector for MockDetector {
    async fn detect_regions(&self, _frame: &Frame) -> Result<Vec<Region>, DetectError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureOrientation, Frame};

    fn test_frame() -> Frame {
        Frame::new(image::RgbaImage::new(100, 200), CaptureOrientation::Upright)
    }

    // --- Region::to_pixels ---

    #[test]
    fn to_pixels_maps_full_image() {
        let r = Region::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(r.to_pixels(100, 200), (0, 0, 100, 200));
    }

    #[test]
    fn to_pixels_maps_centered_region() {
        let r = Region::new(0.25, 0.25, 0.5, 0.5);
        assert_eq!(r.to_pixels(100, 200), (25, 50, 50, 100));
    }

    #[test]
    fn to_pixels_clamps_overhanging_region() {
        // Width 0.5 starting at x 0.75 would overhang; it must be clipped
        // to the image edge.
        let r = Region::new(0.75, 0.0, 0.5, 0.5);
        let (x, _, w, _) = r.to_pixels(100, 200);
        assert_eq!(x, 75);
        assert_eq!(w, 25);
    }

    #[test]
    fn to_pixels_never_yields_zero_size() {
        let r = Region::new(0.5, 0.5, 0.0, 0.0);
        let (_, _, w, h) = r.to_pixels(100, 200);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn to_pixels_clamps_out_of_range_origin() {
        let r = Region::new(1.5, -0.5, 0.1, 0.1);
        let (x, y, _, _) = r.to_pixels(100, 200);
        assert_eq!(x, 99);
        assert_eq!(y, 0);
    }

    // --- MockDetector ---

    #[tokio::test]
    async fn mock_empty_is_ok_with_no_regions() {
        let mock = MockDetector::empty();
        let regions = mock.detect_regions(&test_frame()).await.unwrap();
        assert!(regions.is_empty());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let mock = MockDetector::err(DetectError::Detection("boom".into()));
        let err = mock.detect_regions(&test_frame()).await.unwrap_err();
        assert!(matches!(err, DetectError::Detection(_)));
    }

    #[test]
    fn box_dyn_text_detector_compiles() {
        // If this test compiles, the trait is object-safe.
        let _detector: Box<dyn TextDetector> = Box::new(MockDetector::empty());
    }
}
