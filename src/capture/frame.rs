//! Captured frame payload and device orientation.

use image::RgbaImage;

// ---------------------------------------------------------------------------
// CaptureOrientation
// ---------------------------------------------------------------------------

/// Physical device orientation at the instant a frame was captured.
///
/// The camera sensor always delivers pixels in its native landscape layout,
/// so the orientation must travel with the frame for the assembler to
/// produce an upright image. The orientation is sampled once, at capture
/// time; rotating the device afterwards does not affect a frame already
/// in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOrientation {
    /// Device held upright; pixels need no correction.
    Upright,
    /// Device rotated 90° counter-clockwise from upright.
    RotatedLeft,
    /// Device rotated 90° clockwise from upright.
    RotatedRight,
    /// Device held upside down.
    UpsideDown,
}

impl Default for CaptureOrientation {
    fn default() -> Self {
        Self::Upright
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A single still frame snapped from the live camera preview.
///
/// Owns the raw RGBA pixels plus the [`CaptureOrientation`] they were taken
/// under. Frames are immutable once captured and are shared across stages
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixels as delivered by the sensor (not orientation-corrected).
    pub image: RgbaImage,
    /// Device orientation at the moment of capture.
    pub orientation: CaptureOrientation,
}

impl Frame {
    /// Wrap raw sensor pixels with the orientation they were captured under.
    pub fn new(image: RgbaImage, orientation: CaptureOrientation) -> Self {
        Self { image, orientation }
    }

    /// Width of the raw (uncorrected) pixel buffer.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height of the raw (uncorrected) pixel buffer.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_orientation_is_upright() {
        assert_eq!(CaptureOrientation::default(), CaptureOrientation::Upright);
    }

    #[test]
    fn frame_reports_buffer_dimensions() {
        let frame = Frame::new(RgbaImage::new(64, 48), CaptureOrientation::RotatedLeft);
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.orientation, CaptureOrientation::RotatedLeft);
    }
}
