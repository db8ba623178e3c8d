//! Image assembly: orientation correction and region composition.
//!
//! # Overview
//!
//! [`ImageAssembler`] turns a raw captured [`Frame`] plus its detected
//! [`Region`]s into the single [`OcrImage`] handed to the recognizer.
//! Assembly is pure CPU work on one frame; it runs inline on the machine's
//! control loop rather than in a spawned task.
//!
//! Two modes, selected by [`AssemblyMode`]:
//!
//! - `TextRegions` — composite only the detected regions, at their original
//!   positions, onto a white canvas matching the corrected frame extent.
//! - `FullFrame`  — return the whole orientation-corrected frame.
//!
//! Any assembly failure means "no usable text in this frame" and the
//! workflow recovers to the live preview; it is never fatal.

use image::{imageops, Rgba, RgbaImage};
use thiserror::Error;

use crate::capture::{CaptureOrientation, Frame};
use crate::config::AssemblyMode;
use crate::detect::Region;

/// The single image handed to the recognizer: orientation-corrected and,
/// in regions mode, reduced to the detected text areas.
pub type OcrImage = RgbaImage;

// ---------------------------------------------------------------------------
// AssemblyError
// ---------------------------------------------------------------------------

/// All errors that can arise while assembling the OCR input image.
#[derive(Debug, Clone, Error)]
pub enum AssemblyError {
    /// Regions mode was requested with an empty region list.
    #[error("No regions to compose")]
    EmptyRegionSet,

    /// A region extends outside the normalized `[0, 1]` extent.
    #[error("Region {index} out of bounds: {region:?}")]
    RegionOutOfBounds {
        /// Position of the offending region in the detector's list.
        index: usize,
        region: Region,
    },

    /// The corrected frame has zero width or height.
    #[error("Zero-area canvas ({width}x{height})")]
    ZeroAreaCanvas { width: u32, height: u32 },
}

// ---------------------------------------------------------------------------
// ImageAssembler trait
// ---------------------------------------------------------------------------

/// Thread-safe seam for OCR input assembly.
///
/// Implementations must be pure: no I/O, no shared mutable state. The
/// trait exists so tests can substitute a failing assembler; production
/// uses [`RegionComposer`].
pub trait ImageAssembler: Send + Sync {
    /// Build the OCR input image for `frame` under `mode`.
    fn assemble(
        &self,
        frame: &Frame,
        regions: &[Region],
        mode: AssemblyMode,
    ) -> Result<OcrImage, AssemblyError>;
}

// Compile-time assertion: Box<dyn ImageAssembler> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ImageAssembler>) {}
};

// ---------------------------------------------------------------------------
// Orientation correction
// ---------------------------------------------------------------------------

/// Rotate raw sensor pixels upright according to the capture orientation.
///
/// | Orientation  | Correction applied |
/// |--------------|--------------------|
/// | Upright      | none               |
/// | RotatedLeft  | 90° CCW            |
/// | RotatedRight | 90° CW             |
/// | UpsideDown   | 180°               |
pub fn correct_orientation(image: &RgbaImage, orientation: CaptureOrientation) -> RgbaImage {
    match orientation {
        CaptureOrientation::Upright => image.clone(),
        CaptureOrientation::RotatedLeft => imageops::rotate270(image),
        CaptureOrientation::RotatedRight => imageops::rotate90(image),
        CaptureOrientation::UpsideDown => imageops::rotate180(image),
    }
}

// ---------------------------------------------------------------------------
// RegionComposer
// ---------------------------------------------------------------------------

/// Production assembler: orientation correction plus region composition.
#[derive(Debug, Default)]
pub struct RegionComposer;

impl RegionComposer {
    const CANVAS_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn validate(regions: &[Region]) -> Result<(), AssemblyError> {
        // Tolerate a hair of float slop from detectors that compute edges
        // as x + width.
        const EPS: f32 = 1e-4;
        for (index, region) in regions.iter().copied().enumerate() {
            let in_bounds = region.x >= -EPS
                && region.y >= -EPS
                && region.width >= 0.0
                && region.height >= 0.0
                && region.x + region.width <= 1.0 + EPS
                && region.y + region.height <= 1.0 + EPS;
            if !in_bounds {
                return Err(AssemblyError::RegionOutOfBounds { index, region });
            }
        }
        Ok(())
    }
}

impl ImageAssembler for RegionComposer {
    fn assemble(
        &self,
        frame: &Frame,
        regions: &[Region],
        mode: AssemblyMode,
    ) -> Result<OcrImage, AssemblyError> {
        let corrected = correct_orientation(&frame.image, frame.orientation);
        let (width, height) = corrected.dimensions();

        if width == 0 || height == 0 {
            return Err(AssemblyError::ZeroAreaCanvas { width, height });
        }

        match mode {
            AssemblyMode::FullFrame => Ok(corrected),
            AssemblyMode::TextRegions => {
                if regions.is_empty() {
                    return Err(AssemblyError::EmptyRegionSet);
                }
                Self::validate(regions)?;

                let mut canvas = RgbaImage::from_pixel(width, height, Self::CANVAS_FILL);
                for region in regions {
                    let (x, y, w, h) = region.to_pixels(width, height);
                    let patch = imageops::crop_imm(&corrected, x, y, w, h).to_image();
                    imageops::replace(&mut canvas, &patch, i64::from(x), i64::from(y));
                }
                Ok(canvas)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 4x2 frame: left half red, right half blue.
    fn half_and_half(orientation: CaptureOrientation) -> Frame {
        let mut img = RgbaImage::from_pixel(4, 2, RED);
        for y in 0..2 {
            for x in 2..4 {
                img.put_pixel(x, y, BLUE);
            }
        }
        Frame::new(img, orientation)
    }

    // --- Orientation correction ---

    #[test]
    fn upright_is_unchanged() {
        let frame = half_and_half(CaptureOrientation::Upright);
        let out = correct_orientation(&frame.image, frame.orientation);
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(3, 0), BLUE);
    }

    #[test]
    fn rotated_left_swaps_dimensions() {
        let frame = half_and_half(CaptureOrientation::RotatedLeft);
        let out = correct_orientation(&frame.image, frame.orientation);
        assert_eq!(out.dimensions(), (2, 4));
        // 90° CCW sends the right (blue) half to the top.
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(*out.get_pixel(0, 3), RED);
    }

    #[test]
    fn rotated_right_swaps_dimensions() {
        let frame = half_and_half(CaptureOrientation::RotatedRight);
        let out = correct_orientation(&frame.image, frame.orientation);
        assert_eq!(out.dimensions(), (2, 4));
        // 90° CW sends the left (red) half to the top.
        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(0, 3), BLUE);
    }

    #[test]
    fn upside_down_flips_both_axes() {
        let frame = half_and_half(CaptureOrientation::UpsideDown);
        let out = correct_orientation(&frame.image, frame.orientation);
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(*out.get_pixel(3, 1), RED);
    }

    // --- FullFrame mode ---

    #[test]
    fn full_frame_returns_corrected_image() {
        let frame = half_and_half(CaptureOrientation::UpsideDown);
        let out = RegionComposer
            .assemble(&frame, &[], AssemblyMode::FullFrame)
            .unwrap();
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(*out.get_pixel(0, 0), BLUE);
    }

    // --- TextRegions mode ---

    #[test]
    fn regions_mode_copies_pixels_at_original_spot() {
        let frame = half_and_half(CaptureOrientation::Upright);
        // Right half only.
        let regions = [Region::new(0.5, 0.0, 0.5, 1.0)];
        let out = RegionComposer
            .assemble(&frame, &regions, AssemblyMode::TextRegions)
            .unwrap();
        assert_eq!(out.dimensions(), (4, 2));
        // Composited region keeps its position and pixels...
        assert_eq!(*out.get_pixel(2, 0), BLUE);
        assert_eq!(*out.get_pixel(3, 1), BLUE);
        // ...while everything outside stays canvas white.
        assert_eq!(*out.get_pixel(0, 0), RegionComposer::CANVAS_FILL);
        assert_eq!(*out.get_pixel(1, 1), RegionComposer::CANVAS_FILL);
    }

    #[test]
    fn regions_mode_rejects_empty_region_set() {
        let frame = half_and_half(CaptureOrientation::Upright);
        let err = RegionComposer
            .assemble(&frame, &[], AssemblyMode::TextRegions)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::EmptyRegionSet));
    }

    #[test]
    fn regions_mode_rejects_out_of_bounds_region() {
        let frame = half_and_half(CaptureOrientation::Upright);
        let regions = [Region::new(0.8, 0.0, 0.5, 0.5)];
        let err = RegionComposer
            .assemble(&frame, &regions, AssemblyMode::TextRegions)
            .unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::RegionOutOfBounds { index: 0, .. }
        ));
    }

    #[test]
    fn zero_area_frame_is_rejected() {
        let frame = Frame::new(RgbaImage::new(0, 0), CaptureOrientation::Upright);
        let err = RegionComposer
            .assemble(&frame, &[], AssemblyMode::FullFrame)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::ZeroAreaCanvas { .. }));
    }

    #[test]
    fn regions_are_mapped_against_the_corrected_extent() {
        // RotatedLeft: corrected image is 2x4 with blue on top. The top
        // half region must therefore pick up blue pixels.
        let frame = half_and_half(CaptureOrientation::RotatedLeft);
        let regions = [Region::new(0.0, 0.0, 1.0, 0.5)];
        let out = RegionComposer
            .assemble(&frame, &regions, AssemblyMode::TextRegions)
            .unwrap();
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(*out.get_pixel(1, 3), RegionComposer::CANVAS_FILL);
    }
}
