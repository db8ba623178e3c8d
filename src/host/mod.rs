//! Host surface boundary and overlay placement math.
//!
//! # Overview
//!
//! [`HostSurface`] is the machine's view of whatever UI is hosting it. The
//! machine holds it as a `Weak<dyn HostSurface>` — the host owns its own
//! lifetime, and once it is gone every surface call silently becomes a
//! no-op. The machine never fails because the UI went away.
//!
//! [`OverlayFrame`] is the pure placement helper: scale an image to the
//! container width, preserve aspect, pin the top-left corner at a
//! configured origin.
//!
//! Events flowing the other way (ready / tap / background) do not travel
//! through this trait; the host pushes them into the machine through a
//! [`MachineHandle`](crate::workflow::MachineHandle).

use crate::assemble::OcrImage;

// ---------------------------------------------------------------------------
// HostSurface trait
// ---------------------------------------------------------------------------

/// What the workflow machine may ask of its hosting surface.
///
/// Implementations must be `Send + Sync`; calls arrive from the machine's
/// control task.
pub trait HostSurface: Send + Sync {
    /// Width of the hosting container, in points.
    fn container_width(&self) -> f32;

    /// Show `image` as an overlay at `frame` (already fitted; see
    /// [`OverlayFrame::fit`]).
    fn display_image(&self, image: &OcrImage, frame: OverlayFrame);

    /// Remove every overlay previously added with `display_image`.
    fn remove_overlays(&self);
}

// Compile-time assertion: Box<dyn HostSurface> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn HostSurface>) {}
};

// ---------------------------------------------------------------------------
// OverlayFrame
// ---------------------------------------------------------------------------

/// Position and size of an overlay on the host surface, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl OverlayFrame {
    /// Fit an image of `image_width` × `image_height` pixels to the full
    /// `container_width`, preserving aspect ratio, top-left corner at
    /// `origin`.
    ///
    /// A zero-width image yields a zero-sized frame at `origin` rather
    /// than a division by zero.
    pub fn fit(
        image_width: u32,
        image_height: u32,
        container_width: f32,
        origin: (f32, f32),
    ) -> Self {
        let (x, y) = origin;
        if image_width == 0 {
            return Self {
                x,
                y,
                width: 0.0,
                height: 0.0,
            };
        }
        let scale = container_width / image_width as f32;
        Self {
            x,
            y,
            width: container_width,
            height: image_height as f32 * scale,
        }
    }
}

// ---------------------------------------------------------------------------
// TestSurface  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records overlay traffic.
#[cfg(test)]
pub struct TestSurface {
    width: f32,
    pub displayed: std::sync::Mutex<Vec<OverlayFrame>>,
    pub removals: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl TestSurface {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            displayed: Default::default(),
            removals: Default::default(),
        }
    }

    pub fn display_count(&self) -> usize {
        self.displayed.lock().unwrap().len()
    }

    pub fn removal_count(&self) -> usize {
        self.removals.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl HostSurface for TestSurface {
    fn container_width(&self) -> f32 {
        self.width
    }

    fn display_image(&self, _image: &OcrImage, frame: OverlayFrame) {
        self.displayed.lock().unwrap().push(frame);
    }

    fn remove_overlays(&self) {
        self.removals
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_scales_to_container_width() {
        // 400x300 image into a 200-point container: half scale.
        let frame = OverlayFrame::fit(400, 300, 200.0, (0.0, 20.0));
        assert_eq!(frame.x, 0.0);
        assert_eq!(frame.y, 20.0);
        assert_eq!(frame.width, 200.0);
        assert_eq!(frame.height, 150.0);
    }

    #[test]
    fn fit_upscales_small_images() {
        let frame = OverlayFrame::fit(100, 50, 300.0, (0.0, 0.0));
        assert_eq!(frame.width, 300.0);
        assert_eq!(frame.height, 150.0);
    }

    #[test]
    fn fit_zero_width_image_is_zero_sized() {
        let frame = OverlayFrame::fit(0, 100, 300.0, (5.0, 20.0));
        assert_eq!(frame.width, 0.0);
        assert_eq!(frame.height, 0.0);
        assert_eq!(frame.x, 5.0);
    }

    #[test]
    fn test_surface_records_traffic() {
        let surface = TestSurface::new(320.0);
        let image = OcrImage::new(4, 4);
        surface.display_image(
            &image,
            OverlayFrame::fit(4, 4, surface.container_width(), (0.0, 20.0)),
        );
        surface.remove_overlays();

        assert_eq!(surface.display_count(), 1);
        assert_eq!(surface.removal_count(), 1);
        assert_eq!(surface.displayed.lock().unwrap()[0].width, 320.0);
    }
}
