use crate::foundation::core::CanvasSize;

const WIDE_VIEWPORT: u32 = 768;
const WIDE_DISPLAY_WIDTH: u32 = 320;
const NARROW_DISPLAY_MAX: u32 = 240;
const NARROW_MARGIN: u32 = 80;

/// On-screen preview box for a canvas.
///
/// Purely presentational: the raster and export resolutions always come from the template's
/// canvas size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayLayout {
    pub width: f64,
    pub height: f64,
}

impl DisplayLayout {
    pub fn for_viewport(viewport_width: u32, canvas: CanvasSize) -> Self {
        let width = if viewport_width > WIDE_VIEWPORT {
            WIDE_DISPLAY_WIDTH
        } else {
            viewport_width
                .saturating_sub(NARROW_MARGIN)
                .min(NARROW_DISPLAY_MAX)
        };
        let width = f64::from(width);
        Self {
            width,
            height: width * canvas.aspect_ratio(),
        }
    }

    /// Display pixels per canvas pixel.
    pub fn zoom(&self, canvas: CanvasSize) -> f64 {
        self.width / f64::from(canvas.width.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_viewport_uses_fixed_width() {
        let canvas = CanvasSize::new(1080, 1920).unwrap();
        let d = DisplayLayout::for_viewport(1280, canvas);
        assert_eq!(d.width, 320.0);
        assert!((d.height - 320.0 * 1920.0 / 1080.0).abs() < 1e-9);
    }

    #[test]
    fn narrow_viewport_leaves_margin_and_caps() {
        let canvas = CanvasSize::new(800, 400).unwrap();
        assert_eq!(DisplayLayout::for_viewport(300, canvas).width, 220.0);
        assert_eq!(DisplayLayout::for_viewport(768, canvas).width, 240.0);
        assert_eq!(DisplayLayout::for_viewport(768, canvas).height, 120.0);
        assert_eq!(DisplayLayout::for_viewport(50, canvas).width, 0.0);
    }

    #[test]
    fn zoom_relates_display_to_canvas() {
        let canvas = CanvasSize::new(400, 600).unwrap();
        let d = DisplayLayout::for_viewport(1000, canvas);
        assert!((d.zoom(canvas) - 0.8).abs() < 1e-9);
    }
}
