use crate::foundation::core::{Affine, CanvasSize, Rect, SlotRect};

/// How a photo is scaled into its slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitPolicy {
    /// Scale until both dimensions cover the slot, cropping the overflow.
    #[default]
    Cover,
    /// Scale until the photo fits inside the slot, leaving letterbox bars.
    Contain,
}

/// Scale, offset and optional clip for one layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scaled_width: f64,
    pub scaled_height: f64,
    /// Region outside of which nothing of this layer is drawn.
    pub clip: Option<Rect>,
}

impl Placement {
    /// Maps the layer's intrinsic pixel space into canvas space.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.offset_x, self.offset_y))
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y,
            self.offset_x + self.scaled_width,
            self.offset_y + self.scaled_height,
        )
    }
}

// Zero-sized sources are treated as 1px, so scale math never divides by zero.
fn guard(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 1.0 }
}

pub fn fit_scale(policy: FitPolicy, src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> f64 {
    let scale_x = dst_w / guard(src_w);
    let scale_y = dst_h / guard(src_h);
    match policy {
        FitPolicy::Cover => scale_x.max(scale_y),
        FitPolicy::Contain => scale_x.min(scale_y),
    }
}

/// Uniformly scale a `src_w x src_h` photo into `slot`, centered, clipped to the slot.
///
/// Under [`FitPolicy::Cover`] offsets go below the slot origin when the scaled photo overflows;
/// the clip produces the crop.
pub fn place_in_slot(policy: FitPolicy, src_w: f64, src_h: f64, slot: SlotRect) -> Placement {
    let (src_w, src_h) = (guard(src_w), guard(src_h));
    let slot_w = f64::from(slot.width);
    let slot_h = f64::from(slot.height);

    let scale = fit_scale(policy, src_w, src_h, slot_w, slot_h);
    let scaled_width = src_w * scale;
    let scaled_height = src_h * scale;

    Placement {
        scale_x: scale,
        scale_y: scale,
        offset_x: f64::from(slot.x) + (slot_w - scaled_width) / 2.0,
        offset_y: f64::from(slot.y) + (slot_h - scaled_height) / 2.0,
        scaled_width,
        scaled_height,
        clip: Some(slot.to_rect()),
    }
}

/// Stretch the background independently on each axis to exactly fill the canvas.
pub fn place_background(src_w: f64, src_h: f64, canvas: CanvasSize) -> Placement {
    let (src_w, src_h) = (guard(src_w), guard(src_h));
    let width = f64::from(canvas.width);
    let height = f64::from(canvas.height);
    Placement {
        scale_x: width / src_w,
        scale_y: height / src_h,
        offset_x: 0.0,
        offset_y: 0.0,
        scaled_width: width,
        scaled_height: height,
        clip: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn cover_fit_covers_slot_with_one_tight_dimension() {
        let slot = SlotRect::new(50, 100, 200, 150);
        for &(w, h) in &[(640.0, 480.0), (480.0, 640.0), (100.0, 100.0), (1.0, 999.0), (200.0, 150.0)] {
            let p = place_in_slot(FitPolicy::Cover, w, h, slot);
            assert!(p.scaled_width + EPS >= 200.0, "{w}x{h}");
            assert!(p.scaled_height + EPS >= 150.0, "{w}x{h}");
            let tight_w = (p.scaled_width - 200.0).abs() < 1e-6;
            let tight_h = (p.scaled_height - 150.0).abs() < 1e-6;
            assert!(tight_w || tight_h, "{w}x{h}");
            assert_eq!(p.scale_x, p.scale_y);
        }
    }

    #[test]
    fn cover_fit_centers_and_crops_overflow() {
        // 400x150 photo into a 200x150 slot: height is tight (scale 1), width overflows by 200.
        let slot = SlotRect::new(50, 100, 200, 150);
        let p = place_in_slot(FitPolicy::Cover, 400.0, 150.0, slot);
        assert!((p.scale_x - 1.0).abs() < EPS);
        assert!((p.offset_x - (50.0 - 100.0)).abs() < EPS);
        assert!((p.offset_y - 100.0).abs() < EPS);
        assert_eq!(p.clip, Some(Rect::new(50.0, 100.0, 250.0, 250.0)));
    }

    #[test]
    fn contain_fit_letterboxes_inside_slot() {
        let slot = SlotRect::new(0, 0, 200, 150);
        let p = place_in_slot(FitPolicy::Contain, 400.0, 150.0, slot);
        assert!((p.scale_x - 0.5).abs() < EPS);
        assert!(p.scaled_width <= 200.0 + EPS);
        assert!(p.scaled_height <= 150.0 + EPS);
        assert!((p.offset_y - 37.5).abs() < EPS);
    }

    #[test]
    fn background_stretches_per_axis() {
        let canvas = CanvasSize::new(800, 400).unwrap();
        let p = place_background(100.0, 100.0, canvas);
        assert!((p.scale_x - 8.0).abs() < EPS);
        assert!((p.scale_y - 4.0).abs() < EPS);
        assert_eq!(p.bounds(), canvas.to_rect());
        assert!(p.clip.is_none());
    }

    #[test]
    fn transform_maps_source_corners_to_bounds() {
        let slot = SlotRect::new(10, 20, 30, 40);
        let p = place_in_slot(FitPolicy::Cover, 60.0, 40.0, slot);
        let t = p.transform();
        let b = p.bounds();
        let p0 = t * kurbo::Point::new(0.0, 0.0);
        let p1 = t * kurbo::Point::new(60.0, 40.0);
        assert!((p0.x - b.x0).abs() < EPS && (p0.y - b.y0).abs() < EPS);
        assert!((p1.x - b.x1).abs() < EPS && (p1.y - b.y1).abs() < EPS);
    }

    #[test]
    fn zero_sized_source_does_not_divide_by_zero() {
        let p = place_in_slot(FitPolicy::Cover, 0.0, 0.0, SlotRect::new(0, 0, 10, 20));
        assert!(p.scale_x.is_finite());
        assert!((p.scale_x - 20.0).abs() < EPS);
    }
}
