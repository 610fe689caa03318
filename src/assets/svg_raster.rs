use crate::foundation::{
    core::Affine,
    error::{BoothError, BoothResult},
};

// Keeps a malformed template from requesting a gigantic pixmap.
const MAX_DIM: u32 = 16_384;

/// Compute the raster size for an SVG drawn with `transform`.
///
/// The returned `(width, height, transform_adjust)` are used as:
///
/// - rasterize the SVG into a pixmap of `(width, height)`
/// - draw the resulting image with `transform_adjust` (not the original transform)
///
/// Rasterizing at the destination scale keeps 2x exports of vector frames sharp.
pub fn svg_raster_params(
    tree: &usvg::Tree,
    transform: Affine,
) -> BoothResult<(u32, u32, Affine)> {
    let size = tree.size();
    let (base_w, base_h) = (f64::from(size.width()), f64::from(size.height()));
    if !base_w.is_finite() || !base_h.is_finite() || base_w <= 0.0 || base_h <= 0.0 {
        return Err(BoothError::render("svg has invalid width/height"));
    }

    let [a, b, c, d, _e, _f] = transform.as_coeffs();
    let sx = (a * a + b * b).sqrt().max(1e-6);
    let sy = (c * c + d * d).sqrt().max(1e-6);

    let w = (base_w * sx).ceil().max(1.0) as u32;
    let h = (base_h * sy).ceil().max(1.0) as u32;
    if w > MAX_DIM || h > MAX_DIM {
        return Err(BoothError::render(format!(
            "svg raster size too large: {w}x{h} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    // Map raster pixels back into the SVG's logical space before applying the draw transform.
    let raster_sx = f64::from(w) / base_w;
    let raster_sy = f64::from(h) / base_h;
    let transform_adjust = transform * Affine::scale_non_uniform(1.0 / raster_sx, 1.0 / raster_sy);

    Ok((w, h, transform_adjust))
}

pub fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> BoothResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| BoothError::render("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}
