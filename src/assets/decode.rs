use std::sync::Arc;

use crate::{
    assets::{DecodedImage, PreparedImage, PreparedSvg},
    foundation::{
        core::premul_rgba8,
        error::{BoothError, BoothResult},
    },
};

pub fn decode_image(bytes: &[u8]) -> BoothResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| BoothError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(BoothError::decode("image has zero width or height"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub fn parse_svg(bytes: &[u8]) -> BoothResult<PreparedSvg> {
    parse_svg_with(bytes, &usvg::Options::default())
}

/// Like [`parse_svg`], but with the system font database loaded so `<text>` renders.
pub fn parse_svg_with_system_fonts(bytes: &[u8]) -> BoothResult<PreparedSvg> {
    let mut opts = usvg::Options::default();
    opts.fontdb_mut().load_system_fonts();
    parse_svg_with(bytes, &opts)
}

fn parse_svg_with(bytes: &[u8], opts: &usvg::Options) -> BoothResult<PreparedSvg> {
    let tree = usvg::Tree::from_data(bytes, opts)
        .map_err(|e| BoothError::decode(format!("parse svg tree: {e}")))?;
    Ok(PreparedSvg {
        tree: Arc::new(tree),
    })
}

/// Decode either an SVG document or a raster image.
///
/// `svg_hint` comes from the file extension or data URI media type; content sniffing covers
/// sources without one.
pub fn decode_any(bytes: &[u8], svg_hint: bool) -> BoothResult<DecodedImage> {
    if svg_hint || looks_like_svg(bytes) {
        parse_svg(bytes).map(DecodedImage::Svg)
    } else {
        decode_image(bytes).map(DecodedImage::Raster)
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    // The cut may land inside a multi-byte character; sniff the valid prefix.
    let text = std::str::from_utf8(head).unwrap_or_else(|e| {
        std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or_default()
    });
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let [r, g, b, a] = premul_rgba8([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&[r, g, b, a]);
    }
}
