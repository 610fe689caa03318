use std::sync::Arc;

pub(crate) mod decode;
pub(crate) mod loader;
pub(crate) mod source;
pub(crate) mod svg_raster;

/// Raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct PreparedSvg {
    pub tree: Arc<usvg::Tree>,
}

/// A decoded image whose pixel dimensions are known.
#[derive(Clone, Debug)]
pub enum DecodedImage {
    Raster(PreparedImage),
    Svg(PreparedSvg),
}

impl DecodedImage {
    /// Intrinsic size in pixels. SVGs report their document size.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            DecodedImage::Raster(img) => (f64::from(img.width), f64::from(img.height)),
            DecodedImage::Svg(svg) => {
                let size = svg.tree.size();
                (f64::from(size.width()), f64::from(size.height()))
            }
        }
    }

    pub fn is_svg(&self) -> bool {
        matches!(self, DecodedImage::Svg(_))
    }
}
