use vello_cpu::kurbo::Shape as _;

use crate::{
    assets::{
        DecodedImage, PreparedImage,
        svg_raster::{rasterize_svg_to_premul_rgba8, svg_raster_params},
    },
    compose::{LayerContent, PlacedLayer},
    foundation::{
        core::{Affine, CanvasSize, Rect},
        error::{BoothError, BoothResult},
    },
    render::{FrameRGBA, RenderSettings},
};

/// Rasterizes a layer stack with `vello_cpu`.
///
/// Layers are drawn in slice order, so callers own z-order. Output is premultiplied RGBA8 at
/// `canvas * scale` pixels; layer geometry stays in canvas coordinates.
#[derive(Clone, Debug, Default)]
pub struct CpuRasterizer {
    settings: RenderSettings,
}

impl CpuRasterizer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn render_layers(
        &self,
        canvas: CanvasSize,
        scale: u32,
        layers: &[PlacedLayer],
    ) -> BoothResult<FrameRGBA> {
        if scale == 0 {
            return Err(BoothError::render("render scale must be >= 1"));
        }
        let target = canvas.scaled(scale);
        let width_u16: u16 = target
            .width
            .try_into()
            .map_err(|_| BoothError::render("surface width exceeds u16"))?;
        let height_u16: u16 = target
            .height
            .try_into()
            .map_err(|_| BoothError::render("surface height exceeds u16"))?;

        let base = Affine::scale(f64::from(scale));
        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);

        let [r, g, b, a] = self.settings.clear_rgba;
        ctx.set_transform(affine_to_cpu(base));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&rect_to_cpu(canvas.to_rect()));

        for layer in layers {
            draw_layer(&mut ctx, layer, base)?;
        }

        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: target.width,
            height: target.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn draw_layer(
    ctx: &mut vello_cpu::RenderContext,
    layer: &PlacedLayer,
    base: Affine,
) -> BoothResult<()> {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    // The clip is expressed in canvas space, so push it before the layer transform applies.
    if let Some(clip) = layer.placement.clip {
        ctx.set_transform(affine_to_cpu(base));
        ctx.push_clip_layer(&rect_to_cpu(clip).to_path(0.1));
    }

    let transform = base * layer.placement.transform();
    match &layer.content {
        LayerContent::Solid { rgba: [r, g, b, a] } => {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(*r, *g, *b, *a));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, 1.0, 1.0));
        }
        LayerContent::Image(DecodedImage::Raster(img)) => {
            let paint = image_paint(img)?;
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(img.width),
                f64::from(img.height),
            ));
        }
        LayerContent::Image(DecodedImage::Svg(svg)) => {
            let (w, h, transform_adjust) = svg_raster_params(&svg.tree, transform)?;
            let rgba8_premul = rasterize_svg_to_premul_rgba8(&svg.tree, w, h)?;
            let pixmap = image_premul_bytes_to_pixmap(&rgba8_premul, w, h)?;
            ctx.set_transform(affine_to_cpu(transform_adjust));
            ctx.set_paint(pixmap_paint(pixmap));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(w),
                f64::from(h),
            ));
        }
    }

    if layer.placement.clip.is_some() {
        ctx.pop_layer();
    }
    Ok(())
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn image_paint(img: &PreparedImage) -> BoothResult<vello_cpu::Image> {
    let pixmap = image_premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
    Ok(pixmap_paint(pixmap))
}

fn pixmap_paint(pixmap: vello_cpu::Pixmap) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> BoothResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BoothError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BoothError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(BoothError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
