use crate::{
    catalog::TemplateId,
    compose::{LayerRole, PlacedLayer},
    foundation::{
        core::CanvasSize,
        error::{BoothError, BoothResult},
    },
    render::{FrameRGBA, RenderSettings, cpu::CpuRasterizer},
};

/// Layered render target for one selected template.
///
/// Holds at most one background layer, always at index 0, followed by photo layers in ascending
/// slot order. A surface is never reused across templates.
#[derive(Debug)]
pub struct CompositeSurface {
    serial: u64,
    template_id: TemplateId,
    canvas: CanvasSize,
    layers: Vec<PlacedLayer>,
    rasterizer: CpuRasterizer,
    disposed: bool,
}

impl CompositeSurface {
    pub fn new(
        serial: u64,
        template_id: TemplateId,
        canvas: CanvasSize,
        settings: RenderSettings,
    ) -> Self {
        tracing::debug!(
            serial,
            template_id,
            width = canvas.width,
            height = canvas.height,
            "surface allocated"
        );
        Self {
            serial,
            template_id,
            canvas,
            layers: Vec::new(),
            rasterizer: CpuRasterizer::new(settings),
            disposed: false,
        }
    }

    /// Allocation counter value; changes whenever the owner recreates the surface.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn layers(&self) -> &[PlacedLayer] {
        &self.layers
    }

    pub fn placed_slots(&self) -> Vec<usize> {
        self.layers.iter().filter_map(|l| l.role.slot()).collect()
    }

    pub fn has_photos(&self) -> bool {
        self.layers.iter().any(|l| l.role.slot().is_some())
    }

    fn ensure_live(&self) -> BoothResult<()> {
        if self.disposed {
            return Err(BoothError::render(format!(
                "surface {} is disposed",
                self.serial
            )));
        }
        Ok(())
    }

    pub fn set_background(&mut self, layer: PlacedLayer) -> BoothResult<()> {
        self.ensure_live()?;
        if !layer.role.is_background() {
            return Err(BoothError::validation(
                "set_background requires a background layer",
            ));
        }
        match self.layers.first() {
            Some(first) if first.role.is_background() => self.layers[0] = layer,
            _ => self.layers.insert(0, layer),
        }
        Ok(())
    }

    /// Insert a photo layer at its slot position, replacing any photo already in that slot.
    pub fn add_photo(&mut self, layer: PlacedLayer) -> BoothResult<()> {
        self.ensure_live()?;
        let LayerRole::Photo { slot } = layer.role else {
            return Err(BoothError::validation("add_photo requires a photo layer"));
        };

        if let Some(existing) = self.layers.iter_mut().find(|l| l.role.slot() == Some(slot)) {
            *existing = layer;
            return Ok(());
        }
        let at = self
            .layers
            .iter()
            .position(|l| l.role.slot().is_some_and(|s| s > slot))
            .unwrap_or(self.layers.len());
        self.layers.insert(at, layer);
        Ok(())
    }

    /// Drop every layer above the background. Returns how many were removed.
    pub fn remove_above_background(&mut self) -> usize {
        let before = self.layers.len();
        self.layers.retain(|l| l.role.is_background());
        before - self.layers.len()
    }

    pub fn replace_photos(&mut self, layers: Vec<PlacedLayer>) -> BoothResult<()> {
        self.ensure_live()?;
        self.remove_above_background();
        for layer in layers {
            self.add_photo(layer)?;
        }
        Ok(())
    }

    /// Rasterize at `scale` times the canvas resolution.
    pub fn render(&self, scale: u32) -> BoothResult<FrameRGBA> {
        self.ensure_live()?;
        self.rasterizer
            .render_layers(self.canvas, scale, &self.layers)
    }

    /// Release layer resources. Safe to call repeatedly; only the first call has an effect.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            tracing::warn!(serial = self.serial, "surface already disposed; ignoring");
            return false;
        }
        self.layers.clear();
        self.layers.shrink_to_fit();
        self.disposed = true;
        tracing::debug!(serial = self.serial, "surface disposed");
        true
    }
}
