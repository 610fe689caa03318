use std::time::Duration;

use crate::{
    assets::{
        DecodedImage, decode::parse_svg_with_system_fonts, loader::ImageLoader,
        source::ImageSource,
    },
    catalog::TemplateDefinition,
    compose::{
        LayerContent, LayerRole, PlacedLayer,
        placement::{FitPolicy, place_background, place_in_slot},
    },
    config::BoothConfig,
    foundation::{
        core::{CanvasSize, SlotRect},
        error::BoothError,
    },
};

/// What went wrong (and was recovered) while composing.
#[derive(Debug, Default)]
pub struct ComposeReport {
    /// The template artwork failed to load and a fallback fill was used.
    pub background_fallback: bool,
    /// One [`BoothError::PhotoLoad`] per omitted photo.
    pub photo_failures: Vec<BoothError>,
}

impl ComposeReport {
    pub fn failed_slots(&self) -> Vec<usize> {
        self.photo_failures
            .iter()
            .filter_map(|e| match e {
                BoothError::PhotoLoad { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }
}

/// Places photos into template slots above the background artwork.
///
/// Layer order is fixed: background first, then photos in ascending slot index.
#[derive(Clone, Debug)]
pub struct SlotCompositor {
    policy: FitPolicy,
    fallback_rgba: [u8; 4],
    fallback_label: Option<String>,
}

impl Default for SlotCompositor {
    fn default() -> Self {
        Self::from_config(&BoothConfig::default())
    }
}

impl SlotCompositor {
    pub fn new(policy: FitPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn from_config(cfg: &BoothConfig) -> Self {
        Self {
            policy: FitPolicy::Cover,
            fallback_rgba: cfg.fallback_rgba,
            fallback_label: cfg.fallback_label.clone(),
        }
    }

    pub fn policy(&self) -> FitPolicy {
        self.policy
    }

    /// Full layer stack for already-decoded inputs.
    ///
    /// `photos[i]` is `None` when photo `i` failed to load; its slot is left showing the
    /// background. Photos beyond the slot count are ignored.
    pub fn compose(
        &self,
        canvas: CanvasSize,
        background: Option<&DecodedImage>,
        photos: &[Option<DecodedImage>],
        slots: &[SlotRect],
    ) -> Vec<PlacedLayer> {
        let mut layers = Vec::with_capacity(1 + photos.len().min(slots.len()));
        layers.push(self.background_layer(canvas, background));
        layers.extend(self.photo_layers(photos, slots));
        layers
    }

    pub fn background_layer(
        &self,
        canvas: CanvasSize,
        background: Option<&DecodedImage>,
    ) -> PlacedLayer {
        let Some(bg) = background else {
            return self.fallback_layer(canvas);
        };
        let (w, h) = bg.dimensions();
        PlacedLayer {
            role: LayerRole::Background,
            content: LayerContent::Image(bg.clone()),
            placement: place_background(w, h, canvas),
        }
    }

    /// Solid fill, plus the configured caption when one is set and renders.
    pub fn fallback_layer(&self, canvas: CanvasSize) -> PlacedLayer {
        let labelled = self.fallback_label.as_deref().and_then(|label| {
            let svg = fallback_svg(canvas, self.fallback_rgba, label);
            match parse_svg_with_system_fonts(svg.as_bytes()) {
                Ok(svg) => Some(DecodedImage::Svg(svg)),
                Err(err) => {
                    tracing::warn!(%err, "fallback label could not be built; using plain fill");
                    None
                }
            }
        });

        let content = match labelled {
            Some(img) => LayerContent::Image(img),
            None => LayerContent::Solid {
                rgba: self.fallback_rgba,
            },
        };
        let (w, h) = content.dimensions();
        PlacedLayer {
            role: LayerRole::FallbackBackground,
            content,
            placement: place_background(w, h, canvas),
        }
    }

    pub fn photo_layers(
        &self,
        photos: &[Option<DecodedImage>],
        slots: &[SlotRect],
    ) -> Vec<PlacedLayer> {
        photos
            .iter()
            .zip(slots)
            .enumerate()
            .filter_map(|(slot_idx, (photo, slot))| {
                let photo = photo.as_ref()?;
                let (w, h) = photo.dimensions();
                let placement = place_in_slot(self.policy, w, h, *slot);
                tracing::debug!(
                    slot = slot_idx,
                    scale = placement.scale_x,
                    offset_x = placement.offset_x,
                    offset_y = placement.offset_y,
                    "photo placed"
                );
                Some(PlacedLayer {
                    role: LayerRole::Photo { slot: slot_idx },
                    content: LayerContent::Image(photo.clone()),
                    placement,
                })
            })
            .collect()
    }

    /// Load the template artwork, substituting `None` (and a warning) on failure.
    pub async fn load_background(
        &self,
        loader: &ImageLoader,
        template: &TemplateDefinition,
        timeout: Duration,
    ) -> Option<DecodedImage> {
        let result = match ImageSource::parse(&template.background) {
            Ok(source) => loader.load(&source, timeout).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(img) => Some(img),
            Err(err) => {
                let err = BoothError::AssetLoad {
                    source_ref: template.background.clone(),
                    reason: err.to_string(),
                };
                tracing::warn!(template = template.id, %err, "background unavailable; using fallback");
                None
            }
        }
    }

    /// Load up to `max` photos in order. Failures become `None` plus a report entry.
    pub async fn load_photos(
        &self,
        loader: &ImageLoader,
        photos: &[ImageSource],
        max: usize,
        timeout: Duration,
    ) -> (Vec<Option<DecodedImage>>, Vec<BoothError>) {
        let mut decoded = Vec::with_capacity(photos.len().min(max));
        let mut failures = Vec::new();
        for (index, source) in photos.iter().take(max).enumerate() {
            match loader.load(source, timeout).await {
                Ok(img) => decoded.push(Some(img)),
                Err(err) => {
                    let err = BoothError::PhotoLoad {
                        index,
                        reason: err.to_string(),
                    };
                    tracing::warn!(%err, "photo omitted from composite");
                    failures.push(err);
                    decoded.push(None);
                }
            }
        }
        (decoded, failures)
    }

    /// Photo layers only, for re-placing photos above an existing background.
    pub async fn compose_photos(
        &self,
        loader: &ImageLoader,
        template: &TemplateDefinition,
        photos: &[ImageSource],
        timeout: Duration,
    ) -> (Vec<PlacedLayer>, ComposeReport) {
        let (decoded, photo_failures) = self
            .load_photos(loader, photos, template.slots.len(), timeout)
            .await;
        let layers = self.photo_layers(&decoded, &template.slots);
        (
            layers,
            ComposeReport {
                background_fallback: false,
                photo_failures,
            },
        )
    }

    /// Load everything for `template` and build the full layer stack.
    ///
    /// Never fails: a missing background becomes the fallback, missing photos are omitted.
    #[tracing::instrument(skip(self, loader, template, photos), fields(template = template.id, photos = photos.len()))]
    pub async fn compose_template(
        &self,
        loader: &ImageLoader,
        template: &TemplateDefinition,
        photos: &[ImageSource],
        timeout: Duration,
    ) -> (Vec<PlacedLayer>, ComposeReport) {
        let background = self.load_background(loader, template, timeout).await;
        let (decoded, photo_failures) = self
            .load_photos(loader, photos, template.slots.len(), timeout)
            .await;

        let layers = self.compose(
            template.canvas_size(),
            background.as_ref(),
            &decoded,
            &template.slots,
        );
        (
            layers,
            ComposeReport {
                background_fallback: background.is_none(),
                photo_failures,
            },
        )
    }
}

fn fallback_svg(canvas: CanvasSize, [r, g, b, a]: [u8; 4], label: &str) -> String {
    let font_size = (f64::from(canvas.height.min(canvas.width)) / 12.0).max(8.0);
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="rgb({r},{g},{b})" fill-opacity="{opacity:.4}"/><text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="middle" font-family="sans-serif" font-size="{font_size:.1}" fill="#6b7280">{label}</text></svg>"##,
        w = canvas.width,
        h = canvas.height,
        opacity = f64::from(a) / 255.0,
        cx = f64::from(canvas.width) / 2.0,
        cy = f64::from(canvas.height) / 2.0,
        label = escape_xml(label),
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
