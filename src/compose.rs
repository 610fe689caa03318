use crate::{assets::DecodedImage, compose::placement::Placement};

pub(crate) mod compositor;
pub(crate) mod placement;

/// What a layer draws.
#[derive(Clone, Debug)]
pub enum LayerContent {
    Image(DecodedImage),
    /// Solid straight-RGBA8 fill of a unit square, stretched by the placement.
    Solid { rgba: [u8; 4] },
}

impl LayerContent {
    /// Intrinsic size that the placement scales from.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            LayerContent::Image(img) => img.dimensions(),
            LayerContent::Solid { .. } => (1.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerRole {
    Background,
    /// Substituted when the template artwork failed to load.
    FallbackBackground,
    Photo { slot: usize },
}

impl LayerRole {
    pub fn is_background(self) -> bool {
        matches!(self, LayerRole::Background | LayerRole::FallbackBackground)
    }

    pub fn slot(self) -> Option<usize> {
        match self {
            LayerRole::Photo { slot } => Some(slot),
            _ => None,
        }
    }
}

/// A layer positioned in canvas coordinates.
#[derive(Clone, Debug)]
pub struct PlacedLayer {
    pub role: LayerRole,
    pub content: LayerContent,
    pub placement: Placement,
}
