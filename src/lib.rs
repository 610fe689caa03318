//! Photobooth is a photo-frame template compositing engine.
//!
//! A fixed catalog of frame templates defines a canvas size, a background artwork and up to three
//! photo slots. The [`CanvasManager`] owns one composite surface per selected template:
//!
//! - Select a template and hand it an ordered photo set
//! - Photos are cover-fit into their slots above the background
//! - Export the result as a PNG at twice the canvas resolution
#![forbid(unsafe_code)]

mod assets;
mod foundation;

/// Frame template definitions.
pub mod catalog;
/// Slot placement and layer-stack composition.
pub mod compose;
/// Runtime configuration.
pub mod config;
/// PNG export of a finished composite.
pub mod export;
/// Surface lifecycle state machine.
pub mod lifecycle;
/// Composite surface and CPU rasterization.
pub mod render;

pub use crate::foundation::core::{Affine, CanvasSize, Rect, SlotRect};
pub use crate::foundation::error::{BoothError, BoothResult};

pub use crate::assets::decode::{decode_any, decode_image, parse_svg};
pub use crate::assets::loader::{DEFAULT_LOAD_TIMEOUT, ImageLoader, with_timeout};
pub use crate::assets::source::{ImageSource, normalize_asset_path};
pub use crate::assets::{DecodedImage, PreparedImage, PreparedSvg};
pub use crate::catalog::{MAX_SLOTS, TemplateCatalog, TemplateDefinition, TemplateId};
pub use crate::compose::compositor::{ComposeReport, SlotCompositor};
pub use crate::compose::placement::{
    FitPolicy, Placement, fit_scale, place_background, place_in_slot,
};
pub use crate::compose::{LayerContent, LayerRole, PlacedLayer};
pub use crate::config::BoothConfig;
pub use crate::export::{EXPORT_MULTIPLIER, ExportArtifact, Exporter, encode_png};
pub use crate::lifecycle::CanvasManager;
pub use crate::lifecycle::display::DisplayLayout;
pub use crate::lifecycle::state::{CanvasStatus, LifecycleState};
pub use crate::render::cpu::CpuRasterizer;
pub use crate::render::surface::CompositeSurface;
pub use crate::render::{FrameRGBA, RenderSettings};
