use std::io::Cursor;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    config::BoothConfig,
    foundation::{
        core::unpremultiply_in_place,
        error::{BoothError, BoothResult},
    },
    render::{FrameRGBA, surface::CompositeSurface},
};

/// Default export resolution relative to the canvas' logical size. `BoothConfig` starts from it.
pub const EXPORT_MULTIPLIER: u32 = 2;

/// Encoded PNG ready to hand to a download or share collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub png: Vec<u8>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug)]
pub struct Exporter {
    multiplier: u32,
    filename_prefix: String,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::from_config(&BoothConfig::default())
    }
}

impl Exporter {
    pub fn from_config(cfg: &BoothConfig) -> Self {
        Self {
            multiplier: cfg.export_multiplier.max(1),
            filename_prefix: cfg.filename_prefix.clone(),
        }
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Render `surface` at the export multiplier and encode it.
    ///
    /// `preview_ready` is the owner's readiness flag; exporting before it is set is rejected
    /// rather than producing a blank or partial image.
    #[tracing::instrument(skip(self, surface), fields(serial = surface.serial()))]
    pub fn export(
        &self,
        surface: &CompositeSurface,
        preview_ready: bool,
    ) -> BoothResult<ExportArtifact> {
        if surface.is_disposed() {
            return Err(BoothError::export_precondition("surface is disposed"));
        }
        if !preview_ready {
            return Err(BoothError::export_precondition(
                "preview is not ready; place at least one photo first",
            ));
        }

        let frame = surface.render(self.multiplier)?;
        let png = encode_png(&frame)?;
        let artifact = ExportArtifact {
            png,
            filename: self.filename_at(Utc::now()),
            width: frame.width,
            height: frame.height,
        };
        tracing::info!(
            filename = %artifact.filename,
            width = artifact.width,
            height = artifact.height,
            bytes = artifact.png.len(),
            "composite exported"
        );
        Ok(artifact)
    }

    /// `<prefix>-<ISO-8601 UTC timestamp>.png` with `:` and `.` replaced so the name is
    /// filesystem-safe.
    pub fn filename_at(&self, at: DateTime<Utc>) -> String {
        let stamp = at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        format!("{}-{stamp}.png", self.filename_prefix)
    }
}

/// Encode a frame as straight-alpha RGBA PNG.
pub fn encode_png(frame: &FrameRGBA) -> BoothResult<Vec<u8>> {
    let mut straight = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_in_place(&mut straight);
    }
    let img = image::RgbaImage::from_raw(frame.width, frame.height, straight)
        .ok_or_else(|| BoothError::render("invalid rgba buffer size"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}
