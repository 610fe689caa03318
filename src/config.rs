use std::{io::Read, path::PathBuf, time::Duration};

use anyhow::Context;

use crate::{
    export::EXPORT_MULTIPLIER,
    foundation::error::{BoothError, BoothResult},
};

/// Runtime knobs for loading, compositing and export.
///
/// Every field has a default, so an empty JSON object (`{}`) is a valid config.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoothConfig {
    /// Directory that static asset paths (`/templates/...`) resolve under.
    pub asset_root: PathBuf,
    /// Per-image decode budget.
    pub load_timeout_ms: u64,
    /// Budget for a full surface initialization (background + photos).
    pub init_timeout_ms: u64,
    /// Budget for re-placing photos on an existing surface.
    pub update_timeout_ms: u64,
    /// Export resolution relative to the canvas' logical size.
    pub export_multiplier: u32,
    pub filename_prefix: String,
    /// Canvas clear colour, straight RGBA8.
    pub clear_rgba: [u8; 4],
    /// Fill used when the template background cannot be loaded.
    pub fallback_rgba: [u8; 4],
    /// Optional caption drawn on top of the fallback fill.
    pub fallback_label: Option<String>,
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("public"),
            load_timeout_ms: 10_000,
            init_timeout_ms: 15_000,
            update_timeout_ms: 10_000,
            export_multiplier: EXPORT_MULTIPLIER,
            filename_prefix: "photobooth".to_string(),
            clear_rgba: [255, 255, 255, 255],
            fallback_rgba: [243, 244, 246, 255],
            fallback_label: None,
        }
    }
}

impl BoothConfig {
    pub fn from_reader(r: impl Read) -> BoothResult<Self> {
        let cfg: BoothConfig = serde_json::from_reader(r).context("parse booth config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> BoothResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Apply `PHOTOBOOTH_*` environment overrides. Unparseable or zero values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|&n| n > 0)
        };

        if let Some(root) = lookup("PHOTOBOOTH_ASSET_ROOT").filter(|v| !v.is_empty()) {
            self.asset_root = PathBuf::from(root);
        }
        if let Some(ms) = millis("PHOTOBOOTH_LOAD_TIMEOUT_MS") {
            self.load_timeout_ms = ms;
        }
        if let Some(ms) = millis("PHOTOBOOTH_INIT_TIMEOUT_MS") {
            self.init_timeout_ms = ms;
        }
        if let Some(ms) = millis("PHOTOBOOTH_UPDATE_TIMEOUT_MS") {
            self.update_timeout_ms = ms;
        }
        self
    }

    pub fn validate(&self) -> BoothResult<()> {
        if self.load_timeout_ms == 0 || self.init_timeout_ms == 0 || self.update_timeout_ms == 0 {
            return Err(BoothError::validation("timeouts must be > 0 ms"));
        }
        if self.export_multiplier == 0 {
            return Err(BoothError::validation("export_multiplier must be >= 1"));
        }
        if self.filename_prefix.trim().is_empty() {
            return Err(BoothError::validation("filename_prefix must be non-empty"));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }
}
