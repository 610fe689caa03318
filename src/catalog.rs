//! Fixed catalog of frame templates.
//!
//! Templates are defined once at process start (built-in or from JSON) and are read-only
//! afterwards. Slot order defines which photo index lands in which slot.

use std::{collections::BTreeMap, io::Read};

use anyhow::Context;

use crate::foundation::{
    core::{CanvasSize, SlotRect},
    error::{BoothError, BoothResult},
};

pub type TemplateId = u32;

/// Upper bound on slots per template.
pub const MAX_SLOTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDefinition {
    pub id: TemplateId,
    pub display_name: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Static asset path (raster or SVG) of the frame artwork.
    pub background: String,
    pub slots: Vec<SlotRect>,
}

impl TemplateDefinition {
    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize {
            width: self.canvas_width,
            height: self.canvas_height,
        }
    }

    pub fn max_photos(&self) -> usize {
        self.slots.len()
    }

    pub fn validate(&self) -> BoothResult<()> {
        let canvas = CanvasSize::new(self.canvas_width, self.canvas_height)
            .map_err(|e| BoothError::validation(format!("template {}: {e}", self.id)))?;

        if self.slots.is_empty() || self.slots.len() > MAX_SLOTS {
            return Err(BoothError::validation(format!(
                "template {} must define 1..={MAX_SLOTS} slots, got {}",
                self.id,
                self.slots.len()
            )));
        }
        if self.background.trim().is_empty() {
            return Err(BoothError::validation(format!(
                "template {} has an empty background reference",
                self.id
            )));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.width == 0 || slot.height == 0 {
                return Err(BoothError::validation(format!(
                    "template {} slot {i} has zero size",
                    self.id
                )));
            }
            if !slot.fits_within(canvas) {
                return Err(BoothError::validation(format!(
                    "template {} slot {i} exceeds the {}x{} canvas",
                    self.id, canvas.width, canvas.height
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct TemplateCatalog {
    templates: BTreeMap<TemplateId, TemplateDefinition>,
}

impl TemplateCatalog {
    pub fn from_definitions(
        defs: impl IntoIterator<Item = TemplateDefinition>,
    ) -> BoothResult<Self> {
        let mut templates = BTreeMap::new();
        for def in defs {
            def.validate()?;
            let id = def.id;
            if templates.insert(id, def).is_some() {
                return Err(BoothError::validation(format!(
                    "duplicate template id {id}"
                )));
            }
        }
        if templates.is_empty() {
            return Err(BoothError::validation("catalog must contain a template"));
        }
        Ok(Self { templates })
    }

    /// Parse a JSON array of [`TemplateDefinition`]s.
    pub fn from_reader(r: impl Read) -> BoothResult<Self> {
        let defs: Vec<TemplateDefinition> =
            serde_json::from_reader(r).context("parse template catalog JSON")?;
        Self::from_definitions(defs)
    }

    pub fn builtin() -> Self {
        Self {
            templates: builtin_templates()
                .into_iter()
                .map(|t| (t.id, t))
                .collect(),
        }
    }

    pub fn lookup(&self, id: TemplateId) -> BoothResult<&TemplateDefinition> {
        self.templates
            .get(&id)
            .ok_or(BoothError::TemplateNotFound(id))
    }

    pub fn ids(&self) -> Vec<TemplateId> {
        self.templates.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateDefinition> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_templates() -> Vec<TemplateDefinition> {
    vec![
        TemplateDefinition {
            id: 1,
            display_name: "3 Slot Horizontal".to_string(),
            canvas_width: 800,
            canvas_height: 400,
            background: "/templates/3grid.svg".to_string(),
            slots: vec![
                SlotRect::new(50, 100, 200, 150),
                SlotRect::new(270, 100, 200, 150),
                SlotRect::new(490, 100, 200, 150),
            ],
        },
        TemplateDefinition {
            id: 2,
            display_name: "2 Slot Vertikal".to_string(),
            canvas_width: 400,
            canvas_height: 600,
            background: "/templates/2grid-vertical.svg".to_string(),
            slots: vec![
                SlotRect::new(100, 50, 200, 150),
                SlotRect::new(100, 220, 200, 150),
            ],
        },
        TemplateDefinition {
            id: 3,
            display_name: "Single Frame".to_string(),
            canvas_width: 500,
            canvas_height: 400,
            background: "/templates/single-frame.svg".to_string(),
            slots: vec![SlotRect::new(100, 100, 300, 200)],
        },
        // 9:16 story strip; slots sit at 15% / 70% width, 15%, 39%, 63% height.
        TemplateDefinition {
            id: 4,
            display_name: "3 Slot Story".to_string(),
            canvas_width: 1080,
            canvas_height: 1920,
            background: "/templates/3slot-story.svg".to_string(),
            slots: vec![
                SlotRect::new(162, 288, 756, 422),
                SlotRect::new(162, 749, 756, 422),
                SlotRect::new(162, 1210, 756, 422),
            ],
        },
    ]
}
