use crate::{catalog::TemplateId, foundation::core::CanvasSize};

/// Where the canvas manager is in its surface lifecycle.
///
/// `Empty -> Initializing -> Ready -> (Updating -> Ready)* -> Disposed`. A failed initialization
/// falls back to `Empty`; selecting a template again from `Disposed` starts a new cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    #[default]
    Empty,
    Initializing,
    Ready,
    Updating,
    Disposed,
}

impl LifecycleState {
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Initializing | Self::Updating)
    }

    pub fn has_surface(self) -> bool {
        matches!(self, Self::Ready | Self::Updating)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Updating => "updating",
            Self::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

/// Snapshot published to observers after every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasStatus {
    pub state: LifecycleState,
    pub template_id: Option<TemplateId>,
    /// At least one photo is placed on a ready surface; gates export.
    pub preview_ready: bool,
    /// A request has been issued and not yet settled.
    pub is_generating: bool,
    /// Active template's canvas, or the 400x400 placeholder when none is selected.
    pub canvas_size: CanvasSize,
    pub generation: u64,
    pub surface_serial: Option<u64>,
    pub last_error: Option<String>,
}

impl Default for CanvasStatus {
    fn default() -> Self {
        Self {
            state: LifecycleState::Empty,
            template_id: None,
            preview_ready: false,
            is_generating: false,
            canvas_size: CanvasSize::PLACEHOLDER,
            generation: 0,
            surface_serial: None,
            last_error: None,
        }
    }
}

impl CanvasStatus {
    pub fn can_export(&self) -> bool {
        self.state == LifecycleState::Ready && self.preview_ready
    }
}
