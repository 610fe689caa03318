pub type BoothResult<T> = Result<T, BoothError>;

#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    #[error("template not found: {0}")]
    TemplateNotFound(u32),

    #[error("asset load error: '{source_ref}': {reason}")]
    AssetLoad { source_ref: String, reason: String },

    #[error("photo load error: photo {index}: {reason}")]
    PhotoLoad { index: usize, reason: String },

    #[error("load timeout: '{source_ref}' did not decode within {timeout_ms} ms")]
    LoadTimeout { source_ref: String, timeout_ms: u64 },

    #[error("decode failure: {0}")]
    DecodeFailure(String),

    #[error("initialization timeout: surface not ready after {timeout_ms} ms")]
    InitializationTimeout { timeout_ms: u64 },

    #[error("update timeout: photo update not applied after {timeout_ms} ms")]
    UpdateTimeout { timeout_ms: u64 },

    #[error("export precondition: {0}")]
    ExportPrecondition(String),

    #[error("superseded: generation {generation} was replaced by a newer request")]
    Superseded { generation: u64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoothError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn export_precondition(msg: impl Into<String>) -> Self {
        Self::ExportPrecondition(msg.into())
    }

    /// Timeouts and superseded requests leave the manager in a usable state; a later
    /// `refresh` or newer request can recover from them.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LoadTimeout { .. }
                | Self::InitializationTimeout { .. }
                | Self::UpdateTimeout { .. }
                | Self::Superseded { .. }
        )
    }
}
