use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    assets::{DecodedImage, decode::decode_any, source::ImageSource},
    config::BoothConfig,
    foundation::error::{BoothError, BoothResult},
};

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Race `fut` against `limit`; on expiry the error comes from `on_elapsed`.
///
/// The inner future is dropped on timeout. Work already handed to a blocking thread keeps running
/// and its result is discarded.
pub async fn with_timeout<T, F>(
    limit: Duration,
    fut: F,
    on_elapsed: impl FnOnce() -> BoothError,
) -> BoothResult<T>
where
    F: Future<Output = BoothResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(on_elapsed()),
    }
}

/// Loads and decodes images from static paths or inline data.
///
/// No caching: each call reads and decodes independently. No retries either; callers decide.
#[derive(Clone, Debug)]
pub struct ImageLoader {
    asset_root: PathBuf,
}

impl ImageLoader {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn from_config(cfg: &BoothConfig) -> Self {
        Self::new(cfg.asset_root.clone())
    }

    pub fn asset_root(&self) -> &std::path::Path {
        &self.asset_root
    }

    /// Resolve once the image is decoded and its dimensions are known.
    ///
    /// Fails with [`BoothError::LoadTimeout`] past `timeout`, or [`BoothError::DecodeFailure`]
    /// when the bytes cannot be read or decoded.
    #[tracing::instrument(skip(self, source), fields(source = %source))]
    pub async fn load(&self, source: &ImageSource, timeout: Duration) -> BoothResult<DecodedImage> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let decoded = with_timeout(timeout, self.read_and_decode(source), || {
            BoothError::LoadTimeout {
                source_ref: source.to_string(),
                timeout_ms,
            }
        })
        .await?;

        let (w, h) = decoded.dimensions();
        tracing::debug!(width = w, height = h, svg = decoded.is_svg(), "image decoded");
        Ok(decoded)
    }

    /// Parse `reference` (path or `data:` URI) and load it.
    pub async fn load_ref(&self, reference: &str, timeout: Duration) -> BoothResult<DecodedImage> {
        let source = ImageSource::parse(reference)?;
        self.load(&source, timeout).await
    }

    async fn read_and_decode(&self, source: &ImageSource) -> BoothResult<DecodedImage> {
        let svg_hint = source.is_svg_hint();
        let bytes = match source {
            ImageSource::Static(rel) => {
                let path = self.asset_root.join(rel);
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    BoothError::decode(format!("read asset '{}': {e}", path.display()))
                })?;
                Arc::new(bytes)
            }
            ImageSource::Inline { bytes, .. } => Arc::clone(bytes),
        };

        tokio::task::spawn_blocking(move || decode_any(&bytes, svg_hint))
            .await
            .map_err(|e| BoothError::decode(format!("decode task failed: {e}")))?
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::from_config(&BoothConfig::default())
    }
}
