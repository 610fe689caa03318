use std::sync::{
    Arc, Mutex as StdMutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::{Mutex, watch};

use crate::{
    assets::{
        loader::{ImageLoader, with_timeout},
        source::ImageSource,
    },
    catalog::{TemplateCatalog, TemplateDefinition, TemplateId},
    compose::{PlacedLayer, compositor::SlotCompositor},
    config::BoothConfig,
    export::{ExportArtifact, Exporter},
    foundation::{
        core::CanvasSize,
        error::{BoothError, BoothResult},
    },
    lifecycle::state::{CanvasStatus, LifecycleState},
    render::{RenderSettings, surface::CompositeSurface},
};

pub(crate) mod display;
pub(crate) mod state;

/// Latest inputs from the UI. Written when a request is issued, read when it runs.
#[derive(Debug, Default)]
struct Intent {
    template: Option<TemplateId>,
    photos: Vec<ImageSource>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Request {
    Reconcile,
    Refresh,
    Teardown,
}

#[derive(Debug, Default)]
struct Inner {
    state: LifecycleState,
    /// Template the surface belongs to, or is being built for.
    template: Option<TemplateId>,
    surface: Option<CompositeSurface>,
    applied_photos: Vec<ImageSource>,
    preview_ready: bool,
    last_error: Option<String>,
}

/// Owns the composite surface for the selected template and keeps it in sync with the
/// selected photos.
///
/// Each request bumps a generation counter as soon as it is issued, then waits its turn on an
/// async mutex. Only the newest generation may commit; an older request that finishes late
/// returns [`BoothError::Superseded`] and its work is dropped. Requests always apply the most
/// recent inputs, so a superseded request's intent is carried by the one that replaced it.
pub struct CanvasManager {
    catalog: Arc<TemplateCatalog>,
    loader: ImageLoader,
    compositor: SlotCompositor,
    exporter: Exporter,
    config: BoothConfig,
    generation: AtomicU64,
    next_serial: AtomicU64,
    intent: StdMutex<Intent>,
    inner: Mutex<Inner>,
    status: watch::Sender<CanvasStatus>,
}

impl std::fmt::Debug for CanvasManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasManager")
            .field("templates", &self.catalog.ids())
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl CanvasManager {
    pub fn new(catalog: Arc<TemplateCatalog>) -> Self {
        Self::with_config(catalog, BoothConfig::default())
    }

    pub fn with_config(catalog: Arc<TemplateCatalog>, config: BoothConfig) -> Self {
        let (status, _) = watch::channel(CanvasStatus::default());
        Self {
            loader: ImageLoader::from_config(&config),
            compositor: SlotCompositor::from_config(&config),
            exporter: Exporter::from_config(&config),
            catalog,
            config,
            generation: AtomicU64::new(0),
            next_serial: AtomicU64::new(0),
            intent: StdMutex::new(Intent::default()),
            inner: Mutex::new(Inner::default()),
            status,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &BoothConfig {
        &self.config
    }

    pub fn status(&self) -> CanvasStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published status change.
    pub fn subscribe(&self) -> watch::Receiver<CanvasStatus> {
        self.status.subscribe()
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.status.borrow().canvas_size
    }

    pub async fn placed_slots(&self) -> Vec<usize> {
        let inner = self.inner.lock().await;
        if !inner.state.has_surface() {
            return Vec::new();
        }
        inner
            .surface
            .as_ref()
            .map(CompositeSurface::placed_slots)
            .unwrap_or_default()
    }

    /// Select (or with `None`, deselect) the active template.
    ///
    /// An unknown id leaves the manager `Empty` so the UI shows its placeholder, and returns
    /// [`BoothError::TemplateNotFound`].
    pub async fn select_template(&self, id: Option<TemplateId>) -> BoothResult<CanvasStatus> {
        self.update_intent(|intent| intent.template = id);
        self.run(Request::Reconcile).await
    }

    /// Replace the ordered photo set. Photos beyond the template's slot count are ignored.
    pub async fn set_photos(&self, photos: Vec<ImageSource>) -> BoothResult<CanvasStatus> {
        self.update_intent(|intent| intent.photos = photos);
        self.run(Request::Reconcile).await
    }

    /// Rebuild the surface from scratch with the current template and photos.
    pub async fn refresh(&self) -> BoothResult<CanvasStatus> {
        self.run(Request::Refresh).await
    }

    /// Release the surface. Safe to call any number of times.
    pub async fn teardown(&self) -> BoothResult<CanvasStatus> {
        self.update_intent(|intent| intent.template = None);
        self.run(Request::Teardown).await
    }

    /// Encode the current composite at the export multiplier.
    ///
    /// Rejected with [`BoothError::ExportPrecondition`] unless the surface is `Ready` with at
    /// least one photo placed, and while a request is still being applied.
    pub fn export(&self) -> BoothResult<ExportArtifact> {
        let inner = self
            .inner
            .try_lock()
            .map_err(|_| BoothError::export_precondition("canvas is busy"))?;
        if inner.state != LifecycleState::Ready {
            return Err(BoothError::export_precondition(format!(
                "canvas is {}, not ready",
                inner.state
            )));
        }
        let surface = inner
            .surface
            .as_ref()
            .ok_or_else(|| BoothError::export_precondition("no surface"))?;
        self.exporter.export(surface, inner.preview_ready)
    }

    fn update_intent(&self, f: impl FnOnce(&mut Intent)) {
        let mut intent = self.intent.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut intent);
    }

    fn snapshot_intent(&self) -> (Option<TemplateId>, Vec<ImageSource>) {
        let intent = self.intent.lock().unwrap_or_else(PoisonError::into_inner);
        (intent.template, intent.photos.clone())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn ensure_current(&self, generation: u64) -> BoothResult<()> {
        if self.is_current(generation) {
            Ok(())
        } else {
            tracing::warn!(generation, "stale request discarded");
            Err(BoothError::Superseded { generation })
        }
    }

    async fn run(&self, request: Request) -> BoothResult<CanvasStatus> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_modify(|s| {
            s.generation = s.generation.max(generation);
            s.is_generating = true;
        });

        let mut inner = self.inner.lock().await;
        self.ensure_current(generation)?;

        match self.apply(&mut inner, request, generation).await {
            Ok(()) => {
                self.publish(&inner, generation);
                Ok(self.status())
            }
            Err(err @ BoothError::Superseded { .. }) => Err(err),
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!(
                        %err,
                        state = %inner.state,
                        "request failed; a refresh can recover"
                    );
                } else {
                    tracing::error!(%err, state = %inner.state, "request failed");
                }
                inner.last_error = Some(err.to_string());
                self.publish(&inner, generation);
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self, inner), fields(state = %inner.state))]
    async fn apply(&self, inner: &mut Inner, request: Request, generation: u64) -> BoothResult<()> {
        if request == Request::Teardown {
            self.dispose_surface(inner);
            inner.state = LifecycleState::Disposed;
            return Ok(());
        }

        let (template_id, photos) = self.snapshot_intent();
        let Some(template_id) = template_id else {
            if self.dispose_surface(inner) {
                inner.state = LifecycleState::Disposed;
            } else if inner.state != LifecycleState::Disposed {
                inner.state = LifecycleState::Empty;
            }
            return Ok(());
        };

        let template = match self.catalog.lookup(template_id) {
            Ok(t) => t,
            Err(err) => {
                self.dispose_surface(inner);
                inner.state = LifecycleState::Empty;
                tracing::warn!(%err, "showing placeholder");
                return Err(err);
            }
        };

        let live_template = inner
            .surface
            .as_ref()
            .filter(|s| inner.state.has_surface() && !s.is_disposed())
            .map(CompositeSurface::template_id);
        if request == Request::Refresh || live_template != Some(template_id) {
            self.initialize(inner, template, photos, generation).await
        } else if inner.applied_photos != photos {
            self.update_photos(inner, template, photos, generation).await
        } else {
            inner.last_error = None;
            Ok(())
        }
    }

    /// Dispose whatever surface exists, then build a fresh one for `template`.
    async fn initialize(
        &self,
        inner: &mut Inner,
        template: &TemplateDefinition,
        photos: Vec<ImageSource>,
        generation: u64,
    ) -> BoothResult<()> {
        self.dispose_surface(inner);
        inner.state = LifecycleState::Initializing;
        inner.template = Some(template.id);
        self.publish(inner, generation);

        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst) + 1;
        let mut surface = CompositeSurface::new(
            serial,
            template.id,
            template.canvas_size(),
            RenderSettings {
                clear_rgba: self.config.clear_rgba,
            },
        );

        let limit = self.config.init_timeout();
        let composed = with_timeout(
            limit,
            async {
                Ok(self
                    .compositor
                    .compose_template(&self.loader, template, &photos, self.config.load_timeout())
                    .await)
            },
            || BoothError::InitializationTimeout {
                timeout_ms: self.config.init_timeout_ms,
            },
        )
        .await;

        let (layers, report) = match composed {
            Ok(composed) => composed,
            Err(err) => {
                surface.dispose();
                inner.state = LifecycleState::Empty;
                tracing::warn!(%err, template = template.id, "initialization abandoned");
                return Err(err);
            }
        };

        if let Err(err) = self.ensure_current(generation) {
            surface.dispose();
            return Err(err);
        }

        let mut layers = layers.into_iter();
        if let Some(background) = layers.next() {
            surface.set_background(background)?;
        }
        surface.replace_photos(layers.collect())?;

        inner.preview_ready = surface.has_photos();
        inner.state = LifecycleState::Ready;
        inner.applied_photos = photos;
        inner.last_error = None;
        tracing::info!(
            template = template.id,
            serial,
            placed = ?surface.placed_slots(),
            failed = ?report.failed_slots(),
            background_fallback = report.background_fallback,
            "surface ready"
        );
        inner.surface = Some(surface);
        Ok(())
    }

    /// Swap the photo layers of the live surface, keeping its background.
    async fn update_photos(
        &self,
        inner: &mut Inner,
        template: &TemplateDefinition,
        photos: Vec<ImageSource>,
        generation: u64,
    ) -> BoothResult<()> {
        inner.state = LifecycleState::Updating;
        self.publish(inner, generation);

        let limit = self.config.update_timeout();
        let composed: BoothResult<(Vec<PlacedLayer>, _)> = with_timeout(
            limit,
            async {
                Ok(self
                    .compositor
                    .compose_photos(&self.loader, template, &photos, self.config.load_timeout())
                    .await)
            },
            || BoothError::UpdateTimeout {
                timeout_ms: self.config.update_timeout_ms,
            },
        )
        .await;

        // The surface was not touched yet, so it still shows the previous photo set.
        inner.state = LifecycleState::Ready;
        let (layers, report) = match composed {
            Ok(composed) => composed,
            Err(err) => {
                inner.preview_ready = false;
                tracing::warn!(%err, template = template.id, "photo update abandoned");
                return Err(err);
            }
        };
        self.ensure_current(generation)?;

        let Some(surface) = inner.surface.as_mut() else {
            return Err(BoothError::render("live surface vanished during update"));
        };
        if layers.is_empty() {
            let removed = surface.remove_above_background();
            tracing::debug!(removed, "photo layers cleared");
        } else {
            surface.replace_photos(layers)?;
        }

        inner.preview_ready = surface.has_photos();
        inner.applied_photos = photos;
        inner.last_error = None;
        tracing::info!(
            template = template.id,
            placed = ?surface.placed_slots(),
            failed = ?report.failed_slots(),
            "photos updated"
        );
        Ok(())
    }

    /// Returns whether a live surface was released.
    fn dispose_surface(&self, inner: &mut Inner) -> bool {
        inner.template = None;
        inner.preview_ready = false;
        inner.applied_photos.clear();
        match inner.surface.take() {
            Some(mut surface) => surface.dispose(),
            None => false,
        }
    }

    fn publish(&self, inner: &Inner, generation: u64) {
        let template_id = match inner.state {
            LifecycleState::Empty | LifecycleState::Disposed => None,
            _ => inner.template,
        };
        let canvas_size = template_id
            .and_then(|id| self.catalog.lookup(id).ok())
            .map_or(CanvasSize::PLACEHOLDER, TemplateDefinition::canvas_size);
        let settled = self.is_current(generation) && !inner.state.is_busy();

        self.status.send_modify(|s| {
            s.state = inner.state;
            s.template_id = template_id;
            s.preview_ready = inner.preview_ready;
            s.canvas_size = canvas_size;
            s.surface_serial = inner.surface.as_ref().map(CompositeSurface::serial);
            s.last_error = inner.last_error.clone();
            if settled {
                s.is_generating = false;
            }
        });
    }
}
