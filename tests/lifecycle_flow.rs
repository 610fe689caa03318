use std::{io::Cursor, sync::Arc};

use base64::Engine as _;
use photobooth::{
    BoothConfig, BoothError, CanvasManager, CanvasSize, ImageSource, LifecycleState,
    TemplateCatalog,
};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "photobooth_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn photo(w: u32, h: u32, rgba: [u8; 4]) -> ImageSource {
    let uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(w, h, rgba))
    );
    ImageSource::parse(&uri).unwrap()
}

fn photos(n: usize) -> Vec<ImageSource> {
    (0..n)
        .map(|i| photo(40, 30, [200, (i * 60) as u8, 10, 255]))
        .collect()
}

/// Large enough that decoding takes well over a millisecond.
fn large_photos(n: usize) -> Vec<ImageSource> {
    (0..n)
        .map(|i| photo(2400, 1800, [20, 90, (i * 70) as u8, 255]))
        .collect()
}

fn manager_with_timeouts(
    name: &str,
    init_timeout_ms: u64,
    update_timeout_ms: u64,
) -> CanvasManager {
    let cfg = BoothConfig {
        asset_root: temp_dir(name),
        init_timeout_ms,
        update_timeout_ms,
        ..BoothConfig::default()
    };
    CanvasManager::with_config(Arc::new(TemplateCatalog::builtin()), cfg)
}

/// Manager whose asset root holds the given files; templates without artwork use the fallback.
fn manager_with_assets(name: &str, files: &[(&str, Vec<u8>)]) -> CanvasManager {
    let root = temp_dir(name);
    std::fs::create_dir_all(&root).unwrap();
    for (rel, bytes) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }
    let cfg = BoothConfig {
        asset_root: root,
        ..BoothConfig::default()
    };
    CanvasManager::with_config(Arc::new(TemplateCatalog::builtin()), cfg)
}

fn manager(name: &str) -> CanvasManager {
    manager_with_assets(name, &[])
}

#[tokio::test]
async fn story_template_with_three_photos_exports_at_double_size() {
    let m = manager("lifecycle_scenario_a");
    m.set_photos(photos(3)).await.unwrap();
    let status = m.select_template(Some(4)).await.unwrap();

    assert_eq!(status.state, LifecycleState::Ready);
    assert!(status.preview_ready);
    assert!(!status.is_generating);
    assert_eq!(status.canvas_size, CanvasSize::new(1080, 1920).unwrap());
    assert_eq!(m.placed_slots().await, vec![0, 1, 2]);

    let artifact = m.export().unwrap();
    assert_eq!((artifact.width, artifact.height), (2160, 3840));
    assert!(artifact.filename.starts_with("photobooth-"));
    assert!(artifact.filename.ends_with(".png"));
    assert!(!artifact.filename.contains(':'));

    let decoded = image::load_from_memory(&artifact.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (2160, 3840));
}

#[tokio::test]
async fn template_without_photos_is_ready_but_not_exportable() {
    let m = manager("lifecycle_scenario_b");
    let status = m.select_template(Some(1)).await.unwrap();
    assert_eq!(status.state, LifecycleState::Ready);
    assert!(!status.preview_ready);

    let err = m.export().unwrap_err();
    assert!(matches!(err, BoothError::ExportPrecondition(_)));
    assert!(err.to_string().starts_with("export precondition:"));
}

#[tokio::test]
async fn switching_template_recreates_surface_and_drops_extra_photos() {
    let m = manager("lifecycle_scenario_c");
    m.select_template(Some(1)).await.unwrap();
    let first = m.set_photos(photos(3)).await.unwrap();
    assert_eq!(m.placed_slots().await, vec![0, 1, 2]);

    let second = m.select_template(Some(2)).await.unwrap();
    assert_ne!(first.surface_serial, second.surface_serial);
    assert_eq!(second.template_id, Some(2));
    assert_eq!(second.canvas_size, CanvasSize::new(400, 600).unwrap());
    assert!(second.preview_ready);
    assert_eq!(m.placed_slots().await, vec![0, 1]);
}

#[tokio::test]
async fn photo_updates_keep_the_surface() {
    let m = manager("lifecycle_update_in_place");
    let first = m.select_template(Some(1)).await.unwrap();
    let updated = m.set_photos(photos(2)).await.unwrap();
    assert_eq!(first.surface_serial, updated.surface_serial);
    assert_eq!(updated.state, LifecycleState::Ready);
    assert_eq!(m.placed_slots().await, vec![0, 1]);

    let cleared = m.set_photos(Vec::new()).await.unwrap();
    assert_eq!(cleared.state, LifecycleState::Ready);
    assert!(!cleared.preview_ready);
    assert!(m.placed_slots().await.is_empty());
    assert!(matches!(m.export(), Err(BoothError::ExportPrecondition(_))));
}

#[tokio::test]
async fn refresh_twice_renders_identical_pixels() {
    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="500" height="400"><rect width="500" height="400" fill="#ffcc00"/><circle cx="250" cy="60" r="40" fill="#333333"/></svg>"##;
    let m = manager_with_assets("lifecycle_refresh_idempotent", &[(
        "templates/single-frame.svg",
        svg.to_vec(),
    )]);
    m.select_template(Some(3)).await.unwrap();
    m.set_photos(vec![photo(64, 48, [0, 120, 255, 255])])
        .await
        .unwrap();

    let a = m.refresh().await.unwrap();
    let png_a = m.export().unwrap().png;
    let b = m.refresh().await.unwrap();
    let png_b = m.export().unwrap().png;

    assert_ne!(a.surface_serial, b.surface_serial);
    assert!(b.preview_ready);
    let pixels_a = image::load_from_memory(&png_a).unwrap().to_rgba8();
    let pixels_b = image::load_from_memory(&png_b).unwrap().to_rgba8();
    assert_eq!(pixels_a.dimensions(), (1000, 800));
    assert_eq!(pixels_a, pixels_b);
    // Artwork rendered, not the fallback fill.
    let corner = pixels_a.get_pixel(4, 4).0;
    assert!(corner[0] >= 250 && corner[1].abs_diff(0xcc) <= 2 && corner[2] <= 2);
}

#[tokio::test]
async fn older_request_finishing_late_is_superseded() {
    init_tracing();
    let m = manager_with_assets("lifecycle_superseded", &[
        ("photos/a0.png", png_bytes(30, 20, [255, 0, 0, 255])),
        ("photos/a1.png", png_bytes(30, 20, [255, 0, 0, 255])),
        ("photos/b0.png", png_bytes(30, 20, [0, 0, 255, 255])),
    ]);
    m.select_template(Some(1)).await.unwrap();

    let older = vec![
        ImageSource::parse("/photos/a0.png").unwrap(),
        ImageSource::parse("/photos/a1.png").unwrap(),
    ];
    let newer = vec![ImageSource::parse("/photos/b0.png").unwrap()];

    let (first, second) = tokio::join!(m.set_photos(older), m.set_photos(newer));

    assert!(matches!(first, Err(BoothError::Superseded { .. })));
    let status = second.unwrap();
    assert_eq!(status.state, LifecycleState::Ready);
    assert!(!status.is_generating);
    assert_eq!(m.placed_slots().await, vec![0]);
}

#[tokio::test]
async fn unknown_template_shows_placeholder_and_recovers() {
    let m = manager("lifecycle_unknown_template");
    m.select_template(Some(2)).await.unwrap();

    let err = m.select_template(Some(42)).await.unwrap_err();
    assert!(matches!(err, BoothError::TemplateNotFound(42)));
    let status = m.status();
    assert_eq!(status.state, LifecycleState::Empty);
    assert_eq!(status.surface_serial, None);
    assert_eq!(m.canvas_size(), CanvasSize::PLACEHOLDER);

    let status = m.select_template(Some(2)).await.unwrap();
    assert_eq!(status.state, LifecycleState::Ready);
    assert_eq!(status.last_error, None);
}

#[tokio::test]
async fn teardown_is_idempotent_and_blocks_export() {
    let m = manager("lifecycle_teardown");
    m.set_photos(photos(1)).await.unwrap();
    m.select_template(Some(3)).await.unwrap();
    assert!(m.export().is_ok());

    let status = m.teardown().await.unwrap();
    assert_eq!(status.state, LifecycleState::Disposed);
    assert_eq!(status.template_id, None);
    let status = m.teardown().await.unwrap();
    assert_eq!(status.state, LifecycleState::Disposed);
    assert!(matches!(m.export(), Err(BoothError::ExportPrecondition(_))));

    // Selecting again starts a fresh cycle.
    let status = m.select_template(Some(3)).await.unwrap();
    assert_eq!(status.state, LifecycleState::Ready);
    assert!(status.preview_ready);
}

#[tokio::test]
async fn observers_see_ready_state() {
    let m = manager("lifecycle_watch");
    let mut rx = m.subscribe();
    m.select_template(Some(1)).await.unwrap();

    rx.changed().await.unwrap();
    let seen = rx.borrow_and_update().clone();
    assert_eq!(seen.state, LifecycleState::Ready);
    assert_eq!(seen.template_id, Some(1));
    assert_eq!(seen.canvas_size, CanvasSize::new(800, 400).unwrap());
}

#[tokio::test]
async fn initialization_past_budget_leaves_canvas_empty_until_refresh() {
    init_tracing();
    let m = manager_with_timeouts("lifecycle_init_timeout", 1, 10_000);
    m.set_photos(large_photos(3)).await.unwrap();

    let err = m.select_template(Some(1)).await.unwrap_err();
    assert!(matches!(err, BoothError::InitializationTimeout { timeout_ms: 1 }));
    assert!(err.is_transient());
    let status = m.status();
    assert_eq!(status.state, LifecycleState::Empty);
    assert!(!status.is_generating);
    assert!(!status.preview_ready);
    assert_eq!(status.surface_serial, None);
    assert_eq!(status.canvas_size, CanvasSize::PLACEHOLDER);
    assert!(status.last_error.unwrap().starts_with("initialization timeout"));
    assert!(matches!(m.export(), Err(BoothError::ExportPrecondition(_))));

    // A frozen clock does not move while decode work is pending, so the rebuild fits in 1 ms.
    tokio::time::pause();
    let status = m.refresh().await.unwrap();
    assert_eq!(status.state, LifecycleState::Ready);
    assert_eq!(status.template_id, Some(1));
    assert!(status.preview_ready);
    assert!(!status.is_generating);
    assert_eq!(status.last_error, None);
    assert_eq!(m.placed_slots().await, vec![0, 1, 2]);
}

#[tokio::test]
async fn photo_update_past_budget_keeps_surface_until_refresh() {
    init_tracing();
    let m = manager_with_timeouts("lifecycle_update_timeout", 15_000, 1);
    m.set_photos(photos(1)).await.unwrap();
    let before = m.select_template(Some(1)).await.unwrap();
    assert!(before.preview_ready);

    let err = m.set_photos(large_photos(3)).await.unwrap_err();
    assert!(matches!(err, BoothError::UpdateTimeout { timeout_ms: 1 }));
    assert!(err.is_transient());
    let status = m.status();
    assert_eq!(status.state, LifecycleState::Ready);
    assert!(!status.preview_ready);
    assert!(!status.is_generating);
    assert_eq!(status.surface_serial, before.surface_serial);
    assert!(status.last_error.unwrap().starts_with("update timeout"));
    assert!(matches!(m.export(), Err(BoothError::ExportPrecondition(_))));

    // Refresh rebuilds under the init budget and applies the pending photos.
    let status = m.refresh().await.unwrap();
    assert_eq!(status.state, LifecycleState::Ready);
    assert!(status.preview_ready);
    assert!(!status.is_generating);
    assert_ne!(status.surface_serial, before.surface_serial);
    assert_eq!(status.last_error, None);
    assert_eq!(m.placed_slots().await, vec![0, 1, 2]);
    assert!(m.export().is_ok());
}
