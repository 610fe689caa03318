use photobooth::{
    BoothConfig, CanvasSize, DisplayLayout, MAX_SLOTS, TemplateCatalog, TemplateDefinition,
};

#[test]
fn builtin_templates_have_valid_slots() {
    let catalog = TemplateCatalog::builtin();
    assert_eq!(catalog.ids(), vec![1, 2, 3, 4]);

    for id in catalog.ids() {
        let t = catalog.lookup(id).unwrap();
        assert!((1..=MAX_SLOTS).contains(&t.slots.len()), "template {id}");
        let canvas = t.canvas_size();
        for slot in &t.slots {
            assert!(slot.width > 0 && slot.height > 0);
            assert!(slot.fits_within(canvas), "template {id} slot {slot:?}");
        }
    }
}

#[test]
fn catalog_loads_from_json() {
    let json = r#"[
        {
            "id": 7,
            "display_name": "Wide",
            "canvas_width": 600,
            "canvas_height": 300,
            "background": "/frames/wide.png",
            "slots": [
                { "x": 10, "y": 10, "width": 280, "height": 280 },
                { "x": 310, "y": 10, "width": 280, "height": 280 }
            ]
        }
    ]"#;
    let catalog = TemplateCatalog::from_reader(json.as_bytes()).unwrap();
    assert_eq!(catalog.len(), 1);
    let t: &TemplateDefinition = catalog.lookup(7).unwrap();
    assert_eq!(t.max_photos(), 2);
    assert_eq!(t.canvas_size(), CanvasSize::new(600, 300).unwrap());
    assert!(catalog.lookup(1).is_err());
}

#[test]
fn catalog_rejects_slot_outside_canvas() {
    let json = r#"[{"id":1,"display_name":"x","canvas_width":100,"canvas_height":100,
        "background":"/bg.png","slots":[{"x":50,"y":50,"width":60,"height":10}]}]"#;
    let err = TemplateCatalog::from_reader(json.as_bytes()).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn config_json_and_defaults() {
    let cfg = BoothConfig::from_json_str(r#"{ "filename_prefix": "booth", "init_timeout_ms": 500 }"#)
        .unwrap();
    assert_eq!(cfg.filename_prefix, "booth");
    assert_eq!(cfg.init_timeout().as_millis(), 500);
    assert_eq!(cfg.export_multiplier, 2);
    assert_eq!(cfg.load_timeout().as_millis(), 10_000);

    assert!(BoothConfig::from_json_str(r#"{ "bogus": 1 }"#).is_err());
    assert!(BoothConfig::from_json_str(r#"{ "export_multiplier": 0 }"#).is_err());
}

#[test]
fn display_size_never_changes_canvas() {
    let catalog = TemplateCatalog::builtin();
    let canvas = catalog.lookup(4).unwrap().canvas_size();
    let desktop = DisplayLayout::for_viewport(1440, canvas);
    let phone = DisplayLayout::for_viewport(390, canvas);
    assert_eq!(desktop.width, 320.0);
    assert_eq!(phone.width, 240.0);
    assert!(phone.height > phone.width);
    assert_eq!(canvas, CanvasSize::new(1080, 1920).unwrap());
}
