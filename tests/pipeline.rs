// ============================================================================
// End-to-end flows through the public API
// ============================================================================

use image::{Rgba, RgbaImage};
use pixelfx::{
    EditSession, EffectParams, ExportFormat, HueBand, PreviewScaler, RenderIntent,
    SelectionEngine, SelectionTool,
};

fn checker(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgba([220, 220, 220, 255])
        } else {
            Rgba([40, 40, 40, 255])
        }
    })
}

#[test]
fn decode_edit_undo_export_flow() {
    // Start from an encoded PNG the way a caller would.
    let source = checker(32, 24);
    let blob = pixelfx::encode_image(&source, ExportFormat::Png).unwrap();
    let mut session = EditSession::from_bytes(&blob).unwrap();
    assert_eq!(session.working().dimensions(), (32, 24));

    let mut p = EffectParams::default();
    p.brightness = 30.0;
    p.contrast = 10.0;
    session.apply(&p);
    let edited = session.working().get_pixel(0, 0).0;
    assert_ne!(edited, source.get_pixel(0, 0).0);

    session.undo();
    assert_eq!(session.working().as_raw(), source.as_raw());
    session.redo();

    let out = session.export(ExportFormat::Png).unwrap();
    let back = pixelfx::decode_image(&out).unwrap();
    assert_eq!(back.as_raw(), session.working().as_raw());
}

#[test]
fn wand_select_then_erase_cuts_a_region() {
    // Uniform background with a dark square: the wand grabs the square,
    // erase punches it out, and history can walk the whole thing back.
    let mut img = RgbaImage::from_pixel(16, 16, Rgba([250, 250, 250, 255]));
    for y in 4..8 {
        for x in 4..8 {
            img.put_pixel(x, y, Rgba([20, 20, 20, 255]));
        }
    }
    let mut session = EditSession::new(img);

    let mut sel = SelectionEngine::new(SelectionTool::MagicWand);
    sel.tolerance = 30.0;
    sel.begin(5.0, 5.0);
    let mask = sel.finish(session.working()).unwrap();
    session.set_selection(mask);
    session.erase_selected();

    assert_eq!(session.working().get_pixel(5, 5).0[3], 0);
    assert_eq!(session.working().get_pixel(0, 0).0[3], 255);

    assert!(session.undo());
    assert_eq!(session.working().get_pixel(5, 5).0[3], 255);
}

#[test]
fn parameters_arrive_as_json_from_a_frontend() {
    let text = r#"{
        "brightness": 15.0,
        "vibrance": 40.0,
        "threshold_white": 25.0,
        "hsl": { "bands": [
            { "hue": 0.0, "saturation": -20.0, "lightness": 0.0 },
            {}, {}, {}, {}, {}, {}, {}
        ] }
    }"#;
    let p: EffectParams = serde_json::from_str(text).unwrap();
    assert_eq!(p.brightness, 15.0);
    assert_eq!(p.hsl.band(HueBand::Red).saturation, -20.0);
    assert_eq!(p.hsl.band(HueBand::Orange).saturation, 0.0);

    let mut session = EditSession::new(checker(16, 16));
    session.apply(&p);
    assert_eq!(session.history().len(), 2);
    let label = &session.history().current().unwrap().label;
    assert!(label.contains("brightness 15"));
    assert!(label.contains("hsl red"));
}

#[test]
fn oversized_buffers_preview_small_and_commit_full_size() {
    // 3000x2000 is over the 4MP threshold; the preview path must hand back
    // a capped buffer while a committed apply restores full resolution.
    let big = RgbaImage::from_pixel(3000, 2000, Rgba([120, 130, 140, 255]));
    let mut session = EditSession::new(big);

    let mut p = EffectParams::default();
    p.brightness = 25.0;
    let shown = session.preview(&p);
    assert!(shown.width() <= 1920 && shown.height() <= 1920);
    assert!(shown.width() < 3000);

    session.apply(&p);
    assert_eq!(session.working().dimensions(), (3000, 2000));
    // The committed pixels carry the adjustment after the round trip.
    let px = session.working().get_pixel(1500, 1000).0;
    assert!(px[0] > 130);
}

#[test]
fn scale_factor_only_engages_over_the_threshold() {
    let mut scaler = PreviewScaler::new();
    assert_eq!(scaler.scale_for(2000, 2000), 1.0);
    let s = scaler.scale_for(6000, 4000);
    let capped = (6000.0 * s).round() as u32;
    assert!((1919..=1921).contains(&capped));

    // Final intent with an identity op reproduces the source dimensions.
    let img = RgbaImage::from_pixel(2500, 2500, Rgba([5, 5, 5, 255]));
    let out = scaler.run(&img, RenderIntent::Final, |small| small.clone());
    assert_eq!(out.dimensions(), (2500, 2500));
}

#[test]
fn structural_edits_and_effects_compose() {
    let mut session = EditSession::new(checker(20, 20));

    let mut p = EffectParams::default();
    p.saturation = -100.0;
    session.apply(&p);
    session.crop(2, 2, 10, 10);
    assert_eq!(session.working().dimensions(), (10, 10));
    assert!(session.params().is_neutral());

    session.rotate90();
    assert_eq!(session.working().dimensions(), (10, 10));

    let mut p2 = EffectParams::default();
    p2.blur = 2.0;
    session.apply(&p2);
    assert_eq!(session.working().dimensions(), (10, 10));

    // original, saturation, crop, rotate, blur
    assert_eq!(session.history().len(), 5);
    for _ in 0..4 {
        assert!(session.undo());
    }
    assert_eq!(session.working().dimensions(), (20, 20));
    assert!(!session.undo());
}
