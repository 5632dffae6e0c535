//! Integration test: run a synthetic supplier photo (wide banner, gray
//! backdrop, red sale sticker) through both treatments.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pristine_pipeline::{
    NoopObserver, OutputFormat, PipelineConfig, RgbaImage, StageCounter, StageId, Treatment,
};

/// 300x150 banner: two blue products on light gray, a red sticker on the
/// right-hand product.
fn supplier_banner() -> Vec<u8> {
    let img = RgbaImage::from_fn(300, 150, |x, y| {
        let in_product = |cx: u32| x.abs_diff(cx) < 35 && y.abs_diff(75) < 45;
        if x.abs_diff(170) < 8 && y.abs_diff(60) < 8 {
            image::Rgba([240, 30, 35, 255])
        } else if in_product(80) || in_product(170) {
            image::Rgba([30, 60, 150, 255])
        } else {
            image::Rgba([235, 235, 235, 255])
        }
    });
    let mut buf = Vec::new();
    image::ImageEncoder::write_image(
        image::codecs::png::PngEncoder::new(&mut buf),
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )
    .unwrap();
    buf
}

#[test]
fn studio_treatment_normalizes_banner() {
    let bytes = supplier_banner();
    let config = PipelineConfig::default();
    let counter = StageCounter::new();

    let out = pristine_pipeline::process(&bytes, Treatment::Studio, &config, &counter)
        .expect("studio pipeline should succeed");

    eprintln!(
        "studio: {} bytes, crop {:?}, {} recolored, {} clusters",
        out.image.bytes.len(),
        out.analysis.crop,
        out.analysis.recolored,
        out.analysis.clusters.len(),
    );

    assert_eq!(out.image.format, OutputFormat::Jpeg);
    // 300 > 150 * 1.5: centered square.
    assert_eq!(out.analysis.crop.x, 75);
    assert_eq!(out.analysis.crop.width, 150);
    assert!(out.analysis.recolored > 0, "sticker should be recolored");
    assert_eq!(counter.count(StageId::EdgeDetect), 1);

    let decoded = image::load_from_memory(&out.image.bytes).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (800, 800));

    // Sticker center (source 170, 60) lands near surface (476, 346) and
    // is no longer red.
    let sticker = decoded.get_pixel(476, 346).0;
    assert!(sticker[1] > 200 && sticker[2] > 200, "sticker {sticker:?}");

    // Surface corners stay near white.
    let corner = decoded.get_pixel(2, 2).0;
    assert!(corner.iter().all(|&c| c > 230), "corner {corner:?}");

    let data_uri = out.image.to_data_uri();
    assert!(data_uri.starts_with("data:image/jpeg;base64,"));

    let output_path = std::env::temp_dir().join("pristine-supplier-banner.jpg");
    std::fs::write(&output_path, &out.image.bytes).unwrap();
    eprintln!("JPEG written to {output_path:?}");
}

#[test]
fn cutout_treatment_clears_backdrop_only() {
    let bytes = supplier_banner();
    let out = pristine_pipeline::process_cutout(&bytes, &PipelineConfig::default(), &NoopObserver)
        .expect("cutout pipeline should succeed");

    assert_eq!(out.image.format, OutputFormat::Png);
    let decoded = image::load_from_memory(&out.image.bytes)
        .unwrap()
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (300, 150));

    // Backdrop gone, product interior kept.
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(150, 10).0[3], 0);
    assert_eq!(decoded.get_pixel(80, 75).0[3], 255);
    // The sticker is not the backdrop color.
    assert_eq!(decoded.get_pixel(170, 60).0[3], 255);
}
