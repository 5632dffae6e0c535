//! pristine-pipeline: product image normalization (sans-IO).
//!
//! Turns an arbitrary product photo into a uniform, brand-consistent
//! image through:
//! decode -> smart crop -> studio surface + composite -> edge detection ->
//! background sampling -> promotional cleanup -> grade -> finish -> encode.
//!
//! A second treatment makes the background of the source transparent
//! instead ("cutout").
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns encoded bytes. Fetching, caching, and the
//! remote service tier live in `pristine-io`.

pub mod background;
pub mod canvas;
pub mod classify;
pub mod composite;
pub mod crop;
pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod encode;
pub mod finish;
pub mod grade;
pub mod pipeline;
pub mod surface;
pub mod types;

pub use diagnostics::{
    NoopObserver, StageCounter, StageId, StageObserver, StageTiming, TimingRecorder,
};
pub use encode::{EncodedImage, OutputFormat};
pub use pipeline::{Analysis, Pipeline, PipelineOutput};
pub use types::{
    BackgroundCluster, Color, CropRect, Dimensions, EdgeMap, PipelineConfig, PipelineError,
    ProductFit, RgbaImage, ShadowConfig, Treatment,
};

/// Run the studio treatment.
///
/// Produces a `config.output_size` square JPEG of the product on the
/// branded surface.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an out-of-range config,
/// [`PipelineError::EmptyInput`], [`PipelineError::ImageDecode`] or
/// [`PipelineError::ZeroDimensions`] for unusable input, and
/// [`PipelineError::Encode`] if the result cannot be serialized.
pub fn process_studio(
    image_bytes: &[u8],
    config: &PipelineConfig,
    observer: &dyn StageObserver,
) -> Result<PipelineOutput, PipelineError> {
    Pipeline::with_observer(image_bytes, config.clone(), observer)
        .decode()?
        .crop()
        .compose()
        .analyze()
        .clean()
        .grade()
        .finish()
        .encode()
}

/// Run the cutout treatment.
///
/// Produces a source-sized PNG with background pixels made transparent.
///
/// # Errors
///
/// Same as [`process_studio`].
pub fn process_cutout(
    image_bytes: &[u8],
    config: &PipelineConfig,
    observer: &dyn StageObserver,
) -> Result<PipelineOutput, PipelineError> {
    Pipeline::with_observer(image_bytes, config.clone(), observer)
        .decode()?
        .analyze_source()
        .remove_background()
        .encode()
}

/// Run `treatment`.
///
/// # Errors
///
/// See [`process_studio`].
pub fn process(
    image_bytes: &[u8],
    treatment: Treatment,
    config: &PipelineConfig,
    observer: &dyn StageObserver,
) -> Result<PipelineOutput, PipelineError> {
    match treatment {
        Treatment::Studio => process_studio(image_bytes, config, observer),
        Treatment::Cutout => process_cutout(image_bytes, config, observer),
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            output_size: 96,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn process_empty_input() {
        let result = process_studio(&[], &config(), &NoopObserver);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_garbage_input() {
        let result = process_cutout(b"definitely not an image", &config(), &NoopObserver);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn studio_output_is_square_jpeg() {
        let img = RgbaImage::from_pixel(50, 80, image::Rgba([30, 90, 160, 255]));
        let out = process_studio(&testing::encode_png(&img), &config(), &NoopObserver).unwrap();
        assert_eq!(out.image.format, OutputFormat::Jpeg);
        assert_eq!(out.image.dimensions, Dimensions { width: 96, height: 96 });
        // 80 > 50 * 1.3: tall crop.
        assert_eq!(out.analysis.crop.y, 12);
        assert_eq!(out.analysis.crop.height, 60);
    }

    #[test]
    fn cutout_output_keeps_source_size() {
        let img = RgbaImage::from_pixel(30, 20, image::Rgba([250, 250, 250, 255]));
        let out = process(&testing::encode_png(&img), Treatment::Cutout, &config(), &NoopObserver)
            .unwrap();
        assert_eq!(out.image.format, OutputFormat::Png);
        assert_eq!(out.image.dimensions, Dimensions { width: 30, height: 20 });
        assert_eq!(out.analysis.cleared, 30 * 20);
    }

    #[test]
    fn studio_recolors_promotional_sticker() {
        let img = RgbaImage::from_fn(40, 40, |x, y| {
            if (15..25).contains(&x) && (15..25).contains(&y) {
                image::Rgba([235, 30, 30, 255])
            } else {
                image::Rgba([120, 120, 120, 255])
            }
        });
        let out = process_studio(&testing::encode_png(&img), &config(), &NoopObserver).unwrap();
        assert!(out.analysis.recolored > 0);
    }

    #[test]
    fn studio_is_deterministic() {
        let img = RgbaImage::from_fn(30, 30, |x, y| {
            image::Rgba([(x * 8) as u8, (y * 8) as u8, 128, 255])
        });
        let bytes = testing::encode_png(&img);
        let a = process_studio(&bytes, &config(), &NoopObserver).unwrap();
        let b = process_studio(&bytes, &config(), &NoopObserver).unwrap();
        assert_eq!(a, b);
    }
}
