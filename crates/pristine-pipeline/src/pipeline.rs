//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::process_studio`] and [`crate::process_cutout`] run a whole
//! treatment in one call. [`Pipeline`] lets the caller drive execution one
//! step at a time:
//!
//! ```rust
//! # use pristine_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(bytes: &[u8]) -> Result<(), PipelineError> {
//! let output = Pipeline::new(bytes, PipelineConfig::default())
//!     .decode()?
//!     .crop()
//!     .compose()
//!     .analyze()
//!     .clean()
//!     .grade()
//!     .finish()
//!     .encode()?;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, moving
//! the one pixel buffer along. Nothing is returned to the caller until
//! [`Finished::encode`] (or [`CutOut::encode`]) succeeds, so a
//! half-processed buffer never escapes as output.
//!
//! Every completed stage is reported to the [`StageObserver`] given to
//! [`Pipeline::with_observer`].

use crate::background::detect_background;
use crate::canvas::studio_surface;
use crate::classify::{LOW_EDGE_THRESHOLD, clean_promotional, remove_background};
use crate::composite::{Placement, composite_product};
use crate::crop::{apply_crop, smart_crop};
use crate::decode::decode_rgba;
use crate::diagnostics::{NoopObserver, StageId, StageObserver, timed, timed_result};
use crate::edge::sobel_magnitude;
use crate::encode::{EncodedImage, encode_jpeg, encode_png};
use crate::finish::{vignette, watermark};
use crate::grade::grade;
use crate::types::{
    BackgroundCluster, CropRect, Dimensions, EdgeMap, PipelineConfig, PipelineError, RgbaImage,
};

/// What the pipeline found and changed along the way.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Analysis {
    /// Decoded source dimensions.
    pub source: Dimensions,
    /// Crop applied to the source (the full source for cutouts).
    pub crop: CropRect,
    /// Where the product landed on the studio surface. `None` for cutouts.
    pub placement: Option<Placement>,
    /// Dominant border colors, most common first.
    pub clusters: Vec<BackgroundCluster>,
    /// Pixels whose edge strength reached the low-edge threshold.
    pub strong_edges: usize,
    /// Pixels recolored by the promotional cleanup.
    pub recolored: usize,
    /// Pixels made transparent by background removal.
    pub cleared: usize,
}

/// A finished pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// The encoded image.
    pub image: EncodedImage,
    /// Stage findings.
    pub analysis: Analysis,
}

/// Entry point for the incremental pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over `source` that reports to nobody.
    pub fn new(source: &[u8], config: PipelineConfig) -> Pending<'_> {
        Pending {
            config,
            source,
            observer: &NoopObserver,
        }
    }

    /// Start a pipeline over `source` that reports each completed stage
    /// to `observer`.
    pub fn with_observer<'a>(
        source: &'a [u8],
        config: PipelineConfig,
        observer: &'a dyn StageObserver,
    ) -> Pending<'a> {
        Pending {
            config,
            source,
            observer,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing — call .decode() to continue"]
pub struct Pending<'a> {
    config: PipelineConfig,
    source: &'a [u8],
    observer: &'a dyn StageObserver,
}

impl<'a> Pending<'a> {
    /// The raw source image bytes.
    #[must_use]
    pub const fn source(&self) -> &[u8] {
        self.source
    }

    /// Validate the config, decode the source, and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an out-of-range
    /// config, and any [`decode_rgba`] error.
    pub fn decode(self) -> Result<Decoded<'a>, PipelineError> {
        self.config.validate()?;
        let image = timed_result(self.observer, StageId::Decode, || decode_rgba(self.source))?;
        Ok(Decoded {
            config: self.config,
            observer: self.observer,
            source: Dimensions::of(&image),
            image,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding. Branches into the studio path
/// ([`crop`](Self::crop)) or the cutout path
/// ([`analyze_source`](Self::analyze_source)).
#[must_use = "pipeline stages are consumed by advancing — call .crop() or .analyze_source() to continue"]
pub struct Decoded<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    source: Dimensions,
    image: RgbaImage,
}

impl<'a> Decoded<'a> {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Studio path: apply the smart crop.
    pub fn crop(self) -> Cropped<'a> {
        let (crop, product) = timed(self.observer, StageId::Crop, || {
            let crop = smart_crop(self.source);
            (crop, apply_crop(&self.image, crop))
        });
        Cropped {
            config: self.config,
            observer: self.observer,
            source: self.source,
            crop,
            product,
        }
    }

    /// Cutout path: detect edges and background colors on the source
    /// itself.
    pub fn analyze_source(self) -> SourceAnalyzed<'a> {
        let edges = timed(self.observer, StageId::EdgeDetect, || {
            sobel_magnitude(&self.image)
        });
        let clusters = timed(self.observer, StageId::BackgroundSample, || {
            detect_background(&self.image)
        });
        SourceAnalyzed {
            observer: self.observer,
            source: self.source,
            image: self.image,
            edges,
            clusters,
        }
    }
}

// ───────────────────────── Stage 2: Cropped ──────────────────────────

/// Studio path after cropping. Call [`compose`](Self::compose) to
/// continue.
#[must_use = "pipeline stages are consumed by advancing — call .compose() to continue"]
pub struct Cropped<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    source: Dimensions,
    crop: CropRect,
    product: RgbaImage,
}

impl<'a> Cropped<'a> {
    /// The crop that was applied.
    #[must_use]
    pub const fn crop_rect(&self) -> CropRect {
        self.crop
    }

    /// The cropped product image.
    #[must_use]
    pub const fn product(&self) -> &RgbaImage {
        &self.product
    }

    /// Allocate the studio surface and draw the product onto it.
    pub fn compose(self) -> Composed<'a> {
        let mut surface = timed(self.observer, StageId::Canvas, || {
            studio_surface(self.config.output_size, self.config.accent_border)
        });
        let placement = timed(self.observer, StageId::Composite, || {
            composite_product(&mut surface, &self.product, &self.config)
        });
        Composed {
            config: self.config,
            observer: self.observer,
            source: self.source,
            crop: self.crop,
            placement,
            surface,
        }
    }
}

// ───────────────────────── Stage 3: Composed ─────────────────────────

/// Studio path with the product composited. Call
/// [`analyze`](Self::analyze) to continue.
#[must_use = "pipeline stages are consumed by advancing — call .analyze() to continue"]
pub struct Composed<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    source: Dimensions,
    crop: CropRect,
    placement: Placement,
    surface: RgbaImage,
}

impl<'a> Composed<'a> {
    /// The composited surface.
    #[must_use]
    pub const fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Where the product was placed.
    #[must_use]
    pub const fn placement(&self) -> Placement {
        self.placement
    }

    /// Run edge detection and background sampling over the surface.
    pub fn analyze(self) -> Analyzed<'a> {
        let edges = timed(self.observer, StageId::EdgeDetect, || {
            sobel_magnitude(&self.surface)
        });
        let clusters = timed(self.observer, StageId::BackgroundSample, || {
            detect_background(&self.surface)
        });
        Analyzed {
            config: self.config,
            observer: self.observer,
            analysis: Analysis {
                source: self.source,
                crop: self.crop,
                placement: Some(self.placement),
                clusters,
                strong_edges: edges.count_at_least(LOW_EDGE_THRESHOLD),
                recolored: 0,
                cleared: 0,
            },
            edges,
            surface: self.surface,
        }
    }
}

// ───────────────────────── Stage 4: Analyzed ─────────────────────────

/// Studio path with edges and background clusters known. Call
/// [`clean`](Self::clean) to continue.
#[must_use = "pipeline stages are consumed by advancing — call .clean() to continue"]
pub struct Analyzed<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    analysis: Analysis,
    edges: EdgeMap,
    surface: RgbaImage,
}

impl<'a> Analyzed<'a> {
    /// Edge strength of the composited surface.
    #[must_use]
    pub const fn edges(&self) -> &EdgeMap {
        &self.edges
    }

    /// Background clusters of the composited surface.
    #[must_use]
    pub fn clusters(&self) -> &[BackgroundCluster] {
        &self.analysis.clusters
    }

    /// Recolor promotional stickers.
    pub fn clean(mut self) -> Cleaned<'a> {
        self.analysis.recolored = timed(self.observer, StageId::CleanPromotional, || {
            clean_promotional(&mut self.surface)
        });
        Cleaned {
            config: self.config,
            observer: self.observer,
            analysis: self.analysis,
            surface: self.surface,
        }
    }
}

// ───────────────────────── Stage 5: Cleaned ──────────────────────────

/// Studio path after sticker cleanup. Call [`grade`](Self::grade) to
/// continue.
#[must_use = "pipeline stages are consumed by advancing — call .grade() to continue"]
pub struct Cleaned<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    analysis: Analysis,
    surface: RgbaImage,
}

impl<'a> Cleaned<'a> {
    /// The cleaned surface.
    #[must_use]
    pub const fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Apply the color grade.
    pub fn grade(mut self) -> Graded<'a> {
        timed(self.observer, StageId::Grade, || grade(&mut self.surface));
        Graded {
            config: self.config,
            observer: self.observer,
            analysis: self.analysis,
            surface: self.surface,
        }
    }
}

// ───────────────────────── Stage 6: Graded ───────────────────────────

/// Studio path after grading. Call [`finish`](Self::finish) to continue.
#[must_use = "pipeline stages are consumed by advancing — call .finish() to continue"]
pub struct Graded<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    analysis: Analysis,
    surface: RgbaImage,
}

impl<'a> Graded<'a> {
    /// The graded surface.
    #[must_use]
    pub const fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Apply the vignette and the watermark.
    pub fn finish(mut self) -> Finished<'a> {
        let config = &self.config;
        timed(self.observer, StageId::Finish, || {
            vignette(
                &mut self.surface,
                config.vignette_start,
                config.vignette_strength,
            );
            if let Some(text) = &config.watermark {
                watermark(&mut self.surface, text, config.watermark_opacity);
            }
        });
        Finished {
            config: self.config,
            observer: self.observer,
            analysis: self.analysis,
            surface: self.surface,
        }
    }
}

// ───────────────────────── Stage 7: Finished ─────────────────────────

/// Studio path, ready to encode.
#[must_use = "pipeline stages are consumed by advancing — call .encode() to continue"]
pub struct Finished<'a> {
    config: PipelineConfig,
    observer: &'a dyn StageObserver,
    analysis: Analysis,
    surface: RgbaImage,
}

impl Finished<'_> {
    /// The final surface.
    #[must_use]
    pub const fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Encode the surface as JPEG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if encoding fails.
    pub fn encode(self) -> Result<PipelineOutput, PipelineError> {
        let image = timed_result(self.observer, StageId::Encode, || {
            encode_jpeg(&self.surface, self.config.jpeg_quality)
        })?;
        Ok(PipelineOutput {
            image,
            analysis: self.analysis,
        })
    }
}

// ───────────────────────── Cutout path ───────────────────────────────

/// Cutout path with edges and background clusters of the source known.
/// Call [`remove_background`](Self::remove_background) to continue.
#[must_use = "pipeline stages are consumed by advancing — call .remove_background() to continue"]
pub struct SourceAnalyzed<'a> {
    observer: &'a dyn StageObserver,
    source: Dimensions,
    image: RgbaImage,
    edges: EdgeMap,
    clusters: Vec<BackgroundCluster>,
}

impl<'a> SourceAnalyzed<'a> {
    /// Edge strength of the source.
    #[must_use]
    pub const fn edges(&self) -> &EdgeMap {
        &self.edges
    }

    /// Background clusters of the source.
    #[must_use]
    pub fn clusters(&self) -> &[BackgroundCluster] {
        &self.clusters
    }

    /// Make background pixels transparent.
    pub fn remove_background(mut self) -> CutOut<'a> {
        let cleared = timed(self.observer, StageId::RemoveBackground, || {
            remove_background(&mut self.image, &self.edges, &self.clusters)
        });
        CutOut {
            observer: self.observer,
            analysis: Analysis {
                source: self.source,
                crop: CropRect::full(self.source),
                placement: None,
                strong_edges: self.edges.count_at_least(LOW_EDGE_THRESHOLD),
                clusters: self.clusters,
                recolored: 0,
                cleared,
            },
            image: self.image,
        }
    }
}

/// Cutout path, ready to encode.
#[must_use = "pipeline stages are consumed by advancing — call .encode() to continue"]
pub struct CutOut<'a> {
    observer: &'a dyn StageObserver,
    analysis: Analysis,
    image: RgbaImage,
}

impl CutOut<'_> {
    /// The image with background made transparent.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Encode the cutout as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if encoding fails.
    pub fn encode(self) -> Result<PipelineOutput, PipelineError> {
        let image = timed_result(self.observer, StageId::Encode, || encode_png(&self.image))?;
        Ok(PipelineOutput {
            image,
            analysis: self.analysis,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diagnostics::StageCounter;
    use crate::testing::encode_png as png_bytes;

    fn product_on_white(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let inside = x > width / 4 && x < 3 * width / 4 && y > height / 4 && y < 3 * height / 4;
            if inside {
                image::Rgba([40, 60, 90, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        png_bytes(&img)
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            output_size: 64,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn studio_stages_advance_and_expose_intermediates() {
        let bytes = product_on_white(40, 30);
        let decoded = Pipeline::new(&bytes, small_config()).decode().unwrap();
        assert_eq!(decoded.image().dimensions(), (40, 30));

        let cropped = decoded.crop();
        assert_eq!(
            cropped.crop_rect(),
            CropRect {
                x: 0,
                y: 0,
                width: 40,
                height: 30
            }
        );

        let composed = cropped.compose();
        assert_eq!(composed.surface().dimensions(), (64, 64));

        let analyzed = composed.analyze();
        assert!(!analyzed.clusters().is_empty());
        assert_eq!(analyzed.edges().width(), 64);

        let output = analyzed.clean().grade().finish().encode().unwrap();
        assert_eq!(output.image.dimensions, Dimensions { width: 64, height: 64 });
        assert!(output.analysis.placement.is_some());
    }

    #[test]
    fn every_studio_stage_reports_once() {
        let bytes = product_on_white(40, 40);
        let counter = StageCounter::new();
        Pipeline::with_observer(&bytes, small_config(), &counter)
            .decode()
            .unwrap()
            .crop()
            .compose()
            .analyze()
            .clean()
            .grade()
            .finish()
            .encode()
            .unwrap();
        for stage in StageId::ALL {
            let expected = usize::from(stage != StageId::RemoveBackground);
            assert_eq!(counter.count(stage), expected, "{stage}");
        }
    }

    #[test]
    fn cutout_path_clears_white_border() {
        let bytes = product_on_white(40, 40);
        let cut = Pipeline::new(&bytes, PipelineConfig::default())
            .decode()
            .unwrap()
            .analyze_source()
            .remove_background();
        assert_eq!(cut.image().get_pixel(0, 0).0[3], 0);
        assert_eq!(cut.image().get_pixel(20, 20).0[3], 255);
        let output = cut.encode().unwrap();
        assert!(output.analysis.cleared > 0);
        assert_eq!(output.analysis.placement, None);
    }

    #[test]
    fn invalid_config_fails_before_decode() {
        let counter = StageCounter::new();
        let config = PipelineConfig {
            output_size: 4,
            ..PipelineConfig::default()
        };
        let bytes = product_on_white(10, 10);
        let result = Pipeline::with_observer(&bytes, config, &counter).decode();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
        assert_eq!(counter.count(StageId::Decode), 0);
    }
}
