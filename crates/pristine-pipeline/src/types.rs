//! Shared types for the pristine image normalization pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference pixel
/// buffers without depending on `image` directly.
pub use image::RgbaImage;

/// An opaque RGB color.
///
/// Distances are Euclidean in RGB space. Comparisons against a
/// threshold go through [`distance_squared`](Self::distance_squared),
/// which is exact integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The RGB part of an RGBA pixel.
    #[must_use]
    pub const fn from_rgba(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self { r, g, b }
    }

    /// Squared Euclidean distance to another color.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> u32 {
        let dr = self.r.abs_diff(other.r) as u32;
        let dg = self.g.abs_diff(other.g) as u32;
        let db = self.b.abs_diff(other.b) as u32;
        dr * dr + dg * dg + db * db
    }

    /// Euclidean distance to another color.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        f64::from(self.distance_squared(other)).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing buffer.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// A crop rectangle inside a source image.
///
/// Produced by [`crop::smart_crop`](crate::crop::smart_crop), which
/// guarantees `x + width <= source_width` and
/// `y + height <= source_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width of the kept region.
    pub width: u32,
    /// Height of the kept region.
    pub height: u32,
}

impl CropRect {
    /// The rectangle covering the whole source.
    #[must_use]
    pub const fn full(dimensions: Dimensions) -> Self {
        Self {
            x: 0,
            y: 0,
            width: dimensions.width,
            height: dimensions.height,
        }
    }

    /// Whether the rectangle fits inside `bounds`.
    #[must_use]
    pub const fn fits_within(self, bounds: Dimensions) -> bool {
        self.x as u64 + self.width as u64 <= bounds.width as u64
            && self.y as u64 + self.height as u64 <= bounds.height as u64
    }
}

/// A group of border colors treated as one background candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundCluster {
    /// The first color that started the cluster.
    pub color: Color,
    /// Number of border samples attached to this cluster.
    pub count: usize,
}

/// Per-pixel gradient magnitude, one value per pixel of its source.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl EdgeMap {
    /// An all-zero map.
    #[must_use]
    pub fn zeroed(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            values: vec![0.0; len],
        }
    }

    /// A map filled with `value` everywhere.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            values: vec![value; len],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Edge strength at `(x, y)`, or `0.0` outside the map.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Overwrite the strength at `(x, y)`. Out-of-range writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            self.values[y as usize * self.width as usize + x as usize] = value;
        }
    }

    /// Row-major slice of all values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of pixels whose strength is at least `threshold`.
    #[must_use]
    pub fn count_at_least(&self, threshold: f32) -> usize {
        self.values.iter().filter(|&&v| v >= threshold).count()
    }
}

/// Which shape of output the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    /// Square branded product shot: crop, composite, clean up stickers,
    /// grade, finish, JPEG.
    #[default]
    Studio,
    /// Source-sized image with background pixels made transparent, PNG.
    Cutout,
}

impl std::fmt::Display for Treatment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Studio => f.write_str("studio"),
            Self::Cutout => f.write_str("cutout"),
        }
    }
}

/// Drop shadow drawn under the product on the studio surface.
///
/// Mirrors a canvas `shadowColor`/`shadowBlur`/`shadowOffset` triple:
/// the blur is converted to a Gaussian sigma of `blur / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Horizontal offset in pixels.
    pub offset_x: i32,
    /// Vertical offset in pixels.
    pub offset_y: i32,
    /// Canvas-style blur length in pixels.
    pub blur: f32,
    /// Opacity of the black shadow (0.0 to 1.0).
    pub opacity: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            offset_x: 2,
            offset_y: 6,
            blur: 12.0,
            opacity: 0.08,
        }
    }
}

/// How the cropped product is scaled into the square product box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFit {
    /// Scale to fill the whole box, ignoring the aspect ratio.
    #[default]
    Stretch,
    /// Scale to fit inside the box with the aspect ratio preserved.
    Contain,
}

/// Configuration for the normalization pipeline.
///
/// Defaults reproduce the storefront's look. Call
/// [`validate`](Self::validate) before running with user-supplied values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Side length of the square studio surface.
    pub output_size: u32,

    /// Fraction of the surface the product box occupies (0.0 to 1.0].
    pub product_scale: f32,

    /// How the product is scaled into the product box.
    pub fit: ProductFit,

    /// JPEG quality for studio output (1 to 100).
    pub jpeg_quality: u8,

    /// Shadow under the product.
    pub shadow: ShadowConfig,

    /// Whether to stroke the faint accent border on the surface.
    pub accent_border: bool,

    /// Watermark text, or `None` to skip the watermark.
    pub watermark: Option<String>,

    /// Watermark opacity (0.0 to 1.0).
    pub watermark_opacity: f32,

    /// Normalized radius where the vignette starts (0.0 to 1.0).
    pub vignette_start: f32,

    /// Black overlay opacity reached at the vignette edge (0.0 to 1.0).
    pub vignette_strength: f32,
}

impl PipelineConfig {
    /// Default studio surface side length.
    pub const DEFAULT_OUTPUT_SIZE: u32 = 800;
    /// Smallest accepted surface side length.
    pub const MIN_OUTPUT_SIZE: u32 = 16;
    /// Largest accepted surface side length.
    pub const MAX_OUTPUT_SIZE: u32 = 8192;
    /// Default product box fraction.
    pub const DEFAULT_PRODUCT_SCALE: f32 = 0.7;
    /// Default JPEG quality.
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;
    /// Default watermark text.
    pub const DEFAULT_WATERMARK: &str = "AlltagsGold";
    /// Default watermark opacity.
    pub const DEFAULT_WATERMARK_OPACITY: f32 = 0.025;
    /// Default vignette start radius.
    pub const DEFAULT_VIGNETTE_START: f32 = 0.85;
    /// Default vignette strength.
    pub const DEFAULT_VIGNETTE_STRENGTH: f32 = 0.02;

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(Self::MIN_OUTPUT_SIZE..=Self::MAX_OUTPUT_SIZE).contains(&self.output_size) {
            return Err(PipelineError::InvalidConfig(format!(
                "output_size must be in {}..={}, got {}",
                Self::MIN_OUTPUT_SIZE,
                Self::MAX_OUTPUT_SIZE,
                self.output_size
            )));
        }
        if !(self.product_scale > 0.0 && self.product_scale <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "product_scale must be in (0, 1], got {}",
                self.product_scale
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PipelineError::InvalidConfig(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if !self.shadow.blur.is_finite() || self.shadow.blur < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "shadow.blur must be finite and non-negative, got {}",
                self.shadow.blur
            )));
        }
        for (name, value) in [
            ("shadow.opacity", self.shadow.opacity),
            ("watermark_opacity", self.watermark_opacity),
            ("vignette_start", self.vignette_start),
            ("vignette_strength", self.vignette_strength),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_size: Self::DEFAULT_OUTPUT_SIZE,
            product_scale: Self::DEFAULT_PRODUCT_SCALE,
            fit: ProductFit::default(),
            jpeg_quality: Self::DEFAULT_JPEG_QUALITY,
            shadow: ShadowConfig::default(),
            accent_border: true,
            watermark: Some(Self::DEFAULT_WATERMARK.to_owned()),
            watermark_opacity: Self::DEFAULT_WATERMARK_OPACITY,
            vignette_start: Self::DEFAULT_VIGNETTE_START,
            vignette_strength: Self::DEFAULT_VIGNETTE_STRENGTH,
        }
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The decoded image has no pixels.
    #[error("decoded image has zero width or height ({width}x{height})")]
    ZeroDimensions {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn color_distance_squared_is_exact() {
        let a = Color::new(0, 0, 0);
        let b = Color::new(24, 32, 0);
        assert_eq!(a.distance_squared(b), 1600);
        assert!((a.distance(b) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn color_distance_is_symmetric() {
        let a = Color::new(200, 10, 90);
        let b = Color::new(12, 250, 91);
        assert_eq!(a.distance_squared(b), b.distance_squared(a));
    }

    #[test]
    fn crop_rect_full_fits() {
        let dims = Dimensions {
            width: 30,
            height: 20,
        };
        assert!(CropRect::full(dims).fits_within(dims));
        let too_wide = CropRect {
            x: 1,
            ..CropRect::full(dims)
        };
        assert!(!too_wide.fits_within(dims));
    }

    #[test]
    fn edge_map_out_of_range_reads_zero() {
        let mut map = EdgeMap::zeroed(3, 2);
        map.set(2, 1, 7.5);
        map.set(9, 9, 1.0);
        assert!((map.get(2, 1) - 7.5).abs() < f32::EPSILON);
        assert!(map.get(3, 0).abs() < f32::EPSILON);
        assert_eq!(map.values().len(), 6);
        assert_eq!(map.count_at_least(7.0), 1);
    }

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_size, 800);
        assert!((config.product_scale - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.shadow.offset_x, 2);
        assert_eq!(config.shadow.offset_y, 6);
        assert_eq!(config.watermark.as_deref(), Some("AlltagsGold"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let config = PipelineConfig {
            product_scale: 0.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(ref s)) if s.contains("product_scale")
        ));

        let config = PipelineConfig {
            vignette_strength: 1.5,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(ref s)) if s.contains("vignette_strength")
        ));

        let config = PipelineConfig {
            jpeg_quality: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        for output_size in [15, 8193, 100_000] {
            let config = PipelineConfig {
                output_size,
                ..PipelineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(PipelineError::InvalidConfig(ref s)) if s.contains("output_size")
            ));
        }
        let config = PipelineConfig {
            output_size: PipelineConfig::MAX_OUTPUT_SIZE,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn pipeline_config_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"output_size": 400, "watermark": null}"#).unwrap();
        assert_eq!(config.output_size, 400);
        assert!(config.watermark.is_none());
        assert_eq!(config.jpeg_quality, PipelineConfig::DEFAULT_JPEG_QUALITY);
        assert_eq!(config.fit, ProductFit::Stretch);

        let config: PipelineConfig = serde_json::from_str(r#"{"fit": "contain"}"#).unwrap();
        assert_eq!(config.fit, ProductFit::Contain);
    }

    #[test]
    fn treatment_serde_is_snake_case() {
        assert_eq!(serde_json::to_string(&Treatment::Cutout).unwrap(), "\"cutout\"");
        assert_eq!(Treatment::Studio.to_string(), "studio");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            PipelineError::ZeroDimensions {
                width: 0,
                height: 4
            }
            .to_string(),
            "decoded image has zero width or height (0x4)"
        );
    }
}
