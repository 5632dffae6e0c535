//! Final serialization of the pixel buffer.
//!
//! Studio output is JPEG (the surface is opaque), cutout output is PNG so
//! the transparency survives. Both can be rendered as a base64 data URI
//! for direct display.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageEncoder as _;
use image::buffer::ConvertBuffer as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, RgbaImage};

/// Encoded payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy, opaque.
    Jpeg,
    /// Lossless, keeps alpha.
    Png,
}

impl OutputFormat {
    /// MIME type of the payload.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Conventional file extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// An encoded image, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Payload format.
    pub format: OutputFormat,
    /// Pixel dimensions of the encoded image.
    pub dimensions: Dimensions,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// `data:<media type>;base64,<payload>`.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.media_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Encode an opaque buffer as baseline JPEG at `quality` (1 to 100).
///
/// Alpha is dropped.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the encoder fails.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<EncodedImage, PipelineError> {
    let rgb: image::RgbImage = image.convert();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(PipelineError::Encode)?;
    Ok(EncodedImage {
        format: OutputFormat::Jpeg,
        dimensions: Dimensions::of(image),
        bytes,
    })
}

/// Encode a buffer as RGBA PNG.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the encoder fails.
pub fn encode_png(image: &RgbaImage) -> Result<EncodedImage, PipelineError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(PipelineError::Encode)?;
    Ok(EncodedImage {
        format: OutputFormat::Png,
        dimensions: Dimensions::of(image),
        bytes,
    })
}
