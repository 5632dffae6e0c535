//! Image decoding into an RGBA pixel buffer.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! [`RgbaImage`] every later stage works on.
//!
//! This is the first step in the pipeline: raw bytes in, `RgbaImage` out.

use crate::types::{PipelineError, RgbaImage};

/// Decode raw image bytes into straight (non-premultiplied) RGBA.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`PipelineError::ZeroDimensions`] if the image has no pixels.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(PipelineError::ZeroDimensions {
            width: rgba.width(),
            height: rgba.height(),
        });
    }
    Ok(rgba)
}
