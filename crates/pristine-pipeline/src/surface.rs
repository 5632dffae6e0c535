//! Low-level drawing helpers shared by the canvas, compositor, and
//! finisher stages.
//!
//! Gradients and alpha blending are evaluated per pixel on the
//! straight-alpha [`RgbaImage`]. Vector work (strokes, glyph cells) goes
//! through `tiny-skia`, which borrows the buffer in place. `tiny-skia`
//! expects premultiplied pixels, so [`with_opaque_pixmap`] is only valid
//! on fully opaque surfaces, where premultiplied and straight RGBA are
//! the same bytes.

use tiny_skia::PixmapMut;

use crate::types::RgbaImage;

/// One color stop of a gradient: offset in `[0, 1]` and straight RGBA
/// with channels in `[0, 255]` and alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient.
    pub offset: f32,
    /// Red, green, blue, alpha.
    pub rgba: [f32; 4],
}

impl GradientStop {
    /// Stop from byte channels and a fractional alpha.
    #[must_use]
    pub fn new(offset: f32, r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self {
            offset,
            rgba: [f32::from(r), f32::from(g), f32::from(b), alpha],
        }
    }
}

/// Evaluate a sorted stop list at `t`, clamping outside the first and
/// last stop.
#[must_use]
pub fn sample_stops(stops: &[GradientStop], t: f32) -> [f32; 4] {
    let Some(first) = stops.first() else {
        return [0.0; 4];
    };
    if t <= first.offset {
        return first.rgba;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let f = if span > f32::EPSILON {
                (t - a.offset) / span
            } else {
                1.0
            };
            return std::array::from_fn(|i| (b.rgba[i] - a.rgba[i]).mul_add(f, a.rgba[i]));
        }
    }
    stops.last().map_or([0.0; 4], |s| s.rgba)
}

/// Normalized distance of pixel `(x, y)` from the center of a square of
/// side `size`: `0` at the center, `1` at the inscribed circle.
///
/// Measured from the pixel center, like canvas gradient rasterization.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn radial_position(x: u32, y: u32, size: u32) -> f32 {
    let half = size as f32 / 2.0;
    if half <= 0.0 {
        return 0.0;
    }
    let dx = x as f32 + 0.5 - half;
    let dy = y as f32 + 0.5 - half;
    dx.hypot(dy) / half
}

/// Round and clamp a float channel to a byte.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Source-over blend of a straight color with `alpha` onto `dst`.
///
/// The destination alpha becomes `a_src + a_dst * (1 - a_src)`.
pub fn blend_over(dst: &mut image::Rgba<u8>, rgb: [f32; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst_a = f32::from(dst.0[3]) / 255.0;
    let out_a = alpha + dst_a * (1.0 - alpha);
    if out_a <= 0.0 {
        *dst = image::Rgba([0, 0, 0, 0]);
        return;
    }
    for (c, &src) in rgb.iter().enumerate() {
        let d = f32::from(dst.0[c]);
        let blended = (src * alpha + d * dst_a * (1.0 - alpha)) / out_a;
        dst.0[c] = to_byte(blended);
    }
    dst.0[3] = to_byte(out_a * 255.0);
}

/// Borrow an opaque surface as a `tiny-skia` pixmap.
///
/// Returns `false` without calling `draw` if the buffer cannot be
/// wrapped (zero-sized surface).
pub fn with_opaque_pixmap(image: &mut RgbaImage, draw: impl FnOnce(&mut PixmapMut<'_>)) -> bool {
    debug_assert!(
        image.pixels().all(|p| p.0[3] == 255),
        "tiny-skia drawing requires an opaque surface"
    );
    let (width, height) = image.dimensions();
    let Some(mut pixmap) = PixmapMut::from_bytes(&mut **image, width, height) else {
        return false;
    };
    draw(&mut pixmap);
    true
}
