//! Finishing touches: a faint radial vignette and the brand watermark.
//!
//! Both are purely visual overlays on the opaque studio surface.

use tiny_skia::{Color as SkColor, FillRule, Paint, PathBuilder, Rect, Transform};

use crate::surface::{GradientStop, blend_over, radial_position, sample_stops, with_opaque_pixmap};
use crate::types::RgbaImage;

/// Watermark text color (`#E7C469`).
pub const WATERMARK_RGB: [u8; 3] = [0xE7, 0xC4, 0x69];

/// Distance of the watermark's right edge from the right surface edge.
pub const WATERMARK_RIGHT_INSET: u32 = 12;

/// Distance of the watermark baseline from the bottom surface edge.
pub const WATERMARK_BASELINE_INSET: u32 = 6;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Darken toward the corners: transparent up to `start` of the inscribed
/// radius, then a linear ramp to black at `strength` opacity on the
/// radius and beyond.
pub fn vignette(image: &mut RgbaImage, start: f32, strength: f32) {
    if strength <= 0.0 {
        return;
    }
    let stops = [
        GradientStop::new(0.0, 0, 0, 0, 0.0),
        GradientStop::new(start, 0, 0, 0, 0.0),
        GradientStop::new(1.0, 0, 0, 0, strength),
    ];
    let size = image.width().max(image.height());
    for (x, y, px) in image.enumerate_pixels_mut() {
        let [_, _, _, alpha] = sample_stops(&stops, radial_position(x, y, size));
        blend_over(px, [0.0, 0.0, 0.0], alpha);
    }
}

/// Rows of a 5×7 glyph, top to bottom, bit 4 = leftmost column.
///
/// Letters are upper case only; lower case input folds to upper case.
/// Characters without a glyph render as blank space.
#[must_use]
pub const fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        _ => [0x00; 7],
    }
}

/// Pixel width of `text` set in the bitmap face.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn text_width(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        0
    } else {
        chars * GLYPH_ADVANCE - 1
    }
}

/// Draw `text` right-aligned at the bottom-right corner of `image` in the
/// watermark color at `opacity`.
///
/// Does nothing for empty text, zero opacity, or a surface too small to
/// hold the text.
#[allow(clippy::cast_precision_loss)]
pub fn watermark(image: &mut RgbaImage, text: &str, opacity: f32) {
    let width = text_width(text);
    let (surface_w, surface_h) = image.dimensions();
    if width == 0 || opacity <= 0.0 {
        return;
    }
    let Some(left) = surface_w.checked_sub(WATERMARK_RIGHT_INSET + width) else {
        return;
    };
    let Some(top) = surface_h.checked_sub(WATERMARK_BASELINE_INSET + GLYPH_HEIGHT) else {
        return;
    };

    let mut builder = PathBuilder::new();
    let mut pen_x = left;
    for c in text.chars() {
        for (row, bits) in (0..GLYPH_HEIGHT).zip(glyph(c)) {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                if let Some(cell) =
                    Rect::from_xywh((pen_x + col) as f32, (top + row) as f32, 1.0, 1.0)
                {
                    builder.push_rect(cell);
                }
            }
        }
        pen_x += GLYPH_ADVANCE;
    }
    // All-blank text (e.g. only spaces) builds no path.
    let Some(path) = builder.finish() else {
        return;
    };

    let [r, g, b] = WATERMARK_RGB;
    let Some(color) = SkColor::from_rgba(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        opacity.clamp(0.0, 1.0),
    ) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false;

    with_opaque_pixmap(image, |pixmap| {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: image::Rgba<u8> = image::Rgba([255, 255, 255, 255]);

    #[test]
    fn vignette_leaves_center_and_darkens_corners() {
        let mut img = RgbaImage::from_pixel(100, 100, WHITE);
        vignette(&mut img, 0.85, 0.02);
        assert_eq!(*img.get_pixel(50, 50), WHITE);
        // Corner: full strength, 255 * 0.98 = 249.9.
        assert_eq!(img.get_pixel(0, 0).0, [250, 250, 250, 255]);
    }

    #[test]
    fn zero_strength_vignette_is_noop() {
        let mut img = RgbaImage::from_pixel(20, 20, WHITE);
        vignette(&mut img, 0.85, 0.0);
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn glyph_folds_case_and_blanks_unknown() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('~'), [0; 7]);
        assert_eq!(glyph(' '), [0; 7]);
    }

    #[test]
    fn text_width_counts_advance_without_trailing_gap() {
        assert_eq!(text_width(""), 0);
        assert_eq!(text_width("A"), 5);
        assert_eq!(text_width("AlltagsGold"), 11 * 6 - 1);
    }

    #[test]
    fn watermark_touches_only_bottom_right_box() {
        let mut img = RgbaImage::from_pixel(200, 200, WHITE);
        watermark(&mut img, "AlltagsGold", 0.5);
        let width = text_width("AlltagsGold");
        let left = 200 - 12 - width;
        let top = 200 - 6 - 7;
        let mut touched = 0;
        for (x, y, p) in img.enumerate_pixels() {
            if *p == WHITE {
                continue;
            }
            touched += 1;
            assert!((left..200 - 12).contains(&x), "x = {x}");
            assert!((top..200 - 6).contains(&y), "y = {y}");
            // Gold tint: blue drops the most.
            assert!(p.0[2] < p.0[0]);
        }
        assert!(touched > 0);
    }

    #[test]
    fn watermark_skips_tiny_surface_and_blank_text() {
        let mut tiny = RgbaImage::from_pixel(20, 20, WHITE);
        watermark(&mut tiny, "AlltagsGold", 0.5);
        assert!(tiny.pixels().all(|p| *p == WHITE));

        let mut blank = RgbaImage::from_pixel(100, 100, WHITE);
        watermark(&mut blank, "   ", 0.5);
        assert!(blank.pixels().all(|p| *p == WHITE));
    }
}
