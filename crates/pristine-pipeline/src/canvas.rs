//! Studio surface allocation.
//!
//! Every studio image starts from the same square: a near-white radial
//! gradient with a faint gold accent border inset by 8 pixels.

use tiny_skia::{Paint, PathBuilder, Rect, Stroke, Transform};

use crate::surface::{GradientStop, radial_position, sample_stops, to_byte, with_opaque_pixmap};
use crate::types::RgbaImage;

/// Inset of the accent border from the surface edge, in pixels.
pub const ACCENT_INSET: f32 = 8.0;

/// Accent border color and opacity (`rgba(231, 196, 105, 0.08)`).
const ACCENT_RGBA: [u8; 4] = [231, 196, 105, 20];

fn background_stops() -> [GradientStop; 3] {
    [
        GradientStop::new(0.0, 0xff, 0xff, 0xff, 1.0),
        GradientStop::new(0.7, 0xfe, 0xfe, 0xfe, 1.0),
        GradientStop::new(1.0, 0xf9, 0xf9, 0xf9, 1.0),
    ]
}

/// Allocate an opaque `size`×`size` surface filled with the branded
/// background.
#[must_use]
pub fn studio_surface(size: u32, accent_border: bool) -> RgbaImage {
    let stops = background_stops();
    let mut surface = RgbaImage::from_fn(size, size, |x, y| {
        let [r, g, b, _] = sample_stops(&stops, radial_position(x, y, size));
        image::Rgba([to_byte(r), to_byte(g), to_byte(b), 255])
    });

    if accent_border {
        stroke_accent_border(&mut surface);
    }
    surface
}

#[allow(clippy::cast_precision_loss)]
fn stroke_accent_border(surface: &mut RgbaImage) {
    let side = surface.width() as f32 - 2.0 * ACCENT_INSET;
    let Some(rect) = Rect::from_xywh(ACCENT_INSET, ACCENT_INSET, side, side) else {
        // Surface too small for an inset border.
        return;
    };
    let path = PathBuilder::from_rect(rect);

    let mut paint = Paint::default();
    let [r, g, b, a] = ACCENT_RGBA;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };

    with_opaque_pixmap(surface, |pixmap| {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    });
}
