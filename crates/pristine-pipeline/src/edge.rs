//! Sobel edge strength.
//!
//! Produces an [`EdgeMap`] holding the gradient magnitude of the
//! per-pixel gray level (plain mean of R, G, B). The outermost ring of
//! pixels has no full 3×3 neighborhood and is left at zero.

use crate::types::{EdgeMap, RgbaImage};

/// Horizontal Sobel kernel, row-major.
pub const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];

/// Vertical Sobel kernel, row-major.
pub const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Compute the Sobel gradient magnitude for every interior pixel.
///
/// Images narrower or shorter than 3 pixels have no interior and yield
/// an all-zero map.
#[must_use = "returns the edge map"]
pub fn sobel_magnitude(image: &RgbaImage) -> EdgeMap {
    let (width, height) = image.dimensions();
    let mut edges = EdgeMap::zeroed(width, height);
    if width < 3 || height < 3 {
        return edges;
    }

    // Channel sums (3x gray) once up front; each one is read by nine
    // windows. Integer sums keep flat regions at exactly zero.
    let gray3: Vec<i32> = image
        .pixels()
        .map(|p| i32::from(p.0[0]) + i32::from(p.0[1]) + i32::from(p.0[2]))
        .collect();
    let stride = width as usize;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut gx = 0_i32;
            let mut gy = 0_i32;
            for ky in 0..3 {
                let row = (y as usize + ky - 1) * stride;
                for kx in 0..3 {
                    let value = gray3[row + x as usize + kx - 1];
                    gx += value * SOBEL_X[ky * 3 + kx];
                    gy += value * SOBEL_Y[ky * 3 + kx];
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let magnitude = (gx as f32).hypot(gy as f32) / 3.0;
            edges.set(x, y, magnitude);
        }
    }
    edges
}
