//! Pixel classification: promotional sticker cleanup and background
//! removal.
//!
//! These are two separate heuristics that happen to share a vocabulary
//! (colors, neighborhoods, edge strength):
//!
//! - [`clean_promotional`] recolors saturated sticker colors with the
//!   average of their calm neighbors. Opacity is never touched. Used by
//!   the studio pipeline.
//! - [`remove_background`] makes border-colored, low-edge pixels fully
//!   transparent. Used by the cutout pipeline.
//!
//! Both read their inputs from a snapshot of the buffer taken before the
//! pass, so every decision depends only on the original pixel and its
//! fixed neighborhood, never on pixels already rewritten in the same pass.

use crate::types::{BackgroundCluster, Color, EdgeMap, RgbaImage};

/// Neighborhood radius for the promotional recolor (7×7 window).
pub const NEUTRAL_RADIUS: i64 = 3;

/// Replacement used when a sticker pixel has no calm neighbor.
pub const NEUTRAL_FALLBACK: Color = Color::new(245, 245, 245);

/// A pixel closer than this (Euclidean RGB) to a cluster matches it.
pub const BACKGROUND_DISTANCE: u32 = 40;

/// Edge strength below which an interior pixel may be background.
pub const LOW_EDGE_THRESHOLD: f32 = 30.0;

/// Fraction of each dimension treated as the near border margin.
pub const BORDER_MARGIN: f64 = 0.05;

/// Fraction of each dimension beyond which the far border margin starts.
pub const BORDER_MARGIN_FAR: f64 = 0.95;

/// Whether `color` looks like a sale badge or promotional sticker.
///
/// Matches saturated red, yellow/orange, green, blue, and magenta.
#[must_use]
pub const fn is_promotional(color: Color) -> bool {
    let Color { r, g, b } = color;
    // Red sale badges.
    (r > 220 && g < 80 && b < 80)
        // Yellow / orange.
        || (r > 220 && g > 180 && b < 80)
        // Bright green.
        || (r < 80 && g > 220 && b < 120)
        // Bright blue.
        || (r < 80 && g < 120 && b > 220)
        // Magenta / purple.
        || (r > 200 && g < 100 && b > 200)
}

/// Recolor promotional pixels in place. Returns how many were recolored.
///
/// Each match takes the rounded mean RGB of the non-promotional pixels in
/// its 7×7 window (clipped to the image), or [`NEUTRAL_FALLBACK`] when
/// there are none. Alpha is left as is.
pub fn clean_promotional(image: &mut RgbaImage) -> usize {
    let snapshot = image.clone();
    let mut recolored = 0;
    for (x, y, px) in image.enumerate_pixels_mut() {
        if !is_promotional(Color::from_rgba(*px)) {
            continue;
        }
        let neutral = neutral_color(&snapshot, x, y);
        px.0[0] = neutral.r;
        px.0[1] = neutral.g;
        px.0[2] = neutral.b;
        recolored += 1;
    }
    recolored
}

/// Mean color of the non-promotional pixels around `(x, y)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn neutral_color(image: &RgbaImage, x: u32, y: u32) -> Color {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let mut totals = [0_u64; 3];
    let mut count = 0_u64;

    for dy in -NEUTRAL_RADIUS..=NEUTRAL_RADIUS {
        for dx in -NEUTRAL_RADIUS..=NEUTRAL_RADIUS {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }
            let neighbor = Color::from_rgba(*image.get_pixel(nx as u32, ny as u32));
            if is_promotional(neighbor) {
                continue;
            }
            totals[0] += u64::from(neighbor.r);
            totals[1] += u64::from(neighbor.g);
            totals[2] += u64::from(neighbor.b);
            count += 1;
        }
    }

    if count == 0 {
        return NEUTRAL_FALLBACK;
    }
    // Round half up: (2 * sum + count) / (2 * count).
    let avg = |total: u64| ((2 * total + count) / (2 * count)) as u8;
    Color::new(avg(totals[0]), avg(totals[1]), avg(totals[2]))
}

/// Whether `(x, y)` lies in the outer 5% margin of a `width`×`height`
/// image.
#[must_use]
pub fn in_border_margin(x: u32, y: u32, width: u32, height: u32) -> bool {
    let (fx, fy) = (f64::from(x), f64::from(y));
    let (w, h) = (f64::from(width), f64::from(height));
    fx < w * BORDER_MARGIN
        || fx > w * BORDER_MARGIN_FAR
        || fy < h * BORDER_MARGIN
        || fy > h * BORDER_MARGIN_FAR
}

/// Whether `color` is strictly closer than [`BACKGROUND_DISTANCE`] to any
/// cluster.
#[must_use]
pub fn matches_background(color: Color, clusters: &[BackgroundCluster]) -> bool {
    let limit = BACKGROUND_DISTANCE * BACKGROUND_DISTANCE;
    clusters
        .iter()
        .any(|c| color.distance_squared(c.color) < limit)
}

/// Make background pixels transparent in place. Returns how many pixels
/// were cleared.
///
/// A pixel is background iff it matches a cluster (see
/// [`matches_background`]) and it either lies in the border margin or
/// its edge strength is below [`LOW_EDGE_THRESHOLD`]. With no clusters,
/// nothing is cleared.
///
/// `edges` must have the same dimensions as `image`; pixels outside the
/// map read as zero strength.
pub fn remove_background(
    image: &mut RgbaImage,
    edges: &EdgeMap,
    clusters: &[BackgroundCluster],
) -> usize {
    if clusters.is_empty() {
        return 0;
    }
    let (width, height) = image.dimensions();
    let mut cleared = 0;
    for (x, y, px) in image.enumerate_pixels_mut() {
        if !matches_background(Color::from_rgba(*px), clusters) {
            continue;
        }
        if in_border_margin(x, y, width, height) || edges.get(x, y) < LOW_EDGE_THRESHOLD {
            px.0[3] = 0;
            cleared += 1;
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: image::Rgba<u8> = image::Rgba([200, 200, 200, 255]);
    const RED: image::Rgba<u8> = image::Rgba([230, 50, 40, 255]);

    fn cluster(r: u8, g: u8, b: u8) -> BackgroundCluster {
        BackgroundCluster {
            color: Color::new(r, g, b),
            count: 1,
        }
    }

    // --- promotional predicate ---

    #[test]
    fn promotional_families_match() {
        assert!(is_promotional(Color::new(230, 50, 40)));
        assert!(is_promotional(Color::new(240, 200, 20)));
        assert!(is_promotional(Color::new(20, 240, 100)));
        assert!(is_promotional(Color::new(20, 100, 240)));
        assert!(is_promotional(Color::new(210, 50, 210)));
    }

    #[test]
    fn neutral_colors_do_not_match() {
        assert!(!is_promotional(Color::new(200, 200, 200)));
        assert!(!is_promotional(Color::new(0, 0, 0)));
        assert!(!is_promotional(Color::new(255, 255, 255)));
        // Thresholds are strict.
        assert!(!is_promotional(Color::new(220, 50, 40)));
        assert!(!is_promotional(Color::new(230, 80, 40)));
    }

    // --- clean_promotional ---

    #[test]
    fn red_patch_takes_neighbor_average_and_keeps_alpha() {
        let mut img = RgbaImage::from_fn(9, 9, |x, y| {
            if (3..6).contains(&x) && (3..6).contains(&y) {
                RED
            } else {
                GRAY
            }
        });
        let recolored = clean_promotional(&mut img);
        assert_eq!(recolored, 9);
        for y in 3..6 {
            for x in 3..6 {
                assert_eq!(img.get_pixel(x, y).0, [200, 200, 200, 255]);
            }
        }
    }

    #[test]
    fn average_is_rounded_half_up() {
        // Neighbors 10 and 11 -> mean 10.5 -> 11.
        let mut img = RgbaImage::from_pixel(3, 1, image::Rgba([10, 10, 10, 255]));
        img.put_pixel(1, 0, RED);
        img.put_pixel(2, 0, image::Rgba([11, 11, 11, 255]));
        clean_promotional(&mut img);
        assert_eq!(img.get_pixel(1, 0).0, [11, 11, 11, 255]);
    }

    #[test]
    fn large_patch_interior_falls_back_to_neutral() {
        let mut img = RgbaImage::from_pixel(9, 9, RED);
        clean_promotional(&mut img);
        assert_eq!(img.get_pixel(4, 4).0, [245, 245, 245, 255]);
    }

    #[test]
    fn semi_transparent_sticker_keeps_its_alpha() {
        let mut img = RgbaImage::from_pixel(5, 5, GRAY);
        img.put_pixel(2, 2, image::Rgba([230, 50, 40, 90]));
        clean_promotional(&mut img);
        assert_eq!(img.get_pixel(2, 2).0, [200, 200, 200, 90]);
    }

    #[test]
    fn recolor_reads_snapshot_not_partial_output() {
        // Two adjacent red pixels in a 2x1 image: each one's only
        // neighbor is red in the snapshot, so both fall back.
        let mut img = RgbaImage::from_pixel(2, 1, RED);
        clean_promotional(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [245, 245, 245, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [245, 245, 245, 255]);
    }

    #[test]
    fn clean_is_deterministic() {
        let base = RgbaImage::from_fn(16, 16, |x, y| {
            if (x + y) % 5 == 0 { RED } else { GRAY }
        });
        let mut a = base.clone();
        let mut b = base;
        clean_promotional(&mut a);
        clean_promotional(&mut b);
        assert_eq!(a, b);
    }

    // --- remove_background ---

    #[test]
    fn distance_forty_is_not_background() {
        // (24, 32, 0) is exactly 40 away from black.
        let clusters = [cluster(0, 0, 0)];
        assert!(!matches_background(Color::new(24, 32, 0), &clusters));
        // (24, 31, 0) is ~39.4 away.
        assert!(matches_background(Color::new(24, 31, 0), &clusters));
    }

    #[test]
    fn no_clusters_clears_nothing() {
        let mut img = RgbaImage::from_pixel(10, 10, GRAY);
        let edges = EdgeMap::zeroed(10, 10);
        assert_eq!(remove_background(&mut img, &edges, &[]), 0);
        assert!(img.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn border_margin_clears_even_with_strong_edges() {
        let mut img = RgbaImage::from_pixel(100, 100, image::Rgba([255, 255, 255, 255]));
        let edges = EdgeMap::filled(100, 100, 500.0);
        let clusters = [cluster(255, 255, 255)];
        remove_background(&mut img, &edges, &clusters);
        for (x, y, px) in img.enumerate_pixels() {
            if in_border_margin(x, y, 100, 100) {
                assert_eq!(px.0[3], 0, "ring pixel ({x}, {y}) should be transparent");
            } else {
                assert_eq!(px.0[3], 255, "interior pixel ({x}, {y}) should be opaque");
            }
        }
    }

    #[test]
    fn interior_clears_only_where_edges_are_weak() {
        let mut img = RgbaImage::from_pixel(100, 100, image::Rgba([255, 255, 255, 255]));
        let mut edges = EdgeMap::zeroed(100, 100);
        edges.set(50, 50, 30.0);
        edges.set(40, 40, 29.9);
        let clusters = [cluster(255, 255, 255)];
        remove_background(&mut img, &edges, &clusters);
        assert_eq!(img.get_pixel(50, 50).0[3], 255);
        assert_eq!(img.get_pixel(40, 40).0[3], 0);
        assert_eq!(img.get_pixel(20, 70).0[3], 0);
    }

    #[test]
    fn non_matching_colors_stay_opaque_in_margin() {
        let mut img = RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 255]));
        let edges = EdgeMap::zeroed(20, 20);
        let clusters = [cluster(255, 255, 255)];
        assert_eq!(remove_background(&mut img, &edges, &clusters), 0);
    }

    #[test]
    fn border_margin_bounds_for_hundred_pixels() {
        assert!(in_border_margin(4, 50, 100, 100));
        assert!(!in_border_margin(5, 50, 100, 100));
        assert!(!in_border_margin(95, 50, 100, 100));
        assert!(in_border_margin(96, 50, 100, 100));
        assert!(in_border_margin(50, 99, 100, 100));
    }
}
