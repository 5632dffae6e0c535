//! Background color estimation from the border ring.
//!
//! Product subjects are assumed to be centered, so the outermost ring of
//! pixels is a cheap proxy for "what the background looks like". Ring
//! samples are grouped greedily by per-channel tolerance and the three
//! most common groups are kept.

use crate::types::{BackgroundCluster, Color, RgbaImage};

/// Per-channel absolute difference below which a sample joins a cluster.
pub const CLUSTER_TOLERANCE: u8 = 30;

/// Number of clusters retained.
pub const MAX_CLUSTERS: usize = 3;

/// Sample the outermost ring of `image`.
///
/// Order: for each column, the top then bottom pixel; then for each row,
/// the left then right pixel. Corner pixels are therefore sampled twice,
/// and a single-row or single-column image samples each pixel twice.
#[must_use]
pub fn border_samples(image: &RgbaImage) -> Vec<Color> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let mut samples = Vec::with_capacity(2 * (width as usize + height as usize));
    for x in 0..width {
        samples.push(Color::from_rgba(*image.get_pixel(x, 0)));
        samples.push(Color::from_rgba(*image.get_pixel(x, height - 1)));
    }
    for y in 0..height {
        samples.push(Color::from_rgba(*image.get_pixel(0, y)));
        samples.push(Color::from_rgba(*image.get_pixel(width - 1, y)));
    }
    samples
}

/// Greedily cluster `samples`.
///
/// Each sample joins the first cluster whose representative is within
/// [`CLUSTER_TOLERANCE`] on every channel, otherwise it starts a new
/// cluster. Representatives never move. The result is sorted by count,
/// descending, ties keeping first-seen order.
#[must_use]
pub fn cluster_colors(samples: &[Color]) -> Vec<BackgroundCluster> {
    let mut clusters: Vec<BackgroundCluster> = Vec::new();
    for &sample in samples {
        let existing = clusters.iter_mut().find(|c| {
            c.color.r.abs_diff(sample.r) < CLUSTER_TOLERANCE
                && c.color.g.abs_diff(sample.g) < CLUSTER_TOLERANCE
                && c.color.b.abs_diff(sample.b) < CLUSTER_TOLERANCE
        });
        match existing {
            Some(cluster) => cluster.count += 1,
            None => clusters.push(BackgroundCluster {
                color: sample,
                count: 1,
            }),
        }
    }
    // `sort_by` is stable.
    clusters.sort_by(|a, b| b.count.cmp(&a.count));
    clusters
}

/// The up to [`MAX_CLUSTERS`] dominant background colors of `image`.
#[must_use]
pub fn detect_background(image: &RgbaImage) -> Vec<BackgroundCluster> {
    let mut clusters = cluster_colors(&border_samples(image));
    clusters.truncate(MAX_CLUSTERS);
    clusters
}
