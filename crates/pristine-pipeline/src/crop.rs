//! Smart crop for supplier layouts.
//!
//! Supplier photos come in two recurring bad shapes: wide banners with
//! several products side by side, and tall images with text bands above
//! and below the product. [`smart_crop`] picks the region worth keeping
//! from the aspect ratio alone.

use crate::types::{CropRect, Dimensions, RgbaImage};

/// Width-to-height ratio above which a source counts as a wide layout.
pub const WIDE_RATIO: f64 = 1.5;

/// Height-to-width ratio above which a source counts as a tall layout.
pub const TALL_RATIO: f64 = 1.3;

/// Fraction of a tall source dropped from the top.
pub const TALL_TOP_TRIM: f64 = 0.15;

/// Fraction of a tall source kept below the top trim.
pub const TALL_KEEP: f64 = 0.75;

/// Compute the crop rectangle for a source of the given dimensions.
///
/// - `w > h * 1.5`: centered square of side `h`.
/// - else `h > w * 1.3`: drop the top 15% and the bottom 10%.
/// - else: the whole image.
///
/// Both comparisons are strict, so `w == 1.5 * h` is left alone.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn smart_crop(source: Dimensions) -> CropRect {
    let w = f64::from(source.width);
    let h = f64::from(source.height);

    if w > h * WIDE_RATIO {
        return CropRect {
            x: (source.width - source.height) / 2,
            y: 0,
            width: source.height,
            height: source.height,
        };
    }

    if h > w * TALL_RATIO {
        // Both products are below `h`, and 0.15 + 0.75 < 1, so the
        // rectangle stays inside the source.
        return CropRect {
            x: 0,
            y: (h * TALL_TOP_TRIM).floor() as u32,
            width: source.width,
            height: (h * TALL_KEEP).floor() as u32,
        };
    }

    CropRect::full(source)
}

/// Copy the cropped region out of `image`.
#[must_use]
pub fn apply_crop(image: &RgbaImage, rect: CropRect) -> RgbaImage {
    image::imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn square_source_is_untouched() {
        assert_eq!(smart_crop(dims(500, 500)), CropRect::full(dims(500, 500)));
    }

    #[test]
    fn wide_source_crops_center_square() {
        let rect = smart_crop(dims(1000, 400));
        assert_eq!(
            rect,
            CropRect {
                x: 300,
                y: 0,
                width: 400,
                height: 400
            }
        );
    }

    #[test]
    fn exactly_one_and_a_half_is_not_wide() {
        assert_eq!(smart_crop(dims(300, 200)), CropRect::full(dims(300, 200)));
        assert_eq!(smart_crop(dims(3000, 2000)), CropRect::full(dims(3000, 2000)));
    }

    #[test]
    fn just_above_one_and_a_half_is_wide() {
        // 15001 / 10000 = 1.5001
        let rect = smart_crop(dims(15_001, 10_000));
        assert_eq!(rect.width, 10_000);
        assert_eq!(rect.height, 10_000);
        assert_eq!(rect.x, 2_500);
    }

    #[test]
    fn tall_source_trims_text_bands() {
        let rect = smart_crop(dims(400, 1000));
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 150,
                width: 400,
                height: 750
            }
        );
    }

    #[test]
    fn exactly_one_point_three_is_not_tall() {
        assert_eq!(smart_crop(dims(100, 130)), CropRect::full(dims(100, 130)));
        assert_eq!(smart_crop(dims(100, 131)).y, 19);
    }

    #[test]
    fn crop_is_deterministic() {
        let a = smart_crop(dims(1234, 567));
        let b = smart_crop(dims(1234, 567));
        assert_eq!(a, b);
    }

    #[test]
    fn apply_crop_copies_region() {
        let img = RgbaImage::from_fn(6, 2, |x, _| image::Rgba([u8::try_from(x).unwrap_or(0), 0, 0, 255]));
        let rect = smart_crop(Dimensions::of(&img));
        let cropped = apply_crop(&img, rect);
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).0[0], 2);
        assert_eq!(cropped.get_pixel(1, 1).0[0], 3);
    }

    proptest! {
        #[test]
        fn crop_stays_within_source(width in 1u32..5000, height in 1u32..5000) {
            let source = dims(width, height);
            let rect = smart_crop(source);
            prop_assert!(rect.fits_within(source));
            prop_assert!(rect.width > 0 && rect.height > 0);
        }
    }
}
