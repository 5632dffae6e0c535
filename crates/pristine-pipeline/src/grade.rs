//! Deterministic color grading: a warm-tone bias followed by a contrast
//! stretch around the midpoint.
//!
//! Each step is rounded to the nearest byte (halves up) and clamped
//! before the next one runs, so the whole transform is a fixed per-channel
//! byte mapping. It is precomputed into three 256-entry lookup tables.

use crate::types::RgbaImage;

/// Per-channel gains of the warm-tone bias, in R, G, B order.
pub const WARM_GAINS: [f64; 3] = [1.02, 1.01, 0.98];

/// Contrast stretch factor.
pub const CONTRAST: f64 = 1.08;

/// Value left fixed by the contrast stretch.
pub const MIDPOINT: f64 = 128.0;

/// A color channel the grade adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
}

impl Channel {
    /// All graded channels, in pixel order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Position of the channel in an RGBA pixel.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// Round half up and clamp to a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_byte(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// Warm-tone bias of one channel value.
#[must_use]
pub fn warm(channel: Channel, value: u8) -> u8 {
    round_to_byte(f64::from(value) * WARM_GAINS[channel.index()])
}

/// Contrast stretch of one channel value.
#[must_use]
pub fn contrast(value: u8) -> u8 {
    round_to_byte((f64::from(value) - MIDPOINT) * CONTRAST + MIDPOINT)
}

/// Precomputed per-channel grading tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeTables {
    channels: [[u8; 256]; 3],
}

impl GradeTables {
    /// Build the tables for the warm bias followed by the contrast
    /// stretch.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let channels = Channel::ALL
            .map(|channel| std::array::from_fn(|value| contrast(warm(channel, value as u8))));
        Self { channels }
    }

    /// Graded value of `value` on `channel`.
    #[must_use]
    pub fn map(&self, channel: Channel, value: u8) -> u8 {
        self.channels[channel.index()][usize::from(value)]
    }

    /// Grade every pixel of `image` in place. Alpha is left as is.
    pub fn apply(&self, image: &mut RgbaImage) {
        for px in image.pixels_mut() {
            for channel in Channel::ALL {
                let i = channel.index();
                px.0[i] = self.map(channel, px.0[i]);
            }
        }
    }
}

impl Default for GradeTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Grade `image` in place with freshly built tables.
pub fn grade(image: &mut RgbaImage) {
    GradeTables::new().apply(image);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_gray_numeric_example() {
        assert_eq!(Channel::ALL.map(|c| warm(c, 100)), [102, 101, 98]);
        let mut img = RgbaImage::from_pixel(1, 1, image::Rgba([100, 100, 100, 255]));
        grade(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [100, 99, 96, 255]);
    }

    #[test]
    fn bias_runs_before_contrast() {
        // Blue 250: 245 -> 254 in order, 255 -> 250 reversed.
        let tables = GradeTables::new();
        let value = 250;
        let bias_then_contrast = contrast(warm(Channel::Blue, value));
        let contrast_then_bias = warm(Channel::Blue, contrast(value));
        assert_eq!(tables.map(Channel::Blue, value), bias_then_contrast);
        assert_ne!(bias_then_contrast, contrast_then_bias);
    }

    #[test]
    fn channels_follow_pixel_order() {
        assert_eq!(Channel::ALL.map(Channel::index), [0, 1, 2]);
        let tables = GradeTables::new();
        let mut img = RgbaImage::from_pixel(1, 1, image::Rgba([100, 100, 100, 255]));
        tables.apply(&mut img);
        let px = img.get_pixel(0, 0).0;
        for channel in Channel::ALL {
            assert_eq!(px[channel.index()], tables.map(channel, 100));
        }
    }

    #[test]
    fn extremes_clamp() {
        let tables = GradeTables::new();
        assert_eq!(tables.map(Channel::Red, 0), 0);
        assert_eq!(tables.map(Channel::Red, 255), 255);
        assert_eq!(tables.map(Channel::Blue, 0), 0);
    }

    #[test]
    fn midpoint_is_fixed_point_of_contrast() {
        assert_eq!(contrast(128), 128);
    }

    #[test]
    fn alpha_is_untouched() {
        let mut img = RgbaImage::from_pixel(2, 2, image::Rgba([10, 200, 30, 77]));
        grade(&mut img);
        assert!(img.pixels().all(|p| p.0[3] == 77));
    }

    #[test]
    fn grading_is_deterministic() {
        let src = RgbaImage::from_fn(16, 16, |x, y| {
            image::Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, 255])
        });
        let mut a = src.clone();
        let mut b = src;
        grade(&mut a);
        grade(&mut b);
        assert_eq!(a, b);
    }
}
