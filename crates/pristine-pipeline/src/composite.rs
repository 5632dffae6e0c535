//! Product compositing onto the studio surface.
//!
//! The cropped source is scaled into the centered product box
//! (`product_scale` of the surface side) and drawn over a soft drop
//! shadow. By default it fills the box; [`ProductFit::Contain`] keeps its
//! aspect ratio instead.

use image::GrayImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::surface::blend_over;
use crate::types::{PipelineConfig, ProductFit, RgbaImage, ShadowConfig};

/// Where the product landed on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Left edge on the surface.
    pub x: u32,
    /// Top edge on the surface.
    pub y: u32,
    /// Scaled product width.
    pub width: u32,
    /// Scaled product height.
    pub height: u32,
}

/// Compute the centered placement of a `width`×`height` product inside
/// a `surface_size` square.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn place_product(
    width: u32,
    height: u32,
    surface_size: u32,
    product_scale: f32,
    fit: ProductFit,
) -> Placement {
    let box_side = (f64::from(surface_size) * f64::from(product_scale))
        .round()
        .max(1.0);
    let (scaled_w, scaled_h) = match fit {
        ProductFit::Stretch => (box_side, box_side),
        ProductFit::Contain => {
            let scale =
                (box_side / f64::from(width.max(1))).min(box_side / f64::from(height.max(1)));
            (
                (f64::from(width) * scale).round(),
                (f64::from(height) * scale).round(),
            )
        }
    };
    let scaled_w = (scaled_w as u32).clamp(1, surface_size);
    let scaled_h = (scaled_h as u32).clamp(1, surface_size);
    Placement {
        x: (surface_size - scaled_w) / 2,
        y: (surface_size - scaled_h) / 2,
        width: scaled_w,
        height: scaled_h,
    }
}

/// Scale `product` into the product box and draw it, with its shadow,
/// onto `surface`.
pub fn composite_product(
    surface: &mut RgbaImage,
    product: &RgbaImage,
    config: &PipelineConfig,
) -> Placement {
    let placement = place_product(
        product.width(),
        product.height(),
        surface.width(),
        config.product_scale,
        config.fit,
    );
    let scaled = image::imageops::resize(
        product,
        placement.width,
        placement.height,
        FilterType::CatmullRom,
    );

    draw_shadow(surface, &scaled, placement, &config.shadow);

    for (x, y, px) in scaled.enumerate_pixels() {
        let alpha = f32::from(px.0[3]) / 255.0;
        let rgb = [f32::from(px.0[0]), f32::from(px.0[1]), f32::from(px.0[2])];
        blend_over(
            surface.get_pixel_mut(placement.x + x, placement.y + y),
            rgb,
            alpha,
        );
    }
    placement
}

/// Draw a blurred black silhouette of `scaled`, offset by the shadow
/// offset, clipped to the surface.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn draw_shadow(
    surface: &mut RgbaImage,
    scaled: &RgbaImage,
    placement: Placement,
    shadow: &ShadowConfig,
) {
    if shadow.opacity <= 0.0 {
        return;
    }
    let (sw, sh) = surface.dimensions();
    let mut mask = GrayImage::new(sw, sh);
    for (x, y, px) in scaled.enumerate_pixels() {
        let mx = i64::from(placement.x + x) + i64::from(shadow.offset_x);
        let my = i64::from(placement.y + y) + i64::from(shadow.offset_y);
        if (0..i64::from(sw)).contains(&mx) && (0..i64::from(sh)).contains(&my) {
            mask.put_pixel(mx as u32, my as u32, image::Luma([px.0[3]]));
        }
    }

    // Canvas shadows use a Gaussian with sigma = shadowBlur / 2.
    let sigma = shadow.blur / 2.0;
    let mask = if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&mask, sigma)
    } else {
        mask
    };

    for (dst, m) in surface.pixels_mut().zip(mask.pixels()) {
        let coverage = f32::from(m.0[0]) / 255.0;
        blend_over(dst, [0.0, 0.0, 0.0], shadow.opacity * coverage);
    }
}
