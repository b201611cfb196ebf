//! Canvas sizing and aspect-preserving resize helpers.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::error::RasterError;

/// Scale `(width, height)` down to fit within `(max_width, max_height)`.
///
/// Never scales up. The aspect ratio is preserved and each side is rounded and
/// kept at least 1. A zero side falls back to the corresponding maximum.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let width = if width == 0 { max_width } else { width };
    let height = if height == 0 { max_height } else { height };

    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let w = (f64::from(width) * ratio).round().max(1.0) as u32;
    let h = (f64::from(height) * ratio).round().max(1.0) as u32;
    (w, h)
}

/// Fit `img` inside a `width`x`height` canvas, padding with `background`.
///
/// The image is scaled (up or down) so that it touches the canvas on at least
/// one axis, centered, and composited onto a solid background. The result is
/// always RGBA and exactly `width`x`height`.
pub fn contain(
    img: &DynamicImage,
    width: u32,
    height: u32,
    background: Rgba<u8>,
) -> Result<RgbaImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::InvalidDimensions { width, height });
    }
    let (src_w, src_h) = (img.width(), img.height());
    if src_w == 0 || src_h == 0 {
        return Err(RasterError::InvalidDimensions {
            width: src_w,
            height: src_h,
        });
    }

    let scale =
        (f64::from(width) / f64::from(src_w)).min(f64::from(height) / f64::from(src_h));
    let inner_w = ((f64::from(src_w) * scale).round() as u32).clamp(1, width);
    let inner_h = ((f64::from(src_h) * scale).round() as u32).clamp(1, height);

    let rgba = img.to_rgba8();
    let inner = if (inner_w, inner_h) == (src_w, src_h) {
        rgba
    } else {
        imageops::resize(&rgba, inner_w, inner_h, FilterType::Lanczos3)
    };

    let mut canvas = RgbaImage::from_pixel(width, height, background);
    let x = (width - inner_w) / 2;
    let y = (height - inner_h) / 2;
    imageops::overlay(&mut canvas, &inner, i64::from(x), i64::from(y));

    Ok(canvas)
}

/// Height of a `width x height` image scaled to `target_width`, at least 1.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 || width == target_width {
        return height;
    }
    let ratio = f64::from(target_width) / f64::from(width);
    ((f64::from(height) * ratio).round() as u32).max(1)
}

/// Resize to a target width keeping the aspect ratio.
///
/// Returns a clone when the image already has that width.
pub fn resize_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    let (orig_w, orig_h) = (img.width(), img.height());

    if orig_w == width || orig_w == 0 {
        return img.clone();
    }

    let new_height = scaled_height(orig_w, orig_h, width);

    debug!(
        orig_w,
        orig_h,
        new_width = width,
        new_height,
        "Resizing image to target width"
    );

    img.resize_exact(width, new_height, FilterType::Lanczos3)
}
