//! Floyd-Steinberg error diffusion for 1-bit thermal output.
//!
//! Pixels are visited row-major, top-to-bottom and left-to-right. Each pixel
//! is thresholded at the channel midpoint and the signed residual is pushed
//! to its forward neighbors, which are clamped back into `0..=255` as soon as
//! they are written. Later pixels depend on the error accumulated by earlier
//! ones, so the pass is strictly sequential.

mod kernel;

pub use kernel::{Kernel, FLOYD_STEINBERG};

use image::{DynamicImage, GrayImage};
use tracing::debug;

/// Luminance at or above this value quantizes to white.
pub const THRESHOLD: u8 = 128;

/// Apply Floyd-Steinberg dithering in place.
///
/// After the call every pixel is either 0 or 255. Output depends only on the
/// input pixels.
pub fn floyd_steinberg(raster: &mut GrayImage) {
    error_diffuse(raster, &FLOYD_STEINBERG);
}

/// Convert any decoded image to grayscale and dither it to pure black/white.
pub fn dither_to_mono(img: &DynamicImage) -> GrayImage {
    let mut gray = img.to_luma8();
    floyd_steinberg(&mut gray);
    gray
}

/// Run an error diffusion pass with the given kernel.
pub fn error_diffuse(raster: &mut GrayImage, kernel: &Kernel) {
    let (width, height) = raster.dimensions();
    debug!(width, height, "Applying error diffusion dithering");

    for y in 0..height {
        for x in 0..width {
            quantize_and_diffuse(raster, kernel, x, y);
        }
    }
}

/// Quantize one pixel and distribute its residual. Returns the residual.
fn quantize_and_diffuse(raster: &mut GrayImage, kernel: &Kernel, x: u32, y: u32) -> i16 {
    let (width, height) = raster.dimensions();

    let old = raster.get_pixel(x, y).0[0];
    let new = if old < THRESHOLD { 0 } else { 255 };
    let residual = i16::from(old) - i16::from(new);
    raster.get_pixel_mut(x, y).0[0] = new;

    if residual == 0 {
        return 0;
    }

    let divisor = f32::from(kernel.divisor);
    for &(dx, dy, weight) in kernel.entries {
        let nx = i64::from(x) + i64::from(dx);
        let ny = i64::from(y) + i64::from(dy);
        if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
            continue;
        }

        let pixel = raster.get_pixel_mut(nx as u32, ny as u32);
        let value = f32::from(pixel.0[0]) + f32::from(residual) * f32::from(weight) / divisor;
        pixel.0[0] = value.clamp(0.0, 255.0) as u8;
    }

    residual
}
