//! booth-raster: raster transforms for a receipt photobooth
//!
//! Two small, single-pass transforms live here:
//!
//! - [`dither`]: Floyd-Steinberg error diffusion that turns a grayscale
//!   raster into pure black/white for thermal printing.
//! - [`gif`]: a compositor that fits a sequence of photos onto one canvas and
//!   muxes them into an infinitely looping animated GIF.
//!
//! Both operate on [`image`] buffers and are synchronous and CPU-bound. Callers
//! running inside an async runtime should move them onto a blocking thread.
//!
//! # Quick Start
//!
//! ```
//! use booth_raster::dither::floyd_steinberg;
//! use image::{GrayImage, Luma};
//!
//! let mut raster = GrayImage::from_pixel(4, 4, Luma([100]));
//! floyd_steinberg(&mut raster);
//! assert!(raster.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
//! ```
//!
//! ```
//! use booth_raster::gif::{GifCompositor, GifOptions};
//! use image::{DynamicImage, RgbImage};
//!
//! let frames = vec![
//!     DynamicImage::ImageRgb8(RgbImage::new(40, 30)),
//!     DynamicImage::ImageRgb8(RgbImage::new(40, 30)),
//!     DynamicImage::ImageRgb8(RgbImage::new(20, 30)),
//! ];
//! let gif = GifCompositor::new(GifOptions::default()).compose(&frames).unwrap();
//! assert!(gif.is_some());
//! ```

pub mod canvas;
pub mod dither;
pub mod error;
pub mod gif;

pub use canvas::{contain, fit_within, resize_to_width, scaled_height};
pub use dither::{dither_to_mono, floyd_steinberg, Kernel, FLOYD_STEINBERG};
pub use error::RasterError;
pub use gif::{GifCompositor, GifOptions};
