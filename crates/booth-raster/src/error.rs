//! Error type for raster operations.

use thiserror::Error;

/// Errors raised while decoding, compositing or encoding rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Input bytes could not be decoded as an image
    #[error("image decode error: {0}")]
    Decode(#[source] image::ImageError),

    /// The GIF encoder rejected a frame or failed to write
    #[error("gif encode error: {0}")]
    Encode(#[source] image::ImageError),

    /// A frame did not match the canvas it was supposed to be fitted to
    #[error("frame {index} is {width}x{height}, expected {canvas_width}x{canvas_height}")]
    FrameSize {
        index: usize,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    /// Requested size is zero or too large to render
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}
