//! Animated GIF compositor.
//!
//! Takes the photos of one booth session, drops the cover shot, fits the rest
//! onto a shared canvas and encodes an infinitely looping GIF.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, Rgba, RgbaImage};
use tracing::{debug, info};

use crate::canvas::{contain, fit_within};
use crate::error::RasterError;

/// Compositor settings.
#[derive(Debug, Clone)]
pub struct GifOptions {
    /// Upper bound for the canvas width
    pub max_width: u32,
    /// Upper bound for the canvas height
    pub max_height: u32,
    /// Display time of every frame in milliseconds
    pub frame_delay_ms: u32,
    /// Quantizer speed, 1 (best) to 30 (fastest)
    pub speed: i32,
    /// Fill color for letterbox/pillarbox padding
    pub background: Rgba<u8>,
    /// Drop the first frame (the cover shot) before compositing
    pub skip_cover: bool,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            frame_delay_ms: 1500,
            speed: 10,
            background: Rgba([255, 255, 255, 255]),
            skip_cover: true,
        }
    }
}

/// Builds animated GIFs from ordered photo frames.
#[derive(Debug, Clone, Default)]
pub struct GifCompositor {
    options: GifOptions,
}

impl GifCompositor {
    pub fn new(options: GifOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GifOptions {
        &self.options
    }

    /// Canvas size derived from the first usable frame.
    pub fn canvas_for(&self, first: &DynamicImage) -> (u32, u32) {
        fit_within(
            first.width(),
            first.height(),
            self.options.max_width,
            self.options.max_height,
        )
    }

    /// Composite `frames` into GIF bytes.
    ///
    /// Returns `Ok(None)` when fewer than two frames are given.
    pub fn compose(&self, frames: &[DynamicImage]) -> Result<Option<Vec<u8>>, RasterError> {
        if frames.len() < 2 {
            debug!(frames = frames.len(), "Not enough frames for a GIF");
            return Ok(None);
        }

        let usable = if self.options.skip_cover {
            &frames[1..]
        } else {
            frames
        };
        let Some(first) = usable.first() else {
            return Ok(None);
        };

        let (canvas_w, canvas_h) = self.canvas_for(first);
        let fitted = usable
            .iter()
            .map(|frame| contain(frame, canvas_w, canvas_h, self.options.background))
            .collect::<Result<Vec<_>, _>>()?;

        let bytes = self.encode(fitted, canvas_w, canvas_h)?;

        info!(
            frames = usable.len(),
            width = canvas_w,
            height = canvas_h,
            bytes = bytes.len(),
            "Composited GIF"
        );

        Ok(Some(bytes))
    }

    /// Decode raw image files and composite them.
    pub fn compose_encoded<B: AsRef<[u8]>>(
        &self,
        files: &[B],
    ) -> Result<Option<Vec<u8>>, RasterError> {
        let frames = files
            .iter()
            .map(|bytes| image::load_from_memory(bytes.as_ref()).map_err(RasterError::Decode))
            .collect::<Result<Vec<_>, _>>()?;
        self.compose(&frames)
    }

    fn encode(
        &self,
        frames: Vec<RgbaImage>,
        canvas_w: u32,
        canvas_h: u32,
    ) -> Result<Vec<u8>, RasterError> {
        for (index, frame) in frames.iter().enumerate() {
            let (width, height) = frame.dimensions();
            if (width, height) != (canvas_w, canvas_h) {
                return Err(RasterError::FrameSize {
                    index,
                    width,
                    height,
                    canvas_width: canvas_w,
                    canvas_height: canvas_h,
                });
            }
        }

        let delay = Delay::from_numer_denom_ms(self.options.frame_delay_ms, 1);
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut buf, self.options.speed);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(RasterError::Encode)?;
            for frame in frames {
                encoder
                    .encode_frame(Frame::from_parts(frame, 0, 0, delay))
                    .map_err(RasterError::Encode)?;
            }
        }
        Ok(buf)
    }
}
