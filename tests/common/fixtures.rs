//! Test fixtures: encoded images and multipart bodies.

use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage};
use std::io::Cursor;

/// Solid-color JPEG
pub fn jpeg(width: u32, height: u32, value: u8) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value; 3]))),
        ImageFormat::Jpeg,
    )
}

/// Grayscale PNG with a horizontal gradient
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::GrayImage::from_fn(width, height, |x, _| {
        Luma([(x * 255 / width.max(1)) as u8])
    });
    encode(DynamicImage::ImageLuma8(img), ImageFormat::Png)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode fixture image");
    bytes
}

/// Hand-built `multipart/form-data` body
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "receiptbooth-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    /// Add a text field
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .into_bytes(),
        );
        self
    }

    /// Add a file part
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .into_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the body
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend(format!("--{}--\r\n", self.boundary).into_bytes());
        self.body
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}
