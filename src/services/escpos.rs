//! ESC/POS command builders for receipt printers.
//!
//! Each function returns the raw bytes of one command so jobs can be
//! assembled by concatenation.

use image::GrayImage;

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// Rows per `GS v 0` block. Many printers cap a single raster command well
/// below the 16-bit limit.
const BAND_ROWS: u32 = 256;

/// Lines fed before cutting so the last printed row clears the blade
const CUT_FEED_LINES: u8 = 3;

/// `ESC @`: reset the printer.
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// `ESC a 1`: center following content.
pub fn align_center() -> Vec<u8> {
    vec![ESC, b'a', 1]
}

/// `ESC a 0`: left-align following content.
pub fn align_left() -> Vec<u8> {
    vec![ESC, b'a', 0]
}

/// `ESC d n`: print buffer and feed `n` lines.
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

/// A line of text followed by LF.
///
/// Characters outside printable ASCII are replaced with `?`; the printer's
/// default code page cannot render them.
pub fn text_line(text: &str) -> Vec<u8> {
    let mut out: Vec<u8> = text
        .chars()
        .map(|c| match c {
            '\n' => LF,
            c if c.is_ascii() && !c.is_ascii_control() => c as u8,
            _ => b'?',
        })
        .collect();
    out.push(LF);
    out
}

/// Feed then `GS V 0`: full cut.
pub fn cut_full_feed() -> Vec<u8> {
    let mut out = feed_lines(CUT_FEED_LINES);
    out.extend([GS, b'V', 0]);
    out
}

/// Pack one image row into bytes, MSB first, black pixels as set bits.
///
/// Any pixel below mid-gray counts as black.
pub fn pack_row(img: &GrayImage, y: u32) -> Vec<u8> {
    let width = img.width();
    let mut row = vec![0u8; width.div_ceil(8) as usize];
    for x in 0..width {
        if img.get_pixel(x, y).0[0] < 128 {
            row[(x / 8) as usize] |= 0x80 >> (x % 8);
        }
    }
    row
}

/// `GS v 0` raster bit image, emitted in bands of at most 256 rows.
pub fn raster(img: &GrayImage) -> Vec<u8> {
    let (width, height) = img.dimensions();
    let bytes_per_row = width.div_ceil(8);
    let mut out = Vec::with_capacity((bytes_per_row * height) as usize + 16);

    let mut top = 0;
    while top < height {
        let rows = BAND_ROWS.min(height - top);
        out.extend([
            GS,
            b'v',
            b'0',
            0,
            (bytes_per_row & 0xFF) as u8,
            (bytes_per_row >> 8) as u8,
            (rows & 0xFF) as u8,
            (rows >> 8) as u8,
        ]);
        for y in top..top + rows {
            out.extend(pack_row(img, y));
        }
        top += rows;
    }
    out
}
