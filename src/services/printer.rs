//! Receipt printer jobs and device transport.
//!
//! A job holds one device handle for its whole duration: open, write, close.
//! Connections release the device when dropped, so an early return on a write
//! error still frees it.

use axum::body::Bytes;
use booth_raster::{dither_to_mono, resize_to_width, scaled_height, RasterError};
use image::GrayImage;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::PrintError;
use crate::services::escpos;

pub const MAX_COPIES: u8 = 10;

/// Longest raster sent to the printer, in dots (about 2 m of paper at 203 dpi).
pub const MAX_RECEIPT_ROWS: u32 = 16_000;

/// Trait for reaching a printer
pub trait PrinterTransport: Send + Sync {
    /// Acquire the device for one job
    fn open(&self) -> Result<Box<dyn PrinterConnection>, PrintError>;

    /// Human-readable device description for logs
    fn describe(&self) -> String;
}

/// An open printer handle. Dropping it releases the device.
pub trait PrinterConnection: Send {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PrintError>;

    /// Flush and release the device
    fn close(self: Box<Self>) -> Result<(), PrintError>;
}

/// Printer exposed as a character device, e.g. `/dev/usb/lp0`.
pub struct DeviceFileTransport {
    path: PathBuf,
}

impl DeviceFileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PrinterTransport for DeviceFileTransport {
    fn open(&self) -> Result<Box<dyn PrinterConnection>, PrintError> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|source| PrintError::Open {
                device: self.path.display().to_string(),
                source,
            })?;
        Ok(Box::new(FileConnection { file }))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

struct FileConnection {
    file: File,
}

impl PrinterConnection for FileConnection {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PrintError> {
        self.file.write_all(data).map_err(PrintError::Write)
    }

    fn close(mut self: Box<Self>) -> Result<(), PrintError> {
        self.file.flush().map_err(PrintError::Close)
    }
}

/// Bytes captured by [`CaptureTransport`].
#[derive(Debug, Default)]
pub struct CaptureLog {
    /// Data of every job that was closed successfully
    pub jobs: Vec<Vec<u8>>,
    pub opened: usize,
    pub released: usize,
}

/// Printer stand-in that records jobs in memory.
#[derive(Clone, Default)]
pub struct CaptureTransport {
    log: Arc<Mutex<CaptureLog>>,
    fail_writes: bool,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose writes always fail
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Run `f` with the capture log
    pub fn with_log<T>(&self, f: impl FnOnce(&CaptureLog) -> T) -> T {
        let log = match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&log)
    }
}

impl PrinterTransport for CaptureTransport {
    fn open(&self) -> Result<Box<dyn PrinterConnection>, PrintError> {
        if let Ok(mut log) = self.log.lock() {
            log.opened += 1;
        }
        Ok(Box::new(CaptureConnection {
            log: self.log.clone(),
            buffer: Vec::new(),
            fail_writes: self.fail_writes,
        }))
    }

    fn describe(&self) -> String {
        "capture".to_string()
    }
}

struct CaptureConnection {
    log: Arc<Mutex<CaptureLog>>,
    buffer: Vec<u8>,
    fail_writes: bool,
}

impl PrinterConnection for CaptureConnection {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PrintError> {
        if self.fail_writes {
            return Err(PrintError::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "printer disconnected",
            )));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), PrintError> {
        let data = std::mem::take(&mut self.buffer);
        if let Ok(mut log) = self.log.lock() {
            log.jobs.push(data);
        }
        Ok(())
    }
}

impl Drop for CaptureConnection {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.released += 1;
        }
    }
}

/// Encoded ESC/POS job.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    data: Vec<u8>,
}

impl PrintJob {
    /// Plain text receipt followed by a cut
    pub fn text(text: &str) -> Self {
        let mut data = escpos::init();
        data.extend(escpos::align_left());
        data.extend(escpos::text_line(text));
        data.extend(escpos::cut_full_feed());
        Self { data }
    }

    /// `copies` centered prints of a 1-bit image, each followed by a cut
    pub fn image(mono: &GrayImage, copies: u8) -> Self {
        let raster = escpos::raster(mono);
        let mut data = escpos::init();
        data.extend(escpos::align_center());
        for _ in 0..copies {
            data.extend_from_slice(&raster);
            data.extend(escpos::feed_lines(1));
            data.extend(escpos::cut_full_feed());
        }
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Send a job: open, write, close.
pub fn run_job(transport: &dyn PrinterTransport, job: &PrintJob) -> Result<(), PrintError> {
    let mut connection = transport.open()?;
    connection.write_all(job.as_bytes())?;
    connection.close()?;
    tracing::info!(
        device = %transport.describe(),
        bytes = job.as_bytes().len(),
        "Print job sent"
    );
    Ok(())
}

/// Decode an uploaded picture and turn it into printer-ready 1-bit pixels.
pub fn prepare_image(bytes: &[u8], width: u32) -> Result<GrayImage, RasterError> {
    let img = image::load_from_memory(bytes).map_err(RasterError::Decode)?;
    let height = scaled_height(img.width(), img.height(), width);
    if width == 0 || height > MAX_RECEIPT_ROWS {
        return Err(RasterError::InvalidDimensions { width, height });
    }
    let resized = resize_to_width(&img, width);
    Ok(dither_to_mono(&resized))
}

/// Async front for printing; device I/O and dithering run on the blocking pool.
pub struct PrintService {
    transport: Option<Arc<dyn PrinterTransport>>,
    width: u32,
}

impl PrintService {
    pub fn new(transport: Option<Arc<dyn PrinterTransport>>, width: u32) -> Self {
        Self { transport, width }
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn print_text(&self, text: String) -> Result<(), PrintError> {
        let transport = self.transport.clone().ok_or(PrintError::Unavailable)?;
        tokio::task::spawn_blocking(move || run_job(transport.as_ref(), &PrintJob::text(&text)))
            .await
            .map_err(|e| PrintError::Task(e.to_string()))?
    }

    pub async fn print_image(&self, bytes: Bytes, copies: u8) -> Result<(), PrintError> {
        let transport = self.transport.clone().ok_or(PrintError::Unavailable)?;
        let width = self.width;
        tokio::task::spawn_blocking(move || {
            let mono = prepare_image(&bytes, width)?;
            tracing::debug!(
                width = mono.width(),
                height = mono.height(),
                copies,
                "Prepared image for printing"
            );
            run_job(transport.as_ref(), &PrintJob::image(&mono, copies))
        })
        .await
        .map_err(|e| PrintError::Task(e.to_string()))?
    }
}
