//! Screenshot backends.
//!
//! This module provides the [`Screenshotter`] trait, the seam between the
//! render pipeline and whatever turns HTML into image bytes, plus the job
//! descriptions passed across it.
//!
//! # Available Backends
//!
//! - [`ChromeScreenshotter`] - Headless Chrome via `headless_chrome`
//! - [`mock::MockScreenshotter`] - Recording fake for tests (requires
//!   `test-utils` feature or test mode)
//!
//! # Custom Backends
//!
//! ```rust,ignore
//! use html2raster_api::backend::{CaptureJob, PdfJob, Screenshotter};
//! use html2raster_api::Result;
//!
//! struct RemoteRenderer { endpoint: String }
//!
//! impl Screenshotter for RemoteRenderer {
//!     fn capture(&self, job: &CaptureJob) -> Result<Vec<u8>> { /* ... */ }
//!     fn print_pdf(&self, job: &PdfJob) -> Result<Vec<u8>> { /* ... */ }
//! }
//! ```

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeScreenshotter, create_chrome_options};

use crate::error::Result;
use crate::params::ImageType;

/// CSS pixels per inch.
pub const CSS_PX_PER_INCH: f64 = 96.0;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Raster capture of an HTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureJob {
    /// Complete HTML document.
    pub html: String,
    /// Extra stylesheet injected into the page.
    pub style: String,
    /// Window width in CSS pixels.
    pub width: u32,
    /// Window height in CSS pixels; `None` captures the full page.
    pub height: Option<u32>,
    /// Device scale factor.
    pub scale: u32,
    /// PNG or JPEG.
    pub image_type: ImageType,
    /// Keep the page background transparent.
    pub transparent: bool,
}

impl CaptureJob {
    /// `true` when the capture should grow to the document's height.
    pub fn full_page(&self) -> bool {
        self.height.is_none()
    }
}

/// Single-page PDF print of an HTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfJob {
    /// Complete HTML document.
    pub html: String,
    /// Extra stylesheet injected into the page.
    pub style: String,
    /// Window width in CSS pixels.
    pub width: u32,
    /// Window height in CSS pixels.
    pub height: u32,
    /// Paper width in millimeters.
    pub paper_width_mm: f64,
    /// Paper height in millimeters.
    pub paper_height_mm: f64,
    /// Print scale.
    pub scale: u32,
}

impl PdfJob {
    /// Build a job whose paper exactly fits `width × height` pixels at `scale`.
    pub fn new(html: String, style: String, width: u32, height: u32, scale: u32) -> Self {
        Self {
            html,
            style,
            width,
            height,
            paper_width_mm: px_to_mm(width, scale),
            paper_height_mm: px_to_mm(height, scale),
            scale,
        }
    }
}

/// `px / 96 * 25.4 * scale`.
pub fn px_to_mm(px: u32, scale: u32) -> f64 {
    f64::from(px) / CSS_PX_PER_INCH * MM_PER_INCH * f64::from(scale)
}

/// Turns HTML into image or PDF bytes.
///
/// Implementations must be thread-safe. Failures are reported as
/// [`RasterError::RenderingBackend`](crate::RasterError::RenderingBackend)
/// and are never retried by the caller.
pub trait Screenshotter: Send + Sync {
    /// Capture a PNG or JPEG.
    fn capture(&self, job: &CaptureJob) -> Result<Vec<u8>>;

    /// Print a single-page PDF.
    fn print_pdf(&self, job: &PdfJob) -> Result<Vec<u8>>;
}

/// Shared handles delegate to the inner backend.
impl<T: Screenshotter + ?Sized> Screenshotter for std::sync::Arc<T> {
    fn capture(&self, job: &CaptureJob) -> Result<Vec<u8>> {
        (**self).capture(job)
    }

    fn print_pdf(&self, job: &PdfJob) -> Result<Vec<u8>> {
        (**self).print_pdf(job)
    }
}
