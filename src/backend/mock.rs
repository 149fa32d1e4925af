//! Mock screenshot backend for testing.
//!
//! This module provides [`MockScreenshotter`], a [`Screenshotter`] that
//! never starts a browser. It returns deterministic bytes derived from the
//! job, counts invocations and records every job it receives, so tests can
//! assert on cache behaviour and on the exact geometry passed to the backend.
//!
//! # Availability
//!
//! Only available with the `test-utils` feature or in test builds:
//!
//! ```toml
//! [dev-dependencies]
//! html2raster-api = { version = "0.1", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use html2raster_api::backend::mock::MockScreenshotter;
//!
//! let backend = MockScreenshotter::new();
//! let handle = backend.clone();
//!
//! let renderer = Renderer::builder()
//!     .templates(registry)
//!     .backend(backend)
//!     .build()?;
//!
//! renderer.render(params)?;
//! assert_eq!(handle.call_count(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use super::{CaptureJob, PdfJob, Screenshotter};
use crate::error::{RasterError, Result};

/// A job received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedJob {
    /// A PNG/JPEG capture.
    Capture(CaptureJob),
    /// A PDF print.
    Pdf(PdfJob),
}

/// Recording [`Screenshotter`] for tests.
///
/// Clones share counters and recordings.
#[derive(Clone, Default)]
pub struct MockScreenshotter {
    failure: Option<String>,

    calls: Arc<AtomicUsize>,

    jobs: Arc<Mutex<Vec<RecordedJob>>>,
}

impl MockScreenshotter {
    /// A mock that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails every job with `message`.
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of jobs received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reset the call counter and recordings.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.clear();
        }
    }

    /// Every job received, in order.
    pub fn jobs(&self) -> Vec<RecordedJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    /// The most recent job.
    pub fn last_job(&self) -> Option<RecordedJob> {
        self.jobs().pop()
    }

    fn record(&self, job: RecordedJob, seed: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job);
        }

        if let Some(message) = &self.failure {
            log::debug!("MockScreenshotter: returning configured failure");
            return Err(RasterError::RenderingBackend(message.clone()));
        }

        // Deterministic bytes, identical for identical jobs
        Ok(Sha256::digest(seed).to_vec())
    }
}

impl Screenshotter for MockScreenshotter {
    fn capture(&self, job: &CaptureJob) -> Result<Vec<u8>> {
        let seed = format!(
            "capture|{}|{}|{}|{:?}|{}|{}|{}",
            job.html, job.style, job.width, job.height, job.scale, job.image_type, job.transparent
        );
        self.record(RecordedJob::Capture(job.clone()), seed.as_bytes())
    }

    fn print_pdf(&self, job: &PdfJob) -> Result<Vec<u8>> {
        let seed = format!(
            "pdf|{}|{}|{}|{}|{}",
            job.html, job.style, job.paper_width_mm, job.paper_height_mm, job.scale
        );
        self.record(RecordedJob::Pdf(job.clone()), seed.as_bytes())
    }
}

impl std::fmt::Debug for MockScreenshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScreenshotter")
            .field("failure", &self.failure)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ImageType;

    fn job() -> CaptureJob {
        CaptureJob {
            html: "<p>x</p>".to_string(),
            style: String::new(),
            width: 100,
            height: Some(50),
            scale: 1,
            image_type: ImageType::Png,
            transparent: false,
        }
    }

    #[test]
    fn test_mock_is_deterministic() {
        let mock = MockScreenshotter::new();
        let a = mock.capture(&job()).unwrap();
        let b = mock.capture(&job()).unwrap();

        assert_eq!(a, b);
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_mock_always_fails() {
        let mock = MockScreenshotter::always_fails("Test error");

        match mock.capture(&job()) {
            Err(RasterError::RenderingBackend(msg)) => assert_eq!(msg, "Test error"),
            other => panic!("Expected RenderingBackend error, got {:?}", other),
        }
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_mock_records_jobs_across_clones() {
        let mock = MockScreenshotter::new();
        let handle = mock.clone();

        mock.capture(&job()).unwrap();
        mock.print_pdf(&PdfJob::new(String::new(), String::new(), 960, 540, 2))
            .unwrap();

        assert_eq!(handle.call_count(), 2);
        assert!(matches!(handle.jobs()[0], RecordedJob::Capture(_)));
        assert!(matches!(handle.last_job(), Some(RecordedJob::Pdf(_))));

        handle.reset();
        assert_eq!(mock.call_count(), 0);
        assert!(mock.jobs().is_empty());
    }
}
