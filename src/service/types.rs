//! Shared types for the render service.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Rendered`] | Successful render: bytes plus response metadata |
//! | [`HealthResponse`] | Health check response |
//! | [`ErrorResponse`] | JSON error body (re-exported from [`crate::error`]) |
//!
//! These types carry no framework dependency; the integrations map them
//! onto their own response builders.

use serde::{Deserialize, Serialize};

use crate::params::ImageType;

pub use crate::error::ErrorResponse;

// ============================================================================
// Response Types
// ============================================================================

/// Result of a successful render.
///
/// Holds either image/PDF bytes or, for previews, the instrumented HTML
/// document.
///
/// # Examples
///
/// ```rust
/// use html2raster_api::service::Rendered;
/// use html2raster_api::ImageType;
///
/// let rendered = Rendered::image(vec![0; 512], ImageType::Jpeg, "cards.og");
/// assert_eq!(rendered.content_type, "image/jpeg");
/// assert_eq!(rendered.filename, "cards.og.jpg");
/// assert_eq!(
///     rendered.content_disposition(),
///     "inline; filename=\"cards.og.jpg\""
/// );
/// assert_eq!(rendered.size(), 512);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Response body.
    pub body: Vec<u8>,

    /// MIME type of `body`: the output type's, or `text/html` for previews.
    pub content_type: String,

    /// Suggested filename including extension.
    pub filename: String,
}

impl Rendered {
    /// Rendered image or PDF bytes. `stem` is the filename without extension.
    pub fn image(body: Vec<u8>, image_type: ImageType, stem: &str) -> Self {
        Self {
            body,
            content_type: image_type.mime_type().to_string(),
            filename: format!("{}.{}", stem, image_type.extension()),
        }
    }

    /// Instrumented preview HTML.
    pub fn preview(html: String, stem: &str) -> Self {
        Self {
            body: html.into_bytes(),
            content_type: "text/html; charset=utf-8".to_string(),
            filename: format!("{}.html", stem),
        }
    }

    /// `true` when this is preview HTML.
    pub fn is_preview(&self) -> bool {
        self.content_type.starts_with("text/html")
    }

    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!("inline; filename=\"{}\"", self.filename)
    }

    /// Size of the body in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Health check response.
///
/// ```json
/// {
///     "status": "healthy",
///     "service": "html2raster-api"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the service is responding.
    pub status: String,

    /// Service name.
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
