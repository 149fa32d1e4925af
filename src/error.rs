//! Error types for the render pipeline.
//!
//! This module provides [`RasterError`], a unified error type for every
//! stage of a render (validation, template rendering, the screenshot
//! backend and the file cache), a convenient [`Result`] type alias and
//! the serializable [`ErrorResponse`] used at the HTTP boundary.
//!
//! # Example
//!
//! ```rust
//! use html2raster_api::{RasterError, Result};
//!
//! fn render_card() -> Result<Vec<u8>> {
//!     Err(RasterError::MissingGeometry("width"))
//! }
//!
//! match render_card() {
//!     Ok(png) => println!("Rendered {} bytes", png.len()),
//!     Err(e) if e.status_code() == 400 => println!("Bad request: {}", e),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! Errors are returned to the immediate caller unchanged. Nothing in the
//! core logs, retries or swallows them.

use serde::{Deserialize, Serialize};

use crate::params::Mode;

/// Errors that can occur while rendering a template to an image.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The template's fingerprint marker contradicts the render mode.
    ///
    /// Automatic renders require the template to carry the raster
    /// directive, manual renders require it to be absent. This always
    /// indicates a misconfigured template.
    ///
    /// # Example
    ///
    /// ```rust
    /// use html2raster_api::{Mode, RasterError};
    ///
    /// let error = RasterError::ModeMismatch {
    ///     name: "cards.og".to_string(),
    ///     mode: Mode::Automatic,
    /// };
    /// assert_eq!(
    ///     error.to_string(),
    ///     "Template 'cards.og' must contain the raster directive in automatic mode"
    /// );
    /// ```
    #[error("Template '{name}' {} the raster directive in {mode} mode", .mode.directive_requirement())]
    ModeMismatch {
        /// Template name.
        name: String,
        /// Mode of the failed render.
        mode: Mode,
    },

    /// No handler is registered for a template file extension, or the
    /// requested output type is unknown.
    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    /// A required dimension could not be resolved before rendering.
    ///
    /// `width` is always required (it falls back to `basis`), `height`
    /// is required for PDF output.
    #[error("Missing geometry: {0} must be set")]
    MissingGeometry(&'static str),

    /// A parameter value is malformed or out of range.
    #[error("Invalid parameter '{key}': {reason}")]
    InvalidParameter {
        /// Parameter key as it appears in a URL.
        key: String,
        /// Human readable reason.
        reason: String,
    },

    /// The named template could not be located.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template engine failed to compile or render a template.
    #[error("Template rendering failed: {0}")]
    Template(String),

    /// The screenshot backend failed (browser crash, navigation timeout, ...).
    #[error("Rendering backend failed: {0}")]
    RenderingBackend(String),

    /// The cache storage failed to read, write or delete.
    ///
    /// A failed read is never treated as a cache hit.
    #[error("Cache I/O failed: {0}")]
    CacheIo(#[from] std::io::Error),

    /// A signed render URL carried a missing or invalid signature.
    #[error("Invalid or missing URL signature")]
    InvalidSignature,

    /// An integration gave up waiting for a render.
    #[error("Render timed out: {0}")]
    Timeout(String),

    /// An integration failed to run the render at all (e.g. the blocking
    /// task panicked).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid configuration provided.
    ///
    /// # Example
    ///
    /// ```rust
    /// use html2raster_api::RasterError;
    ///
    /// let error = RasterError::Configuration("route must start with '/'".to_string());
    /// println!("{}", error); // "Configuration error: route must start with '/'"
    /// ```
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RasterError {
    /// Build an [`InvalidParameter`](RasterError::InvalidParameter) error.
    pub fn invalid_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status code for this error.
    ///
    /// Validation, mode and type errors are client errors, signature
    /// failures are `401`, backend and storage failures are server errors.
    pub fn status_code(&self) -> u16 {
        match self {
            // Client errors (4xx)
            Self::ModeMismatch { .. }
            | Self::UnsupportedResourceType(_)
            | Self::MissingGeometry(_)
            | Self::InvalidParameter { .. } => 400,
            Self::InvalidSignature => 401,
            Self::TemplateNotFound(_) => 404,

            // Upstream errors
            Self::RenderingBackend(_) => 502,
            Self::Timeout(_) => 504,

            // Server errors (5xx)
            Self::Template(_) | Self::CacheIo(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ModeMismatch { .. } => "MODE_MISMATCH",
            Self::UnsupportedResourceType(_) => "UNSUPPORTED_RESOURCE_TYPE",
            Self::MissingGeometry(_) => "MISSING_GEOMETRY",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::RenderingBackend(_) => "RENDERING_BACKEND_FAILURE",
            Self::CacheIo(_) => "CACHE_IO_FAILURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Whether a caller may reasonably retry the same render.
    ///
    /// The library never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transient upstream failures
            Self::RenderingBackend(_) | Self::CacheIo(_) | Self::Timeout(_) => true,

            // Everything else needs a different request or configuration
            _ => false,
        }
    }
}

/// Convenience conversion from [`String`] to [`RasterError::Configuration`].
impl From<String> for RasterError {
    fn from(msg: String) -> Self {
        RasterError::Configuration(msg)
    }
}

/// Convenience conversion from `&str` to [`RasterError::Configuration`].
impl From<&str> for RasterError {
    fn from(msg: &str) -> Self {
        RasterError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`RasterError`].
pub type Result<T> = std::result::Result<T, RasterError>;

/// JSON body returned by the HTTP integrations on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,

    /// Machine-readable code from [`RasterError::error_code`].
    pub code: String,
}

impl From<&RasterError> for ErrorResponse {
    fn from(err: &RasterError) -> Self {
        Self {
            error: err.to_string(),
            code: err.error_code().to_string(),
        }
    }
}

impl From<RasterError> for ErrorResponse {
    fn from(err: RasterError) -> Self {
        Self::from(&err)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let error: RasterError = "test error".into();
        match error {
            RasterError::Configuration(msg) => {
                assert_eq!(msg, "test error", "Error message should be preserved");
            }
            _ => panic!("Expected Configuration error variant"),
        }

        let error: RasterError = "another error".to_string().into();
        assert!(matches!(error, RasterError::Configuration(_)));
    }

    #[test]
    fn test_io_error_converts_to_cache_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: RasterError = io.into();
        assert!(matches!(error, RasterError::CacheIo(_)));
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn test_mode_mismatch_display() {
        let error = RasterError::ModeMismatch {
            name: "cards.og".to_string(),
            mode: Mode::Manual,
        };
        assert_eq!(
            error.to_string(),
            "Template 'cards.og' must not contain the raster directive in manual mode"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RasterError::MissingGeometry("height").to_string(),
            "Missing geometry: height must be set"
        );
        assert_eq!(
            RasterError::invalid_parameter("scale", "must be positive").to_string(),
            "Invalid parameter 'scale': must be positive"
        );
        assert_eq!(
            RasterError::InvalidSignature.to_string(),
            "Invalid or missing URL signature"
        );
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(RasterError::MissingGeometry("width").status_code(), 400);
        assert_eq!(
            RasterError::UnsupportedResourceType("gif".to_string()).status_code(),
            400
        );
        assert_eq!(RasterError::InvalidSignature.status_code(), 401);
        assert_eq!(
            RasterError::TemplateNotFound("x".to_string()).status_code(),
            404
        );
        assert_eq!(
            RasterError::RenderingBackend("crash".to_string()).status_code(),
            502
        );
        assert_eq!(RasterError::Template("x".to_string()).status_code(), 500);
        assert_eq!(RasterError::Timeout("60s".to_string()).status_code(), 504);
        assert_eq!(RasterError::Internal("panic".to_string()).error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_retryable() {
        assert!(RasterError::RenderingBackend("timeout".to_string()).is_retryable());
        assert!(!RasterError::MissingGeometry("width").is_retryable());
        assert!(!RasterError::InvalidSignature.is_retryable());
    }

    #[test]
    fn test_error_response_from_error() {
        let response = ErrorResponse::from(RasterError::TemplateNotFound("cards.og".to_string()));
        assert_eq!(response.code, "TEMPLATE_NOT_FOUND");
        assert!(response.error.contains("cards.og"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<RasterError>();
    }
}
