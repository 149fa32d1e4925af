//! # html2raster-api
//!
//! Render server-side templates to PNG, JPEG or PDF through headless Chrome.
//!
//! A template is rendered to HTML, wrapped in a layout, styled for the
//! requested geometry and handed to a screenshot backend. Results can be
//! cached on disk, and every render has a URL that reproduces it.
//!
//! ## Features
//!
//! - **Two render modes**: manual renders from code, automatic renders from
//!   an inbound URL whose parameters the template itself may pin with a
//!   `{% raster %}` directive
//! - **Render cache**: content-addressed files with optional TTL and
//!   per-template invalidation
//! - **Render URLs**: canonical, optionally HMAC-signed
//! - **Preview**: return the styled HTML instead of an image
//! - **Web Framework Integration**: optional Actix-web and Axum routes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │         Your Web Application                │
//! │          (Actix-web / Axum)                 │
//! └─────────────────┬───────────────────────────┘
//!                   │  GET {route}/{name}?...
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │                Renderer                     │
//! │  UrlCodec ──► ParameterSet ──► validate     │
//! │  TemplateRegistry ──► HTML + layout + style │
//! │  CacheStore (lookup / store)                │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │        Screenshotter (headless Chrome)      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use html2raster_api::prelude::*;
//!
//! let renderer = Renderer::builder()
//!     .templates(TemplateRegistry::with_tera("templates")?)
//!     .backend(ChromeScreenshotter::launch(None)?)
//!     .cache(CacheStore::local("storage/raster"))
//!     .build()?;
//!
//! let params = ParameterSet::new("cards.og")
//!     .with_data(data)
//!     .with_width(1200)
//!     .with_height(630);
//!
//! let png = renderer.render(params.clone())?;
//! let url = renderer.url(&params)?; // reproduces the same render over HTTP
//! ```
//!
//! ## Environment Configuration
//!
//! With the `env-config` feature, [`init_renderer`] builds everything from
//! environment variables (loaded from an `app.env` file or the system
//! environment):
//!
//! ```rust,no_run
//! use html2raster_api::init_renderer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let renderer = init_renderer()?;
//!     // renderer is Arc<Renderer>, ready for web handlers
//!     Ok(())
//! }
//! ```
//!
//! ### Environment Variables
//!
//! | Variable | Type | Default | Description |
//! |----------|------|---------|-------------|
//! | `RASTER_ROUTE` | String | `/raster` | Path prefix of render URLs |
//! | `RASTER_BASE_URL` | String | `http://localhost` | Scheme and host of render URLs |
//! | `RASTER_TEMPLATES_DIR` | Path | `templates` | Template root |
//! | `RASTER_LAYOUT` | String | `raster.layout` | Layout template |
//! | `RASTER_CACHE_ENABLED` | bool | true | Global cache switch |
//! | `RASTER_CACHE_DIR` | Path | `storage/raster` | Cache root |
//! | `RASTER_CACHE_PREFIX` | String | none | Cache subdirectory |
//! | `RASTER_CACHE_TTL_SECONDS` | u64 | none | Cache entry lifetime |
//! | `RASTER_SIGN_URLS` | bool | false | Require signed URLs |
//! | `RASTER_SIGNING_KEY` | String | none | HMAC key |
//! | `CHROME_PATH` | String | auto | Custom Chrome binary path |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `env-config` | Enable environment-based configuration |
//! | `actix-integration` | Actix-web framework integration |
//! | `axum-integration` | Axum framework integration |
//! | `test-utils` | Enable the mock screenshot backend |
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, RasterError>`](Result):
//!
//! ```rust,ignore
//! use html2raster_api::RasterError;
//!
//! match renderer.render(params) {
//!     Ok(rendered) => { /* serve rendered.body */ }
//!     Err(RasterError::ModeMismatch { name, .. }) => {
//!         // Template and mode disagree about the raster directive
//!     }
//!     Err(e) if e.is_retryable() => {
//!         // Chrome or cache hiccup
//!     }
//!     Err(e) => eprintln!("Render failed: {}", e),
//! }
//! ```
//!
//! ## Testing
//!
//! For testing without Chrome, enable the `test-utils` feature and use
//! [`MockScreenshotter`](backend::mock::MockScreenshotter).

#![doc(html_root_url = "https://docs.rs/html2raster-api/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Modules
// ============================================================================

pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod params;
pub mod prelude;
pub mod renderer;
pub mod service;
pub mod style;
pub mod template;

// ============================================================================
// Feature-gated modules
// ============================================================================

/// Web framework integrations.
///
/// - `actix-integration` for Actix-web
/// - `axum-integration` for Axum
#[cfg(any(feature = "actix-integration", feature = "axum-integration"))]
pub mod integrations;

// ============================================================================
// Re-exports (Public API)
// ============================================================================

pub use backend::{CaptureJob, ChromeScreenshotter, PdfJob, Screenshotter};
pub use cache::{CacheParams, CacheStore, FileStore, LocalFileStore};
pub use codec::{HmacUrlSigner, UrlCodec, UrlSigner};
pub use config::{RasterConfig, RasterConfigBuilder};
pub use error::{ErrorResponse, RasterError, Result};
pub use params::{DataMap, DataSource, ImageType, InboundRequest, Mode, ParameterSet};
pub use renderer::{RenderStage, Renderer, RendererBuilder};
pub use service::Rendered;
pub use template::{TemplateHandler, TemplateRegistry};

// Feature-gated re-exports
#[cfg(feature = "env-config")]
pub use config::env::{chrome_path_from_env, from_env};

#[cfg(feature = "env-config")]
pub use renderer::init_renderer;

// ============================================================================
// Convenience type aliases
// ============================================================================

/// Shared renderer type for web frameworks.
///
/// [`Renderer`] is immutable after build, so it is shared without a lock.
pub type SharedRenderer = std::sync::Arc<Renderer>;
