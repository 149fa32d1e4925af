//! Convenient imports for common usage patterns.
//!
//! ```rust,ignore
//! use html2raster_api::prelude::*;
//! ```
//!
//! This imports the renderer and its builder, the parameter types, the
//! template registry, the cache, the URL codec, the Chrome backend, the
//! configuration types and the error type.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2raster_api::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let renderer = Renderer::builder()
//!         .templates(TemplateRegistry::with_tera("templates")?)
//!         .backend(ChromeScreenshotter::launch(None)?)
//!         .build()?;
//!
//!     let rendered = renderer.render(
//!         ParameterSet::new("cards.og").with_width(1200).with_height(630),
//!     )?;
//!     std::fs::write(&rendered.filename, &rendered.body)?;
//!     Ok(())
//! }
//! ```

pub use crate::backend::{ChromeScreenshotter, Screenshotter};
pub use crate::cache::CacheStore;
pub use crate::codec::{HmacUrlSigner, UrlCodec};
pub use crate::config::{RasterConfig, RasterConfigBuilder};
pub use crate::error::{RasterError, Result};
pub use crate::params::{DataMap, ImageType, InboundRequest, Mode, ParameterSet};
pub use crate::renderer::{Renderer, RendererBuilder};
pub use crate::service::Rendered;
pub use crate::template::TemplateRegistry;

pub use crate::SharedRenderer;

#[cfg(feature = "env-config")]
pub use crate::init_renderer;

#[cfg(any(test, feature = "test-utils"))]
pub use crate::backend::mock::MockScreenshotter;
