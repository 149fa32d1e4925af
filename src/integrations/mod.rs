//! Web framework integrations.
//!
//! Optional HTTP endpoints serving render URLs produced by
//! [`Renderer::url`](crate::Renderer::url).
//!
//! # Available Integrations
//!
//! | Framework | Feature Flag | Module |
//! |-----------|--------------|--------|
//! | Actix-web | `actix-integration` | `actix` |
//! | Axum | `axum-integration` | `axum` |
//!
//! # Enabling Integrations
//!
//! ```toml
//! [dependencies]
//! html2raster-api = { version = "0.1", features = ["axum-integration"] }
//! ```
//!
//! # Common Pattern
//!
//! 1. Build a [`Renderer`](crate::Renderer) at startup (or call
//!    [`init_renderer`](crate::init_renderer))
//! 2. Share it as [`SharedRenderer`](crate::SharedRenderer)
//! 3. Register the framework's routes under the configured route prefix
//!
//! Every handler delegates to [`service::handle_request`](crate::service::handle_request)
//! on a blocking thread, so framework modules only translate requests and
//! responses.

#[cfg(feature = "actix-integration")]
pub mod actix;

#[cfg(feature = "axum-integration")]
pub mod axum;
