//! Render service module.
//!
//! The **framework-agnostic core** of the HTTP surface: shared response
//! types and the request handling reused by every framework integration.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   service module (this module)                │
//! │  ┌──────────────────────┐   ┌──────────────────────────────┐  │
//! │  │      types.rs        │   │          render.rs           │  │
//! │  │  Rendered            │   │  handle_request()            │  │
//! │  │  HealthResponse      │   │  DEFAULT_TIMEOUT_SECS        │  │
//! │  │  ErrorResponse       │   │                              │  │
//! │  └──────────────────────┘   └──────────────────────────────┘  │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 │ used by
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     integrations module                       │
//! │        actix.rs (handlers)          axum.rs (handlers)        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers stay thin: they extract the template name and raw query, run
//! [`handle_request`] on a blocking thread and map [`Rendered`] or the
//! error onto a response.
//!
//! # Custom Handlers
//!
//! ```rust,ignore
//! use html2raster_api::service::{handle_request, ErrorResponse};
//!
//! async fn custom_handler(renderer: SharedRenderer, name: String, query: String) -> Response {
//!     log::info!("Custom handler called for: {}", name);
//!
//!     let result = tokio::task::spawn_blocking(move || {
//!         handle_request(&renderer, &name, &query)
//!     })
//!     .await;
//!     // map result ...
//! }
//! ```

mod render;
mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::ErrorResponse;
pub use types::HealthResponse;
pub use types::Rendered;

pub use render::DEFAULT_TIMEOUT_SECS;
pub use render::handle_request;

// ============================================================================
// Module-level tests
// ============================================================================
