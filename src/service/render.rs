//! Framework-agnostic handling of render requests.
//!
//! [`handle_request`] is the whole HTTP-facing flow minus the framework:
//! signature check, decoding, render. It blocks; integrations run it on a
//! blocking thread with a timeout.

use std::time::Instant;

use crate::error::Result;
use crate::params::InboundRequest;
use crate::renderer::Renderer;

use super::types::Rendered;

/// Default timeout for a render request in seconds.
///
/// Covers decoding, template rendering, cache access and the screenshot
/// backend. The core never enforces it; integrations wrap the blocking
/// call with it:
///
/// ```rust,ignore
/// let result = tokio::time::timeout(
///     Duration::from_secs(DEFAULT_TIMEOUT_SECS),
///     tokio::task::spawn_blocking(move || handle_request(&renderer, &name, &query)),
/// )
/// .await;
/// ```
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Handle an inbound render request for the template `name`.
///
/// `raw_query` is the undecoded query string (without `?`).
///
/// # Errors
///
/// [`RasterError::InvalidSignature`](crate::RasterError::InvalidSignature)
/// when signing is enabled and the signature does not match, plus anything
/// [`Renderer::render`] returns.
///
/// # Blocking
///
/// ⚠️ Runs template rendering and the screenshot backend on the calling
/// thread. Call it from `spawn_blocking` or `web::block` in async code.
pub fn handle_request(renderer: &Renderer, name: &str, raw_query: &str) -> Result<Rendered> {
    let start = Instant::now();
    log::debug!("Render request for '{}'", name);

    let request = InboundRequest::from_query(raw_query);
    let params = renderer.decode_request(name, request)?;
    let rendered = renderer.render(params)?;

    log::info!(
        "Rendered '{}' ({}, {} bytes) in {:?}",
        name,
        rendered.content_type,
        rendered.size(),
        start.elapsed()
    );
    Ok(rendered)
}
