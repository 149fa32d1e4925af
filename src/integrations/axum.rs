//! Axum framework integration.
//!
//! Provides a render handler, a health route and a ready-made [`Router`]
//! wired to a [`SharedRenderer`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use html2raster_api::prelude::*;
//! use html2raster_api::integrations::axum::router;
//!
//! #[tokio::main]
//! async fn main() {
//!     env_logger::init();
//!
//!     let renderer = init_renderer().expect("Failed to initialize renderer");
//!     let app = router(renderer);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! Mount under a different prefix with [`router_at`], or use
//! [`render_handler`] directly in your own router:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/og/{name}", get(render_handler))
//!     .with_state(renderer)
//! ```

use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::time::Duration;

use crate::SharedRenderer;
use crate::error::RasterError;
use crate::renderer::Renderer;
use crate::service::{self, DEFAULT_TIMEOUT_SECS, ErrorResponse, HealthResponse, Rendered};

/// Type alias for Axum `State` extractor with the shared renderer.
///
/// ```rust,ignore
/// async fn handler(RendererState(renderer): RendererState) -> impl IntoResponse {
///     // ...
/// }
/// ```
pub type RendererState = State<SharedRenderer>;

/// Extension trait for [`Renderer`] with Axum helpers.
pub trait RendererAxumExt {
    /// Convert the renderer into a form suitable for `with_state()`.
    fn into_axum_state(self) -> SharedRenderer;

    /// Build a [`Router`] serving this renderer under `route`.
    fn into_router(self, route: &str) -> Router;
}

impl RendererAxumExt for Renderer {
    fn into_axum_state(self) -> SharedRenderer {
        std::sync::Arc::new(self)
    }

    fn into_router(self, route: &str) -> Router {
        router_at(self.into_axum_state(), route)
    }
}

/// Router serving renders under the codec's route plus `/health`, so it
/// answers the URLs [`Renderer::url`] generates.
pub fn router(renderer: SharedRenderer) -> Router {
    let route = renderer.codec().route();
    router_at(renderer, &route)
}

/// Router serving renders under `route` plus `/health`.
pub fn router_at(renderer: SharedRenderer, route: &str) -> Router {
    let render_path = format!("{}/{{name}}", route.trim_end_matches('/'));
    Router::new()
        .route(&render_path, get(render_handler))
        .route("/health", get(health_check))
        .with_state(renderer)
}

/// Render the template named in the path with the raw query parameters.
///
/// Rendering runs in `spawn_blocking`, bounded by [`DEFAULT_TIMEOUT_SECS`].
/// Errors become a JSON [`ErrorResponse`] with the status from
/// [`RasterError::status_code`].
pub async fn render_handler(
    State(renderer): RendererState,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    log::debug!("Render request: {} ({} byte query)", name, query.len());

    let result = tokio::time::timeout(
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        tokio::task::spawn_blocking(move || service::handle_request(&renderer, &name, &query)),
    )
    .await;

    match result {
        Ok(Ok(Ok(rendered))) => build_render_response(rendered),
        Ok(Ok(Err(e))) => build_error_response(e),
        Ok(Err(join_err)) => {
            log::error!("Blocking task error: {}", join_err);
            build_error_response(RasterError::Internal(join_err.to_string()))
        }
        Err(_timeout) => {
            log::error!("Render timed out after {} seconds", DEFAULT_TIMEOUT_SECS);
            build_error_response(RasterError::Timeout(format!(
                "Operation timed out after {} seconds",
                DEFAULT_TIMEOUT_SECS
            )))
        }
    }
}

/// Health check. Always `200 OK`.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

fn build_render_response(rendered: Rendered) -> Response {
    let disposition = rendered.content_disposition();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, rendered.content_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.body,
    )
        .into_response()
}

fn build_error_response(error: RasterError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    log::warn!("Render error: {} (HTTP {})", error, status.as_u16());
    (status, Json(ErrorResponse::from(&error))).into_response()
}
