//! Actix-web framework integration.
//!
//! This module provides a pre-built render handler and route configuration
//! for serving rendered templates from Actix-web.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use actix_web::{App, HttpServer, web};
//! use html2raster_api::prelude::*;
//! use html2raster_api::integrations::actix::configure_routes;
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     env_logger::init();
//!
//!     let renderer = init_renderer().expect("Failed to initialize renderer");
//!     let data = web::Data::from(renderer);
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .app_data(data.clone())
//!             .configure(|cfg| configure_routes(cfg, "/raster"))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! # Available Endpoints
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | `{route}/{name}` | [`render_handler`] | Render a template |
//! | GET | `/health` | [`health_check`] | Health check |
//!
//! # Blocking Operations
//!
//! Rendering blocks on the template engine and Chrome. The handler moves
//! it onto Actix's blocking pool with `web::block` and bounds it with
//! [`DEFAULT_TIMEOUT_SECS`].

use actix_web::{HttpRequest, HttpResponse, Responder, http::header, web};
use std::time::Duration;

use crate::error::RasterError;
use crate::renderer::Renderer;
use crate::service::{self, DEFAULT_TIMEOUT_SECS, ErrorResponse, HealthResponse, Rendered};

/// Actix-web `Data` wrapper around the shared renderer.
///
/// Build it with `web::Data::from(shared_renderer)` or
/// `web::Data::new(renderer)`.
pub type RendererData = web::Data<Renderer>;

// ============================================================================
// Pre-built Handlers
// ============================================================================

/// Render a template.
///
/// # Endpoint
///
/// ```text
/// GET {route}/{name}?width=1200&height=630&data[title]=Hello
/// ```
///
/// The query carries the recognized render parameters (`data[...]`,
/// `width`, `height`, `basis`, `scale`, `type`, `transparent`, `preview`,
/// `cache`, `cacheId`) plus `signature` when signing is enabled.
///
/// # Response
///
/// ## Success (200 OK)
///
/// The rendered bytes with headers:
/// - `Content-Type: image/png` (or `image/jpeg`, `application/pdf`,
///   `text/html` for previews)
/// - `Content-Disposition: inline; filename="cards.og.png"`
/// - `Cache-Control: no-cache`
///
/// ## Errors
///
/// | Status | Code | Description |
/// |--------|------|-------------|
/// | 400 | `MODE_MISMATCH` | Template lacks the raster directive |
/// | 400 | `MISSING_GEOMETRY` | No width, or no height for PDF |
/// | 400 | `INVALID_PARAMETER` | Malformed parameter value |
/// | 401 | `INVALID_SIGNATURE` | Missing or wrong signature |
/// | 404 | `TEMPLATE_NOT_FOUND` | Unknown template |
/// | 502 | `RENDERING_BACKEND_FAILURE` | Chrome failed |
/// | 504 | `TIMEOUT` | Render took too long |
pub async fn render_handler(
    renderer: RendererData,
    path: web::Path<String>,
    request: HttpRequest,
) -> impl Responder {
    let name = path.into_inner();
    let query = request.query_string().to_string();
    let renderer = renderer.into_inner();

    log::debug!("Render request: {} ({} byte query)", name, query.len());

    let result = tokio::time::timeout(
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        web::block(move || service::handle_request(&renderer, &name, &query)),
    )
    .await;

    match result {
        Ok(Ok(Ok(rendered))) => build_render_response(rendered),
        Ok(Ok(Err(e))) => build_error_response(e),
        Ok(Err(blocking_err)) => {
            log::error!("Blocking task error: {}", blocking_err);
            build_error_response(RasterError::Internal(blocking_err.to_string()))
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

/// Health check endpoint.
///
/// ```text
/// GET /health
/// ```
///
/// Always `200 OK` with a [`HealthResponse`] body.
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse::default())
}

// ============================================================================
// Route Configuration
// ============================================================================

/// Register the render route under `route` and `/health`.
///
/// ```rust,ignore
/// App::new()
///     .app_data(web::Data::from(renderer.clone()))
///     .configure(|cfg| configure_routes(cfg, "/raster"))
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig, route: &str) {
    let render_path = format!("{}/{{name}}", route.trim_end_matches('/'));
    cfg.route(&render_path, web::get().to(render_handler))
        .route("/health", web::get().to(health_check));
}

// ============================================================================
// Response Builders (Internal)
// ============================================================================

fn build_render_response(rendered: Rendered) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(rendered.content_type.as_str())
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONTENT_DISPOSITION, rendered.content_disposition()))
        .body(rendered.body)
}

fn build_error_response(error: RasterError) -> HttpResponse {
    let status_code = error.status_code();
    let body = ErrorResponse::from(&error);

    log::warn!("Render error: {} (HTTP {})", error, status_code);

    match status_code {
        400 => HttpResponse::BadRequest().json(body),
        401 => HttpResponse::Unauthorized().json(body),
        404 => HttpResponse::NotFound().json(body),
        502 => HttpResponse::BadGateway().json(body),
        504 => HttpResponse::GatewayTimeout().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockScreenshotter;
    use crate::template::TemplateRegistry;
    use actix_web::{App, test};

    fn renderer(dir: &std::path::Path) -> Renderer {
        let root = dir.join("templates");
        std::fs::create_dir_all(root.join("cards")).unwrap();
        std::fs::write(
            root.join("cards/og.html.tera"),
            "{% raster height=630 %}<h1>{{ title }}</h1>",
        )
        .unwrap();

        Renderer::builder()
            .templates(TemplateRegistry::with_tera(&root).unwrap())
            .backend(MockScreenshotter::new())
            .build()
            .unwrap()
    }

    #[actix_web::test]
    async fn test_render_route_returns_image() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(renderer(dir.path())))
                .configure(|cfg| configure_routes(cfg, "/raster")),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/raster/cards.og?width=1200&data%5Btitle%5D=Hi")
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), 200);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"cards.og.png\""
        );
    }

    #[actix_web::test]
    async fn test_render_route_maps_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(renderer(dir.path())))
                .configure(|cfg| configure_routes(cfg, "/raster/")),
        )
        .await;

        let missing = test::TestRequest::get()
            .uri("/raster/cards.none?width=10")
            .to_request();
        let response = test::call_service(&app, missing).await;
        assert_eq!(response.status(), 404);

        let no_width = test::TestRequest::get().uri("/raster/cards.og").to_request();
        let body: ErrorResponse = test::call_and_read_body_json(&app, no_width).await;
        assert_eq!(body.code, "MISSING_GEOMETRY");
    }

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(App::new().route("/health", web::get().to(health_check))).await;
        let request = test::TestRequest::get().uri("/health").to_request();
        let body: HealthResponse = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body.status, "healthy");
    }
}
