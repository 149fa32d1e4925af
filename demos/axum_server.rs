//! Axum render server.
//!
//! Run with:
//! ```bash
//! cargo run --example axum_server --features axum-integration
//! ```
//!
//! Configuration comes from `app.env` or the environment (see
//! `html2raster_api::config::env`). Templates live in `RASTER_TEMPLATES_DIR`
//! (default `templates/`); a template `templates/cards/og.html.tera` such as
//!
//! ```text
//! {% raster width=1200 height=630 %}
//! <h1>{{ title }}</h1>
//! ```
//!
//! is then served at http://localhost:3000/raster/cards.og?data[title]=Hello
//! and http://localhost:3000/link/cards.og?title=Hello returns that URL.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use html2raster_api::integrations::axum::router;
use html2raster_api::{DataMap, ErrorResponse, ParameterSet, SharedRenderer, init_renderer};
use tokio::signal;

/// Handler that returns the render URL for `name` with the query as data.
async fn render_link(
    State(renderer): State<SharedRenderer>,
    Path(name): Path<String>,
    Query(data): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let data: DataMap = data
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect();

    let url = renderer
        .url(&ParameterSet::new(name).with_data(data).with_cache(true))
        .map_err(|e| {
            log::error!("Failed to build render URL: {}", e);
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::from(&e)))
        })?;

    Ok(Json(serde_json::json!({ "url": url.as_str() })))
}

/// Shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting render server...");

    let renderer = init_renderer().expect("Failed to initialize renderer");
    let route = renderer.codec().route();

    let app = router(renderer.clone()).merge(
        axum::Router::new()
            .route("/link/{name}", get(render_link))
            .with_state(renderer),
    );

    log::info!("Serving renders on http://localhost:3000{}/{{name}}", route);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}
