//! Concurrent use of a shared renderer.

mod common;

use std::sync::Arc;

use common::{Fixture, title};
use html2raster_api::prelude::*;
use html2raster_api::service::handle_request;
use tokio::task::JoinSet;

/// Concurrent cached renders of the same parameters all return the same bytes.
///
/// Simultaneous misses may each reach the backend; once any of them has
/// stored its entry later renders are hits.
#[tokio::test]
async fn test_concurrent_cached_renders() {
    let fixture = Fixture::new();
    let backend = fixture.backend.clone();
    let renderer: SharedRenderer = Arc::new(fixture.renderer);

    let params = ParameterSet::new("cards.plain")
        .with_data(title("Concurrent"))
        .with_width(640)
        .with_height(320)
        .with_cache(true);

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let renderer = Arc::clone(&renderer);
        let params = params.clone();
        set.spawn_blocking(move || renderer.render(params));
    }

    let mut bodies = Vec::new();
    while let Some(result) = set.join_next().await {
        bodies.push(result.unwrap().unwrap().body);
    }

    assert_eq!(bodies.len(), 8);
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));

    let calls = backend.call_count();
    assert!((1..=8).contains(&calls), "unexpected call count {}", calls);

    renderer.render(params).unwrap();
    assert_eq!(backend.call_count(), calls);
}

/// Independent requests for different templates do not interfere.
#[tokio::test]
async fn test_concurrent_requests() {
    let fixture = Fixture::new();
    let backend = fixture.backend.clone();
    let renderer: SharedRenderer = Arc::new(fixture.renderer);

    let requests = [
        ("cards.og", "width=1200&data%5Btitle%5D=one"),
        ("cards.og", "width=600&data%5Btitle%5D=two"),
        ("docs.slide", "width=960&height=540"),
        ("cards.og", "width=300&preview=1"),
    ];

    let mut set = JoinSet::new();
    for (name, query) in requests {
        let renderer = Arc::clone(&renderer);
        set.spawn_blocking(move || {
            handle_request(&renderer, name, query).map(|rendered| rendered.content_type)
        });
    }

    let mut content_types = Vec::new();
    while let Some(result) = set.join_next().await {
        content_types.push(result.unwrap().unwrap());
    }
    content_types.sort();

    assert_eq!(
        content_types,
        vec![
            "application/pdf".to_string(),
            "image/png".to_string(),
            "image/png".to_string(),
            "text/html; charset=utf-8".to_string(),
        ]
    );
    // The preview never reaches the backend
    assert_eq!(backend.call_count(), 3);
}
