//! Integration tests for the render pipeline.

mod common;

use common::{Fixture, title};
use html2raster_api::backend::mock::{MockScreenshotter, RecordedJob};
use html2raster_api::cache::CacheParams;
use html2raster_api::params::DEFAULT_CACHE_ID;
use html2raster_api::prelude::*;
use html2raster_api::service::handle_request;
use serde_json::json;

fn plain(title_text: &str) -> ParameterSet {
    ParameterSet::new("cards.plain")
        .with_data(title(title_text))
        .with_width(400)
        .with_height(200)
}

/// Without the cache flag every render reaches the backend.
#[test]
fn test_uncached_renders_always_capture() {
    let fixture = Fixture::new();

    fixture.renderer.render(plain("A")).unwrap();
    fixture.renderer.render(plain("A")).unwrap();

    assert_eq!(fixture.backend.call_count(), 2);
}

/// A cached render is served from disk the second time, byte for byte.
#[test]
fn test_cache_hit_is_idempotent() {
    let fixture = Fixture::new();
    let params = plain("A").with_cache(true);

    let first = fixture.renderer.render(params.clone()).unwrap();
    let second = fixture.renderer.render(params.clone()).unwrap();

    assert_eq!(first.body, second.body);
    assert_eq!(fixture.backend.call_count(), 1);

    // Other data is another entry
    fixture.renderer.render(plain("B").with_cache(true)).unwrap();
    assert_eq!(fixture.backend.call_count(), 2);

    // So is another bucket
    fixture
        .renderer
        .render(params.with_cache_id("v2"))
        .unwrap();
    assert_eq!(fixture.backend.call_count(), 3);
}

/// Preview never touches the backend or the cache.
#[test]
fn test_preview_skips_backend_and_cache() {
    let fixture = Fixture::new();
    let params = plain("Preview").with_cache(true);

    let rendered = fixture
        .renderer
        .render(params.clone().with_preview(true))
        .unwrap();

    assert!(rendered.is_preview());
    assert_eq!(rendered.filename, "cards.plain.html");
    let html = String::from_utf8(rendered.body).unwrap();
    assert!(html.contains("<h1>Preview</h1>"));
    assert!(html.contains("<style>"));
    assert_eq!(fixture.backend.call_count(), 0);

    let key = CacheParams::new(&params, title("Preview"));
    assert!(
        fixture
            .cache()
            .get("cards.plain", DEFAULT_CACHE_ID, &key)
            .unwrap()
            .is_none()
    );
}

/// Templates without the directive only render manually, and vice versa.
#[test]
fn test_mode_must_match_directive() {
    let fixture = Fixture::new();

    let automatic = ParameterSet::automatic("cards.plain", InboundRequest::from_query("width=100"));
    assert!(matches!(
        fixture.renderer.render(automatic),
        Err(RasterError::ModeMismatch {
            mode: Mode::Automatic,
            ..
        })
    ));

    let manual = ParameterSet::new("cards.og").with_width(100);
    assert!(matches!(
        fixture.renderer.render(manual),
        Err(RasterError::ModeMismatch {
            mode: Mode::Manual,
            ..
        })
    ));

    assert!(fixture.renderer.render(plain("ok")).is_ok());
    assert_eq!(fixture.backend.call_count(), 1);
}

/// Directive values win over the request.
#[test]
fn test_directive_overrides_request() {
    let fixture = Fixture::new();

    let params = ParameterSet::automatic(
        "cards.og",
        InboundRequest::from_query("width=1200&height=100&data%5Btitle%5D=Hi"),
    );
    fixture.renderer.render(params).unwrap();

    match fixture.backend.last_job() {
        Some(RecordedJob::Capture(job)) => {
            assert_eq!(job.width, 1200);
            assert_eq!(job.height, Some(630));
            assert!(job.html.contains("<h1>Hi</h1>"));
        }
        other => panic!("expected a capture, got {:?}", other),
    }
}

/// PDF paper is sized from the pixel geometry and scale.
#[test]
fn test_pdf_paper_size() {
    let fixture = Fixture::new();

    let params = ParameterSet::automatic(
        "docs.slide",
        InboundRequest::from_query("width=960&height=540&scale=2"),
    );
    let rendered = fixture.renderer.render(params).unwrap();
    assert_eq!(rendered.content_type, "application/pdf");

    match fixture.backend.last_job() {
        Some(RecordedJob::Pdf(job)) => {
            assert!((job.paper_width_mm - 508.0).abs() < 1e-9);
            assert!((job.paper_height_mm - 285.75).abs() < 1e-9);
            assert_eq!(job.scale, 2);
        }
        other => panic!("expected a PDF print, got {:?}", other),
    }
}

/// Width falls back to basis; PDF additionally needs a height.
#[test]
fn test_missing_geometry() {
    let fixture = Fixture::new();

    assert!(matches!(
        fixture.renderer.render(ParameterSet::new("cards.plain")),
        Err(RasterError::MissingGeometry("width"))
    ));

    fixture
        .renderer
        .render(ParameterSet::new("cards.plain").with_basis(800))
        .unwrap();
    match fixture.backend.last_job() {
        Some(RecordedJob::Capture(job)) => {
            assert_eq!(job.width, 800);
            assert!(job.full_page());
        }
        other => panic!("expected a capture, got {:?}", other),
    }

    let pdf = ParameterSet::automatic("docs.slide", InboundRequest::from_query("width=960"));
    assert!(matches!(
        fixture.renderer.render(pdf),
        Err(RasterError::MissingGeometry("height"))
    ));
}

/// Decoding an encoded URL gives back every explicitly set field.
#[test]
fn test_url_round_trip() {
    let fixture = Fixture::new();
    let params = ParameterSet::new("cards.og")
        .with_data(title("Round trip"))
        .with_width(1200)
        .with_height(630)
        .with_basis(1000)
        .with_scale(2)
        .with_type(ImageType::Jpeg)
        .with_transparent(true)
        .with_cache(true)
        .with_cache_id("v2");

    let url = fixture.renderer.url(&params).unwrap();
    assert!(url.as_str().starts_with("https://example.com/raster/cards.og?"));

    let codec = fixture.renderer.codec();
    let (name, request) = codec.parse_url(&url).unwrap();
    let decoded = codec.decode(&name, request).unwrap();

    assert_eq!(decoded.name(), "cards.og");
    assert_eq!(decoded.mode(), Mode::Automatic);
    assert_eq!(decoded.width(), Some(1200));
    assert_eq!(decoded.height(), Some(630));
    assert_eq!(decoded.basis(), Some(1000));
    assert_eq!(decoded.scale(), 2);
    assert_eq!(decoded.image_type(), ImageType::Jpeg);
    assert!(decoded.transparent());
    assert!(decoded.cache());
    assert_eq!(decoded.cache_id(), "v2");
    assert_eq!(
        decoded.data().as_literal().and_then(|d| d.get("title")),
        Some(&json!("Round trip"))
    );
}

/// The URL of a render reproduces it over HTTP, and hits its cache entry.
#[test]
fn test_url_reproduces_render() {
    let fixture = Fixture::new();
    let params = ParameterSet::new("cards.og")
        .with_data(title("Shared"))
        .with_width(1200)
        .with_height(630)
        .with_cache(true);

    let url = fixture.renderer.url(&params).unwrap();
    let query = url.query().unwrap_or_default();

    let first = handle_request(&fixture.renderer, "cards.og", query).unwrap();
    let second = handle_request(&fixture.renderer, "cards.og", query).unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.backend.call_count(), 1);
}

/// Forgetting a bucket removes its entries; flushing removes everything.
#[test]
fn test_cache_forget_and_flush() {
    let fixture = Fixture::new();

    let a = plain("A").with_cache(true);
    let b = plain("B").with_cache(true).with_cache_id("team");
    fixture.renderer.render(a.clone()).unwrap();
    fixture.renderer.render(b.clone()).unwrap();

    let key_a = CacheParams::new(&a, title("A"));
    let key_b = CacheParams::new(&b, title("B"));
    let cache = fixture.cache();
    assert!(cache.get("cards.plain", DEFAULT_CACHE_ID, &key_a).unwrap().is_some());
    assert!(cache.get("cards.plain", "team", &key_b).unwrap().is_some());

    cache.forget_default(["cards.plain"]).unwrap();
    assert!(cache.get("cards.plain", DEFAULT_CACHE_ID, &key_a).unwrap().is_none());
    assert!(cache.get("cards.plain", "team", &key_b).unwrap().is_some());

    cache.flush().unwrap();
    assert!(cache.get("cards.plain", "team", &key_b).unwrap().is_none());

    // Forgetting and flushing an empty cache is fine
    cache.forget(["cards.plain"], ["team"]).unwrap();
    cache.flush().unwrap();
}

/// Signed URLs are accepted as generated and rejected once modified.
#[test]
fn test_signed_urls() {
    let fixture = Fixture::with_builder(|builder| {
        builder.codec(
            UrlCodec::new("https://example.com", "/raster")
                .unwrap()
                .with_signer(HmacUrlSigner::new("integration-secret").unwrap()),
        )
    });

    let url = fixture
        .renderer
        .url(&ParameterSet::new("cards.og").with_width(1200))
        .unwrap();
    let query = url.query().unwrap();
    assert!(query.contains("signature="));
    assert!(handle_request(&fixture.renderer, "cards.og", query).is_ok());

    let tampered = query.replace("width=1200", "width=1201");
    assert!(matches!(
        handle_request(&fixture.renderer, "cards.og", &tampered),
        Err(RasterError::InvalidSignature)
    ));
    assert_eq!(fixture.backend.call_count(), 1);
}

/// A registered resolver turns inbound data into template data.
#[test]
fn test_registered_resolver() {
    let fixture = Fixture::with_builder(|builder| {
        builder.resolver("cards.og", |input: &DataMap| {
            let user = input
                .get("user")
                .and_then(|v| v.as_str())
                .unwrap_or("nobody");
            let mut data = DataMap::new();
            data.insert("title".to_string(), json!(format!("Hello {}", user)));
            Ok(data)
        })
    });

    let rendered = handle_request(
        &fixture.renderer,
        "cards.og",
        "width=600&preview=1&data%5Buser%5D=ada",
    )
    .unwrap();
    let html = String::from_utf8(rendered.body).unwrap();
    assert!(html.contains("<h1>Hello ada</h1>"));
}

/// Inbound data never overrides what a registered resolver returns.
#[test]
fn test_resolver_output_wins_over_request_data() {
    let fixture = Fixture::with_builder(|builder| {
        builder.resolver("cards.og", |_: &DataMap| Ok(title("from-resolver")))
    });

    let rendered = handle_request(
        &fixture.renderer,
        "cards.og",
        "width=600&preview=1&data%5Btitle%5D=from-request",
    )
    .unwrap();
    let html = String::from_utf8(rendered.body).unwrap();
    assert!(html.contains("<h1>from-resolver</h1>"));
    assert!(!html.contains("from-request"));
}

/// Manual renders call a resolver with no request fields.
#[test]
fn test_manual_resolver_gets_empty_input() {
    let fixture = Fixture::new();
    let params = ParameterSet::new("cards.plain")
        .with_width(400)
        .with_preview(true)
        .with_resolver(|input: &DataMap| {
            assert!(input.is_empty());
            Ok(title("manual"))
        });

    let rendered = fixture.renderer.render(params).unwrap();
    let html = String::from_utf8(rendered.body).unwrap();
    assert!(html.contains("<h1>manual</h1>"));
}

/// Backend failures propagate and leave nothing in the cache.
#[test]
fn test_backend_failure_is_not_cached() {
    let failing = MockScreenshotter::always_fails("chrome crashed");
    let fixture = {
        let failing = failing.clone();
        Fixture::with_builder(move |builder| builder.backend(failing))
    };
    let params = plain("A").with_cache(true);

    let error = fixture.renderer.render(params.clone()).unwrap_err();
    assert!(matches!(error, RasterError::RenderingBackend(_)));
    assert!(error.is_retryable());
    assert_eq!(failing.call_count(), 1);

    let key = CacheParams::new(&params, title("A"));
    assert!(
        fixture
            .cache()
            .get("cards.plain", DEFAULT_CACHE_ID, &key)
            .unwrap()
            .is_none()
    );
}
