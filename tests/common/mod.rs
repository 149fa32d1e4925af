//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;

use html2raster_api::backend::mock::MockScreenshotter;
use html2raster_api::prelude::*;
use tempfile::TempDir;

/// Templates written into every fixture directory.
pub const TEMPLATES: &[(&str, &str)] = &[
    ("cards/plain.html.tera", "<h1>{{ title | default(value=\"Plain\") }}</h1>"),
    (
        "cards/og.html.tera",
        "{% raster height=630 %}<h1>{{ title | default(value=\"OG\") }}</h1>",
    ),
    (
        "docs/slide.html.tera",
        "{% raster type=\"pdf\" %}<section>{{ heading | default(value=\"\") }}</section>",
    ),
];

/// Initialise logging once; repeated calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write [`TEMPLATES`] below `root`.
pub fn write_templates(root: &Path) {
    for (path, source) in TEMPLATES {
        let file = root.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, source).unwrap();
    }
}

/// A renderer over fresh template and cache directories.
pub struct Fixture {
    pub dir: TempDir,
    pub backend: MockScreenshotter,
    pub renderer: Renderer,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_builder(|builder| builder)
    }

    /// Customise the builder before it is built.
    pub fn with_builder<F>(configure: F) -> Self
    where
        F: FnOnce(RendererBuilder) -> RendererBuilder,
    {
        init_logging();

        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        write_templates(&templates);

        let backend = MockScreenshotter::new();
        let builder = Renderer::builder()
            .templates(TemplateRegistry::with_tera(&templates).unwrap())
            .backend(backend.clone())
            .cache(CacheStore::local(dir.path().join("cache")))
            .codec(UrlCodec::new("https://example.com", "/raster").unwrap());
        let renderer = configure(builder).build().unwrap();

        Self {
            dir,
            backend,
            renderer,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        self.renderer.cache().unwrap()
    }
}

/// `{ "title": title }`.
pub fn title(title: &str) -> DataMap {
    let mut data = DataMap::new();
    data.insert("title".to_string(), serde_json::json!(title));
    data
}
