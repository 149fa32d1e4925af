//! The render pipeline.
//!
//! A [`Renderer`] owns every collaborator a render needs (templates, the
//! screenshot backend, the optional cache and the URL codec) and turns a
//! [`ParameterSet`] into bytes:
//!
//! ```text
//! Validating ──▶ RenderingHtml ──┬──▶ PreviewShortCircuit ─────────────────────────▶ Done
//!                                └──▶ CacheLookup ──┬── hit ─────────────────────────▶ Done
//!                                                   └── miss ─▶ RenderingImage ─▶ CacheStore ─▶ Done
//! ```
//!
//! Any stage may fail; the error is returned unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2raster_api::prelude::*;
//!
//! let renderer = Renderer::builder()
//!     .templates(TemplateRegistry::with_tera("templates")?)
//!     .backend(ChromeScreenshotter::launch(None)?)
//!     .cache(CacheStore::local("storage/raster"))
//!     .build()?;
//!
//! let png = renderer.render(
//!     ParameterSet::new("cards.og")
//!         .with_width(1200)
//!         .with_height(630)
//!         .with_cache(true),
//! )?;
//! std::fs::write("og.png", &png.body)?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::backend::{CaptureJob, PdfJob, Screenshotter};
use crate::cache::{CacheParams, CacheStore};
use crate::codec::UrlCodec;
use crate::error::{RasterError, Result};
use crate::params::{DataMap, DataResolver, DataSource, ImageType, InboundRequest, Mode, ParameterSet};
use crate::service::Rendered;
use crate::style::{compute_style, preview_script};
use crate::template::{DEFAULT_LAYOUT, LocatedTemplate, TemplateInfo, TemplateRegistry};

/// Default base URL for generated links.
pub const DEFAULT_BASE_URL: &str = "http://localhost";

/// Default route prefix for render URLs.
pub const DEFAULT_ROUTE: &str = "/raster";

/// Stages of a render, as reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Checking parameters, mode and geometry.
    Validating,
    /// Rendering the content template and layout.
    RenderingHtml,
    /// Returning preview HTML.
    PreviewShortCircuit,
    /// Looking up the cache.
    CacheLookup,
    /// Running the screenshot backend.
    RenderingImage,
    /// Writing the cache.
    CacheStore,
    /// Finished.
    Done,
}

/// Template-to-image renderer.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self` and a
/// render holds no lock while the backend runs.
pub struct Renderer {
    templates: TemplateRegistry,
    backend: Arc<dyn Screenshotter>,
    cache: Option<CacheStore>,
    codec: UrlCodec,
    layout: String,
    resolvers: HashMap<String, DataResolver>,
}

impl Renderer {
    /// Start building a renderer.
    pub fn builder() -> RendererBuilder {
        RendererBuilder::new()
    }

    /// Template registry.
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Render cache, `None` when caching is globally disabled.
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// URL codec.
    pub fn codec(&self) -> &UrlCodec {
        &self.codec
    }

    /// Name of the layout wrapped around every render.
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Render URL for `params`.
    pub fn url(&self, params: &ParameterSet) -> Result<url::Url> {
        self.codec.encode(params)
    }

    /// Automatic-mode parameters for an inbound request, seeded with the
    /// data resolver registered for `name`, if any.
    pub fn automatic_params(&self, name: &str, request: InboundRequest) -> ParameterSet {
        let mut params = ParameterSet::automatic(name, request);
        if let Some(resolver) = self.resolvers.get(name) {
            params.set_data(DataSource::Deferred(Arc::clone(resolver)));
        }
        params
    }

    /// Verify and decode an inbound request for `name`.
    pub fn decode_request(&self, name: &str, request: InboundRequest) -> Result<ParameterSet> {
        self.codec.verify(name, &request)?;
        UrlCodec::apply_request(self.automatic_params(name, request))
    }

    /// Render `params`.
    ///
    /// # Errors
    ///
    /// - [`RasterError::ModeMismatch`] when the template's directive
    ///   contradicts the mode
    /// - [`RasterError::MissingGeometry`] without a width, or without a
    ///   height for PDF output
    /// - [`RasterError::TemplateNotFound`], [`RasterError::Template`] from
    ///   the template collaborator
    /// - [`RasterError::RenderingBackend`] from the screenshot backend
    /// - [`RasterError::CacheIo`] from the cache
    pub fn render(&self, params: ParameterSet) -> Result<Rendered> {
        let start = Instant::now();
        let name = params.name().to_string();
        stage(&name, RenderStage::Validating);

        let mut params = UrlCodec::apply_request(params)?;
        params.validate()?;

        let template = self.templates.locate(&name)?;
        let source = template.read_source()?;
        let mode = params.mode();
        if template.handler.has_fingerprint(&source)? != mode.requires_fingerprint() {
            return Err(RasterError::ModeMismatch { name, mode });
        }

        // Template-declared parameters win over the request
        if mode == Mode::Automatic {
            for (key, value) in template.handler.directive_parameters(&source)? {
                params.apply_field(&key, &value)?;
            }
            params.validate()?;
        }

        let width = params
            .resolved_width()
            .ok_or(RasterError::MissingGeometry("width"))?;
        let pdf_height = match params.image_type() {
            ImageType::Pdf => Some(
                params
                    .height()
                    .ok_or(RasterError::MissingGeometry("height"))?,
            ),
            _ => None,
        };

        stage(&name, RenderStage::RenderingHtml);
        let data = params.data().resolve(&DataMap::new())?;
        let info = TemplateInfo {
            name: name.clone(),
            width,
            height: params.height(),
            basis: params.basis(),
            scale: params.scale(),
            image_type: params.image_type(),
            preview: params.preview(),
        };
        let html = self.render_html(&template, &data, &info)?;
        let style = compute_style(width, params.height(), params.basis(), params.preview());
        let stem = params.file().unwrap_or(&name).to_string();

        if params.preview() {
            stage(&name, RenderStage::PreviewShortCircuit);
            let document = format!("{}<style>{}</style>{}", html, style, preview_script(&name));
            return Ok(Rendered::preview(document, &stem));
        }

        let cache = match &self.cache {
            Some(cache) if params.cache() => {
                Some((cache, CacheParams::new(&params, data)))
            }
            _ => None,
        };

        if let Some((cache, key)) = &cache {
            stage(&name, RenderStage::CacheLookup);
            if let Some(bytes) = cache.get(&name, params.cache_id(), key)? {
                log::debug!("Cache hit for '{}' in {:?}", name, start.elapsed());
                return Ok(Rendered::image(bytes, params.image_type(), &stem));
            }
            log::debug!("Cache miss for '{}'", name);
        }

        stage(&name, RenderStage::RenderingImage);
        let bytes = match pdf_height {
            Some(height) => self
                .backend
                .print_pdf(&PdfJob::new(html, style, width, height, params.scale()))?,
            None => self.backend.capture(&CaptureJob {
                html,
                style,
                width,
                height: params.height(),
                scale: params.scale(),
                image_type: params.image_type(),
                transparent: params.transparent(),
            })?,
        };

        if let Some((cache, key)) = &cache {
            stage(&name, RenderStage::CacheStore);
            cache.put(&name, params.cache_id(), key, &bytes)?;
        }

        stage(&name, RenderStage::Done);
        log::debug!(
            "Rendered '{}' as {} in {:?} ({} bytes)",
            name,
            params.image_type(),
            start.elapsed(),
            bytes.len()
        );
        Ok(Rendered::image(bytes, params.image_type(), &stem))
    }

    /// Content template wrapped in the layout.
    ///
    /// A layout file on disk is rendered by its own handler; otherwise the
    /// content template's handler is asked for the layout by name, which
    /// lets dialects ship a built-in one.
    fn render_html(
        &self,
        template: &LocatedTemplate,
        data: &DataMap,
        info: &TemplateInfo,
    ) -> Result<String> {
        let content = template.handler.render_body(&template.name, data, None, info)?;

        match self.templates.locate(&self.layout) {
            Ok(layout) => layout
                .handler
                .render_body(&layout.name, data, Some(&content), info),
            Err(RasterError::TemplateNotFound(_)) => {
                template
                    .handler
                    .render_body(&self.layout, data, Some(&content), info)
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resolvers: Vec<&String> = self.resolvers.keys().collect();
        resolvers.sort();
        f.debug_struct("Renderer")
            .field("templates", &self.templates)
            .field("cache", &self.cache)
            .field("codec", &self.codec)
            .field("layout", &self.layout)
            .field("resolvers", &resolvers)
            .finish()
    }
}

fn stage(name: &str, stage: RenderStage) {
    log::trace!("Render '{}': {:?}", name, stage);
}

// ============================================================================
// RendererBuilder
// ============================================================================

/// Builder for [`Renderer`].
///
/// # Example
///
/// ```rust,ignore
/// let renderer = Renderer::builder()
///     .templates(TemplateRegistry::with_tera("templates")?)
///     .backend(MockScreenshotter::new())
///     .codec(UrlCodec::new("https://example.com", "/raster")?)
///     .resolver("cards.user", |input| load_user(input))
///     .build()?;
/// ```
pub struct RendererBuilder {
    /// Template registry (required).
    templates: Option<TemplateRegistry>,

    /// Screenshot backend (required).
    backend: Option<Arc<dyn Screenshotter>>,

    /// Render cache; caching is disabled without one.
    cache: Option<CacheStore>,

    /// URL codec; unsigned `http://localhost/raster` by default.
    codec: Option<UrlCodec>,

    /// Layout template name.
    layout: String,

    /// Data resolvers for automatic renders, by template name.
    resolvers: HashMap<String, DataResolver>,
}

impl RendererBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            templates: None,
            backend: None,
            cache: None,
            codec: None,
            layout: DEFAULT_LAYOUT.to_string(),
            resolvers: HashMap::new(),
        }
    }

    /// Set the template registry (required).
    pub fn templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Set the screenshot backend (required).
    pub fn backend<B: Screenshotter + 'static>(self, backend: B) -> Self {
        self.shared_backend(Arc::new(backend))
    }

    /// Set an already shared screenshot backend.
    pub fn shared_backend(mut self, backend: Arc<dyn Screenshotter>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Enable caching in `cache`.
    pub fn cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enable or disable caching; `None` disables it globally.
    pub fn maybe_cache(mut self, cache: Option<CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the URL codec.
    pub fn codec(mut self, codec: UrlCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the layout template name.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Register a data resolver for automatic renders of `name`.
    ///
    /// The resolver receives the request's `data[...]` fields.
    pub fn resolver<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&DataMap) -> Result<DataMap> + Send + Sync + 'static,
    {
        self.resolvers.insert(name.into(), Arc::new(resolver));
        self
    }

    /// Build the renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Configuration`] if templates or backend are
    /// missing, or the default codec cannot be built.
    pub fn build(self) -> Result<Renderer> {
        let templates = self.templates.ok_or_else(|| {
            RasterError::Configuration("No template registry provided".to_string())
        })?;
        let backend = self.backend.ok_or_else(|| {
            RasterError::Configuration("No screenshot backend provided".to_string())
        })?;
        let codec = match self.codec {
            Some(codec) => codec,
            None => UrlCodec::new(DEFAULT_BASE_URL, DEFAULT_ROUTE)?,
        };

        log::info!(
            "Building renderer: templates={}, layout={}, cache={}, signed={}",
            templates.root().display(),
            self.layout,
            self.cache.is_some(),
            codec.is_signed()
        );

        Ok(Renderer {
            templates,
            backend,
            cache: self.cache,
            codec,
            layout: self.layout,
            resolvers: self.resolvers,
        })
    }
}

impl Default for RendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment Initialization (feature-gated)
// ============================================================================

/// Initialize a renderer from environment variables.
///
/// Loads [`RasterConfig`](crate::RasterConfig) via
/// [`config::env::from_env`](crate::config::env::from_env), wires Tera
/// templates, the local file cache and the optional URL signer, and
/// launches headless Chrome.
///
/// # Errors
///
/// - Returns error if configuration is invalid.
/// - Returns error if templates fail to compile.
/// - Returns error if Chrome cannot be launched.
///
/// # Example
///
/// ```rust,ignore
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     env_logger::init();
///
///     let renderer = init_renderer()?;
///
///     // Use renderer in handlers...
///
///     Ok(())
/// }
/// ```
#[cfg(feature = "env-config")]
pub fn init_renderer() -> Result<Arc<Renderer>> {
    use crate::backend::ChromeScreenshotter;
    use crate::config::env::from_env;

    log::info!("Initializing renderer from environment...");

    let config = from_env()?;
    log::info!(
        "   - Chrome path: {}",
        config.chrome_path.as_deref().unwrap_or("auto-detect")
    );

    let backend = ChromeScreenshotter::launch(config.chrome_path.as_deref())?;
    let renderer = config.renderer_builder()?.backend(backend).build()?;

    log::info!("Renderer initialized successfully");
    Ok(Arc::new(renderer))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockScreenshotter, RecordedJob};
    use serde_json::json;
    use std::path::Path;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn setup() -> (tempfile::TempDir, MockScreenshotter, Renderer) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("templates");
        write(&root, "cards/plain.html.tera", "<h1>{{ title }}</h1>");
        write(
            &root,
            "cards/auto.html.tera",
            "{% raster width=800 type=\"jpeg\" %}<h1>{{ title }}</h1>",
        );

        let backend = MockScreenshotter::new();
        let renderer = Renderer::builder()
            .templates(TemplateRegistry::with_tera(&root).unwrap())
            .backend(backend.clone())
            .cache(CacheStore::local(dir.path().join("cache")))
            .resolver("cards.auto", |input| {
                let mut data = input.clone();
                data.entry("title".to_string()).or_insert(json!("resolved"));
                Ok(data)
            })
            .build()
            .unwrap();
        (dir, backend, renderer)
    }

    #[test]
    fn test_build_requires_collaborators() {
        assert!(matches!(
            Renderer::builder().backend(MockScreenshotter::new()).build(),
            Err(RasterError::Configuration(_))
        ));
        assert!(matches!(
            Renderer::builder()
                .templates(TemplateRegistry::new("unused"))
                .build(),
            Err(RasterError::Configuration(_))
        ));
    }

    #[test]
    fn test_manual_render_passes_job_to_backend() {
        let (_dir, backend, renderer) = setup();
        let params = ParameterSet::new("cards.plain")
            .with_data(DataMap::from([("title".to_string(), json!("Hello"))]))
            .with_width(400)
            .with_transparent(true);

        let rendered = renderer.render(params).unwrap();
        assert_eq!(rendered.content_type, "image/png");
        assert_eq!(rendered.filename, "cards.plain.png");

        match backend.last_job() {
            Some(RecordedJob::Capture(job)) => {
                assert!(job.html.contains("<h1>Hello</h1>"));
                assert!(job.html.contains("<body"), "layout must wrap content");
                assert_eq!(job.width, 400);
                assert!(job.full_page());
                assert!(job.transparent);
                assert!(job.style.contains("font-size: 16px"));
            }
            other => panic!("Expected capture job, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_width_fails_before_backend() {
        let (_dir, backend, renderer) = setup();
        let err = renderer.render(ParameterSet::new("cards.plain")).unwrap_err();
        assert!(matches!(err, RasterError::MissingGeometry("width")));

        let err = renderer
            .render(
                ParameterSet::new("cards.plain")
                    .with_width(100)
                    .with_type(ImageType::Pdf),
            )
            .unwrap_err();
        assert!(matches!(err, RasterError::MissingGeometry("height")));
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_basis_provides_width() {
        let (_dir, backend, renderer) = setup();
        renderer
            .render(ParameterSet::new("cards.plain").with_basis(640))
            .unwrap();
        match backend.last_job() {
            Some(RecordedJob::Capture(job)) => assert_eq!(job.width, 640),
            other => panic!("Expected capture job, got {:?}", other),
        }
    }

    #[test]
    fn test_automatic_render_applies_directive_and_resolver() {
        let (_dir, backend, renderer) = setup();
        let request = InboundRequest::from_query("width=300&data[title]=From+URL");

        let params = renderer.decode_request("cards.auto", request).unwrap();
        let rendered = renderer.render(params).unwrap();

        assert_eq!(rendered.content_type, "image/jpeg");
        match backend.last_job() {
            Some(RecordedJob::Capture(job)) => {
                assert_eq!(job.width, 800, "directive overrides request");
                assert!(job.html.contains("<h1>From URL</h1>"));
            }
            other => panic!("Expected capture job, got {:?}", other),
        }
    }

    #[test]
    fn test_mode_mismatch_both_ways() {
        let (_dir, _backend, renderer) = setup();

        let manual = renderer.render(ParameterSet::new("cards.auto").with_width(10));
        assert!(matches!(
            manual,
            Err(RasterError::ModeMismatch { mode: Mode::Manual, .. })
        ));

        let automatic = renderer.render(
            renderer.automatic_params("cards.plain", InboundRequest::from_query("width=10")),
        );
        assert!(matches!(
            automatic,
            Err(RasterError::ModeMismatch { mode: Mode::Automatic, .. })
        ));
    }

    #[test]
    fn test_file_overrides_download_name() {
        let (_dir, _backend, renderer) = setup();
        let rendered = renderer
            .render(
                ParameterSet::new("cards.plain")
                    .with_width(10)
                    .with_file("invoice-7"),
            )
            .unwrap();
        assert_eq!(rendered.filename, "invoice-7.png");
    }

    #[test]
    fn test_unknown_template() {
        let (_dir, _backend, renderer) = setup();
        assert!(matches!(
            renderer.render(ParameterSet::new("cards.missing").with_width(10)),
            Err(RasterError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_url_uses_codec() {
        let (_dir, _backend, renderer) = setup();
        let url = renderer
            .url(&ParameterSet::new("cards.auto").with_width(10))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost/raster/cards.auto?width=10");
    }
}
