//! Render parameters.
//!
//! A [`ParameterSet`] is built fresh for every render, either directly in
//! code ([`Mode::Manual`]) or from an inbound HTTP request
//! ([`Mode::Automatic`]), and consumed once by
//! [`Renderer::render`](crate::Renderer::render).
//!
//! ```rust
//! use html2raster_api::{ImageType, ParameterSet};
//! use serde_json::json;
//!
//! let params = ParameterSet::new("cards.og")
//!     .with_data([("title".to_string(), json!("Hello"))].into())
//!     .with_width(1200)
//!     .with_basis(600)
//!     .with_type(ImageType::Jpeg)
//!     .with_cache(true);
//!
//! assert_eq!(params.width(), Some(1200));
//! assert_eq!(params.height(), None);
//! assert_eq!(params.cache_id(), "_");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

/// Template data: a mapping from variable name to JSON value.
///
/// A `BTreeMap` keeps key order stable, which cache keys rely on.
pub type DataMap = BTreeMap<String, serde_json::Value>;

/// Deferred data producer.
///
/// Called with the inbound `data[...]` fields in automatic mode, or with an
/// empty mapping in manual mode.
pub type DataResolver = Arc<dyn Fn(&DataMap) -> Result<DataMap> + Send + Sync>;

/// Default cache bucket.
pub const DEFAULT_CACHE_ID: &str = "_";

/// Parameter keys accepted from inbound requests and template directives.
pub const RECOGNIZED_KEYS: [&str; 10] = [
    "data",
    "width",
    "height",
    "basis",
    "scale",
    "type",
    "transparent",
    "preview",
    "cache",
    "cacheId",
];

// ============================================================================
// ImageType
// ============================================================================

/// Output format of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// PNG image (default).
    #[default]
    Png,
    /// JPEG image.
    Jpeg,
    /// Single-page PDF.
    Pdf,
}

impl ImageType {
    /// Name used in URLs and directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Pdf => "pdf",
        }
    }

    /// File extension used for cache entries and download names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of the rendered bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }

    /// `true` for PNG and JPEG.
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "png" => Ok(Self::Png),
            "jpeg" => Ok(Self::Jpeg),
            "pdf" => Ok(Self::Pdf),
            other => Err(RasterError::UnsupportedResourceType(format!(
                "output type '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Mode
// ============================================================================

/// Whether a render was driven by an inbound request or built in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Parameters decoded from an HTTP request. The template must carry
    /// the raster directive.
    Automatic,
    /// Parameters set in code. The template must not carry the directive.
    Manual,
}

impl Mode {
    /// Whether templates rendered in this mode must carry the fingerprint.
    pub fn requires_fingerprint(&self) -> bool {
        matches!(self, Self::Automatic)
    }

    pub(crate) fn directive_requirement(&self) -> &'static str {
        match self {
            Self::Automatic => "must contain",
            Self::Manual => "must not contain",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => f.write_str("automatic"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

// ============================================================================
// DataSource
// ============================================================================

/// Where template data comes from.
#[derive(Clone)]
pub enum DataSource {
    /// A fixed mapping.
    Literal(DataMap),
    /// A resolver invoked once the inbound fields are known.
    Deferred(DataResolver),
}

impl DataSource {
    /// Produce the data mapping.
    ///
    /// `inbound` is the request's `data[...]` sub-mapping and only reaches
    /// deferred resolvers.
    pub fn resolve(&self, inbound: &DataMap) -> Result<DataMap> {
        match self {
            Self::Literal(map) => Ok(map.clone()),
            Self::Deferred(resolver) => resolver(inbound),
        }
    }

    /// The literal mapping, if any.
    pub fn as_literal(&self) -> Option<&DataMap> {
        match self {
            Self::Literal(map) => Some(map),
            Self::Deferred(_) => None,
        }
    }

    /// `true` for [`DataSource::Deferred`].
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Literal(DataMap::new())
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(map) => f.debug_tuple("Literal").field(map).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<DataMap> for DataSource {
    fn from(map: DataMap) -> Self {
        Self::Literal(map)
    }
}

// ============================================================================
// InboundRequest
// ============================================================================

/// Query fields of an inbound render request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    fields: Vec<(String, String)>,
}

impl InboundRequest {
    /// Build from decoded key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a raw (percent-encoded) query string.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    /// Last value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All fields in arrival order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `data[...]` sub-mapping. Values are always strings.
    pub fn data(&self) -> DataMap {
        self.pairs()
            .filter_map(|(k, v)| {
                data_key(k).map(|key| (key.to_string(), serde_json::Value::String(v.to_string())))
            })
            .collect()
    }
}

/// `data[title]` → `title`.
fn data_key(key: &str) -> Option<&str> {
    key.strip_prefix("data[")
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|inner| !inner.is_empty())
}

// ============================================================================
// ParameterSet
// ============================================================================

/// The normalized bag of rendering options for one render.
///
/// Optional getters return `None` while unset, never a stale default.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    name: String,
    data: DataSource,
    request: Option<InboundRequest>,
    request_applied: bool,
    width: Option<u32>,
    height: Option<u32>,
    basis: Option<u32>,
    scale: u32,
    image_type: ImageType,
    transparent: bool,
    preview: bool,
    cache: bool,
    cache_id: Option<String>,
    file: Option<String>,
}

impl ParameterSet {
    /// Canonical defaults, compared field by field when compacting URLs.
    pub const DEFAULTS: ParameterSet = ParameterSet {
        name: String::new(),
        data: DataSource::Literal(BTreeMap::new()),
        request: None,
        request_applied: false,
        width: None,
        height: None,
        basis: None,
        scale: 1,
        image_type: ImageType::Png,
        transparent: false,
        preview: false,
        cache: false,
        cache_id: None,
        file: None,
    };

    /// Manual-mode parameters for the template `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::DEFAULTS
        }
    }

    /// Automatic-mode parameters for the template `name`.
    ///
    /// The request is only attached; use
    /// [`UrlCodec::decode`](crate::UrlCodec::decode) to apply its fields.
    pub fn automatic(name: impl Into<String>, request: InboundRequest) -> Self {
        Self {
            request: Some(request),
            ..Self::new(name)
        }
    }

    // ------------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------------

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data source.
    pub fn data(&self) -> &DataSource {
        &self.data
    }

    /// Attached inbound request (automatic mode only).
    pub fn request(&self) -> Option<&InboundRequest> {
        self.request.as_ref()
    }

    /// Whether the attached request's fields have been applied.
    pub fn is_request_applied(&self) -> bool {
        self.request_applied
    }

    /// Derived from whether a request is attached.
    pub fn mode(&self) -> Mode {
        if self.request.is_some() {
            Mode::Automatic
        } else {
            Mode::Manual
        }
    }

    /// Viewport width in CSS pixels.
    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// Viewport height in CSS pixels.
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// Design width that font scaling is relative to.
    pub fn basis(&self) -> Option<u32> {
        self.basis
    }

    /// Device scale factor.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Output format.
    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// Transparent background (raster types only).
    pub fn transparent(&self) -> bool {
        self.transparent
    }

    /// Return instrumented HTML instead of an image.
    pub fn preview(&self) -> bool {
        self.preview
    }

    /// Use the render cache.
    pub fn cache(&self) -> bool {
        self.cache
    }

    /// Cache bucket, `_` unless set.
    pub fn cache_id(&self) -> &str {
        self.cache_id.as_deref().unwrap_or(DEFAULT_CACHE_ID)
    }

    /// Download filename override, without extension.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Width used for rendering: `width`, falling back to `basis`.
    pub fn resolved_width(&self) -> Option<u32> {
        self.width.or(self.basis)
    }

    // ------------------------------------------------------------------------
    // Fluent setters
    // ------------------------------------------------------------------------

    /// Literal template data.
    pub fn with_data(mut self, data: DataMap) -> Self {
        self.set_data(DataSource::Literal(data));
        self
    }

    /// Deferred template data.
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&DataMap) -> Result<DataMap> + Send + Sync + 'static,
    {
        self.set_data(DataSource::Deferred(Arc::new(resolver)));
        self
    }

    /// Set `width`, returning the updated set.
    pub fn with_width(mut self, width: impl Into<Option<u32>>) -> Self {
        self.set_width(width.into());
        self
    }

    /// Set `height`, returning the updated set.
    pub fn with_height(mut self, height: impl Into<Option<u32>>) -> Self {
        self.set_height(height.into());
        self
    }

    /// Set `basis`, returning the updated set.
    pub fn with_basis(mut self, basis: impl Into<Option<u32>>) -> Self {
        self.set_basis(basis.into());
        self
    }

    /// Set `scale`, returning the updated set.
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.set_scale(scale);
        self
    }

    /// Set `type`, returning the updated set.
    pub fn with_type(mut self, image_type: ImageType) -> Self {
        self.set_type(image_type);
        self
    }

    /// Set `transparent`, returning the updated set.
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.set_transparent(transparent);
        self
    }

    /// Set `preview`, returning the updated set.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.set_preview(preview);
        self
    }

    /// Set `cache`, returning the updated set.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.set_cache(cache);
        self
    }

    /// Set `cache_id`, returning the updated set.
    pub fn with_cache_id(mut self, cache_id: impl Into<String>) -> Self {
        self.set_cache_id(cache_id);
        self
    }

    /// Set `file`, returning the updated set.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    // ------------------------------------------------------------------------
    // In-place setters
    // ------------------------------------------------------------------------

    /// Set `data`.
    pub fn set_data(&mut self, data: DataSource) -> &mut Self {
        self.data = data;
        self
    }

    /// Set `width`.
    pub fn set_width(&mut self, width: Option<u32>) -> &mut Self {
        self.width = width;
        self
    }

    /// Set `height`.
    pub fn set_height(&mut self, height: Option<u32>) -> &mut Self {
        self.height = height;
        self
    }

    /// Set `basis`.
    pub fn set_basis(&mut self, basis: Option<u32>) -> &mut Self {
        self.basis = basis;
        self
    }

    /// Set `scale`.
    pub fn set_scale(&mut self, scale: u32) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Set `type`.
    pub fn set_type(&mut self, image_type: ImageType) -> &mut Self {
        self.image_type = image_type;
        self
    }

    /// Set `transparent`.
    pub fn set_transparent(&mut self, transparent: bool) -> &mut Self {
        self.transparent = transparent;
        self
    }

    /// Set `preview`.
    pub fn set_preview(&mut self, preview: bool) -> &mut Self {
        self.preview = preview;
        self
    }

    /// Set `cache`.
    pub fn set_cache(&mut self, cache: bool) -> &mut Self {
        self.cache = cache;
        self
    }

    /// Set `cache_id`.
    pub fn set_cache_id(&mut self, cache_id: impl Into<String>) -> &mut Self {
        self.cache_id = Some(cache_id.into());
        self
    }

    pub(crate) fn mark_request_applied(&mut self) {
        self.request_applied = true;
    }

    /// Apply one textual field from a request or template directive.
    ///
    /// Returns `Ok(false)` for unrecognized keys, which callers ignore.
    /// `data` is not a scalar field and is skipped here as well.
    pub fn apply_field(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "width" => self.width = Some(parse_dimension(key, value)?),
            "height" => self.height = Some(parse_dimension(key, value)?),
            "basis" => self.basis = Some(parse_dimension(key, value)?),
            "scale" => self.scale = parse_dimension(key, value)?,
            "type" => self.image_type = value.parse()?,
            "transparent" => self.transparent = parse_flag(key, value)?,
            "preview" => self.preview = parse_flag(key, value)?,
            "cache" => self.cache = parse_flag(key, value)?,
            "cacheId" => {
                validate_segment(key, value)?;
                self.cache_id = Some(value.to_string());
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Check values that setters accept but rendering cannot.
    pub fn validate(&self) -> Result<()> {
        validate_segment("name", &self.name)?;
        validate_segment("cacheId", self.cache_id())?;
        for (key, value) in [
            ("width", self.width),
            ("height", self.height),
            ("basis", self.basis),
            ("scale", Some(self.scale)),
        ] {
            if value == Some(0) {
                return Err(RasterError::invalid_parameter(key, "must be a positive integer"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Field parsing
// ============================================================================

fn parse_dimension(key: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(RasterError::invalid_parameter(
            key,
            format!("expected a positive integer, got '{}'", value),
        )),
        Ok(n) => Ok(n),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(RasterError::invalid_parameter(
            key,
            format!("expected a boolean, got '{}'", value),
        )),
    }
}

/// Names and cache ids become directory names; keep them inside the store.
fn validate_segment(key: &str, value: &str) -> Result<()> {
    let unsafe_segment = value.is_empty()
        || value.starts_with('.')
        || value.contains("..")
        || value.contains(['/', '\\', '\0']);
    if unsafe_segment {
        return Err(RasterError::invalid_parameter(
            key,
            format!("'{}' is not a safe path segment", value),
        ));
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
