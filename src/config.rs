//! Configuration for rendering, caching and URL generation.
//!
//! This module provides [`RasterConfig`] and [`RasterConfigBuilder`] for
//! configuring where templates and cache files live, how render URLs look
//! and whether they are signed.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use html2raster_api::RasterConfigBuilder;
//!
//! let config = RasterConfigBuilder::new()
//!     .templates_dir("resources/views")
//!     .cache_ttl(Duration::from_secs(86400))
//!     .build()
//!     .expect("Invalid configuration");
//!
//! assert_eq!(config.route, "/raster");
//! assert_eq!(config.cache_ttl, Some(Duration::from_secs(86400)));
//! ```
//!
//! # Environment Configuration
//!
//! When the `env-config` feature is enabled, you can load configuration
//! from environment variables and an optional `app.env` file:
//!
//! ```rust,ignore
//! use html2raster_api::config::env::from_env;
//!
//! let config = from_env()?;
//! ```
//!
//! See [`mod@env`] module for available environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::codec::{HmacUrlSigner, UrlCodec};
use crate::error::Result;
use crate::renderer::{DEFAULT_BASE_URL, DEFAULT_ROUTE, RendererBuilder};
use crate::template::{DEFAULT_LAYOUT, TemplateRegistry};

/// Configuration for the renderer and its collaborators.
///
/// # Fields Overview
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `route` | `/raster` | Path prefix of render URLs |
/// | `base_url` | `http://localhost` | Scheme and host of render URLs |
/// | `templates_dir` | `templates` | Template root |
/// | `layout` | `raster.layout` | Layout wrapped around every render |
/// | `cache_enabled` | `true` | Global cache switch |
/// | `cache_dir` | `storage/raster` | Cache root |
/// | `cache_prefix` | none | Subdirectory under the cache root |
/// | `cache_ttl` | none | Entry lifetime |
/// | `sign_urls` | `false` | Require signed render URLs |
/// | `signing_key` | none | HMAC key, required when signing |
/// | `chrome_path` | auto-detect | Chrome binary |
#[derive(Clone)]
pub struct RasterConfig {
    /// Path prefix of render URLs; the template name follows it.
    pub route: String,

    /// Scheme, host and optional path that generated URLs start with.
    pub base_url: String,

    /// Root directory for templates.
    pub templates_dir: PathBuf,

    /// Layout template name.
    pub layout: String,

    /// Global cache switch. When off, `cache=1` on a request has no effect.
    pub cache_enabled: bool,

    /// Root directory of the render cache.
    pub cache_dir: PathBuf,

    /// Optional subdirectory of `cache_dir` holding all entries.
    pub cache_prefix: Option<String>,

    /// Entries older than this read as absent.
    pub cache_ttl: Option<Duration>,

    /// Require a valid `signature` on inbound render URLs.
    pub sign_urls: bool,

    /// HMAC-SHA256 key for URL signatures.
    pub signing_key: Option<String>,

    /// Chrome binary; auto-detected when `None`.
    pub chrome_path: Option<String>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            route: DEFAULT_ROUTE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            templates_dir: PathBuf::from("templates"),
            layout: DEFAULT_LAYOUT.to_string(),
            cache_enabled: true,
            cache_dir: PathBuf::from("storage/raster"),
            cache_prefix: None,
            cache_ttl: None,
            sign_urls: false,
            signing_key: None,
            chrome_path: None,
        }
    }
}

impl RasterConfig {
    /// The render cache described by this configuration, or `None` when
    /// caching is disabled.
    pub fn cache_store(&self) -> Option<CacheStore> {
        if !self.cache_enabled {
            return None;
        }
        let mut cache = CacheStore::local(&self.cache_dir);
        if let Some(prefix) = &self.cache_prefix {
            cache = cache.with_prefix(prefix.as_str());
        }
        if let Some(ttl) = self.cache_ttl {
            cache = cache.with_ttl(ttl);
        }
        Some(cache)
    }

    /// URL codec for `base_url` + `route`, signed when `sign_urls` is set.
    pub fn url_codec(&self) -> Result<UrlCodec> {
        let codec = UrlCodec::new(&self.base_url, &self.route)?;
        match (&self.signing_key, self.sign_urls) {
            (Some(key), true) => Ok(codec.with_signer(HmacUrlSigner::new(key)?)),
            _ => Ok(codec),
        }
    }

    /// A [`RendererBuilder`] with templates, cache, codec and layout set
    /// from this configuration. Only the backend is left to the caller.
    pub fn renderer_builder(&self) -> Result<RendererBuilder> {
        Ok(RendererBuilder::new()
            .templates(TemplateRegistry::with_tera(&self.templates_dir)?)
            .maybe_cache(self.cache_store())
            .codec(self.url_codec()?)
            .layout(self.layout.as_str()))
    }
}

impl std::fmt::Debug for RasterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterConfig")
            .field("route", &self.route)
            .field("base_url", &self.base_url)
            .field("templates_dir", &self.templates_dir)
            .field("layout", &self.layout)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_dir", &self.cache_dir)
            .field("cache_prefix", &self.cache_prefix)
            .field("cache_ttl", &self.cache_ttl)
            .field("sign_urls", &self.sign_urls)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("chrome_path", &self.chrome_path)
            .finish()
    }
}

/// Builder for [`RasterConfig`] with validation.
///
/// # Validation
///
/// The [`build()`](Self::build) method validates:
/// - `route` must start with `/`
/// - `base_url` must be an absolute URL
/// - `layout` must not be empty
/// - `cache_ttl`, when set, must be non-zero
/// - `sign_urls` requires a non-empty `signing_key`
pub struct RasterConfigBuilder {
    config: RasterConfig,
}

impl RasterConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: RasterConfig::default(),
        }
    }

    /// Set the route prefix (must start with `/`).
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.config.route = route.into();
        self
    }

    /// Set the base URL of generated links.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the template root.
    pub fn templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.templates_dir = dir.into();
        self
    }

    /// Set the layout template name.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.config.layout = layout.into();
        self
    }

    /// Turn caching on or off globally.
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    /// Set the cache root.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    /// Keep cache entries under a subdirectory of the cache root.
    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cache_prefix = Some(prefix.into());
        self
    }

    /// Expire cache entries after `ttl`.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = Some(ttl);
        self
    }

    /// Require signed render URLs, signed with `key`.
    pub fn signing_key(mut self, key: impl Into<String>) -> Self {
        self.config.signing_key = Some(key.into());
        self.config.sign_urls = true;
        self
    }

    /// Turn URL signing on or off. Turning it on needs a signing key.
    pub fn sign_urls(mut self, sign: bool) -> Self {
        self.config.sign_urls = sign;
        self
    }

    /// Use a specific Chrome binary.
    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use html2raster_api::RasterConfigBuilder;
    ///
    /// assert!(RasterConfigBuilder::new().build().is_ok());
    /// assert!(RasterConfigBuilder::new().route("raster").build().is_err());
    /// assert!(RasterConfigBuilder::new().sign_urls(true).build().is_err());
    /// ```
    pub fn build(self) -> std::result::Result<RasterConfig, String> {
        let config = self.config;

        if !config.route.starts_with('/') {
            return Err(format!("route must start with '/', got '{}'", config.route));
        }

        if let Err(e) = url::Url::parse(&config.base_url) {
            return Err(format!("base_url '{}' is not a valid URL: {}", config.base_url, e));
        }

        if config.layout.trim().is_empty() {
            return Err("layout must not be empty".to_string());
        }

        if config.cache_ttl == Some(Duration::ZERO) {
            return Err("cache_ttl must be greater than 0".to_string());
        }

        let has_key = config.signing_key.as_deref().is_some_and(|k| !k.is_empty());
        if config.sign_urls && !has_key {
            return Err("sign_urls requires a signing_key".to_string());
        }

        Ok(config)
    }
}

impl Default for RasterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration loading.
///
/// This module is only available when the `env-config` feature is enabled.
///
/// # Environment File
///
/// This module uses `dotenvy` to load environment variables from an `app.env`
/// file in the current directory. The file is optional - if not found,
/// environment variables and defaults are used.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `RASTER_ROUTE` | String | `/raster` | Route prefix |
/// | `RASTER_BASE_URL` | String | `http://localhost` | Base URL of links |
/// | `RASTER_TEMPLATES_DIR` | path | `templates` | Template root |
/// | `RASTER_LAYOUT` | String | `raster.layout` | Layout template |
/// | `RASTER_CACHE_ENABLED` | bool | `true` | Global cache switch |
/// | `RASTER_CACHE_DIR` | path | `storage/raster` | Cache root |
/// | `RASTER_CACHE_PREFIX` | String | none | Cache subdirectory |
/// | `RASTER_CACHE_TTL_SECONDS` | u64 | none | Cache entry lifetime |
/// | `RASTER_SIGN_URLS` | bool | `false` | Require signed URLs |
/// | `RASTER_SIGNING_KEY` | String | none | HMAC key |
/// | `CHROME_PATH` | String | auto | Custom Chrome binary path |
///
/// # Example `app.env` File
///
/// ```text
/// # Render Configuration
/// RASTER_BASE_URL=https://example.com
/// RASTER_TEMPLATES_DIR=resources/raster
/// RASTER_CACHE_TTL_SECONDS=86400
///
/// # Signing (optional)
/// # RASTER_SIGN_URLS=true
/// # RASTER_SIGNING_KEY=change-me
///
/// # Chrome Configuration (optional)
/// # CHROME_PATH=/usr/bin/google-chrome
/// ```
#[cfg(feature = "env-config")]
pub mod env {
    use super::*;
    use crate::error::RasterError;

    /// Default environment file name.
    pub const ENV_FILE_NAME: &str = "app.env";

    /// Load environment variables from `app.env` file.
    ///
    /// Called by [`from_env`]; call it yourself to load the file earlier or
    /// to check for errors.
    pub fn load_env_file() -> std::result::Result<std::path::PathBuf, dotenvy::Error> {
        dotenvy::from_filename(ENV_FILE_NAME)
    }

    /// Load configuration from environment variables.
    ///
    /// Also loads `app.env` file if present (via `dotenvy`). Unset or
    /// unparsable variables fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Configuration`] if the resulting
    /// configuration is invalid.
    pub fn from_env() -> Result<RasterConfig> {
        match load_env_file() {
            Ok(path) => {
                log::info!("Loaded configuration from: {:?}", path);
            }
            Err(e) => {
                log::debug!(
                    "No {} file found or failed to load: {} (using environment variables and defaults)",
                    ENV_FILE_NAME,
                    e
                );
            }
        }

        let mut builder = RasterConfigBuilder::new();

        if let Some(route) = var("RASTER_ROUTE") {
            builder = builder.route(route);
        }
        if let Some(base_url) = var("RASTER_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        if let Some(dir) = var("RASTER_TEMPLATES_DIR") {
            builder = builder.templates_dir(dir);
        }
        if let Some(layout) = var("RASTER_LAYOUT") {
            builder = builder.layout(layout);
        }
        if let Some(enabled) = var("RASTER_CACHE_ENABLED").and_then(|v| parse_flag(&v)) {
            builder = builder.cache_enabled(enabled);
        }
        if let Some(dir) = var("RASTER_CACHE_DIR") {
            builder = builder.cache_dir(dir);
        }
        if let Some(prefix) = var("RASTER_CACHE_PREFIX") {
            builder = builder.cache_prefix(prefix);
        }
        if let Some(secs) = var("RASTER_CACHE_TTL_SECONDS").and_then(|v| v.parse::<u64>().ok()) {
            builder = builder.cache_ttl(Duration::from_secs(secs));
        }
        if let Some(key) = var("RASTER_SIGNING_KEY") {
            builder = builder.signing_key(key);
        }
        // Explicit switch wins over the implicit one from the key
        if let Some(sign) = var("RASTER_SIGN_URLS").and_then(|v| parse_flag(&v)) {
            builder = builder.sign_urls(sign);
        }
        if let Some(path) = chrome_path_from_env() {
            builder = builder.chrome_path(path);
        }

        let config = builder.build().map_err(RasterError::Configuration)?;

        log::info!("Loading render configuration from environment:");
        log::info!("   - Route: {}{}", config.base_url, config.route);
        log::info!("   - Templates: {}", config.templates_dir.display());
        log::info!("   - Layout: {}", config.layout);
        log::info!(
            "   - Cache: {} ({})",
            if config.cache_enabled { "enabled" } else { "disabled" },
            config.cache_dir.display()
        );
        if let Some(ttl) = config.cache_ttl {
            log::info!("   - Cache TTL: {}s", ttl.as_secs());
        }
        log::info!("   - Signed URLs: {}", config.sign_urls);

        Ok(config)
    }

    /// Get Chrome path from environment.
    ///
    /// Reads `CHROME_PATH` environment variable.
    pub fn chrome_path_from_env() -> Option<String> {
        var("CHROME_PATH")
    }

    fn var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn parse_flag(value: &str) -> Option<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_flag() {
            assert_eq!(parse_flag("TRUE"), Some(true));
            assert_eq!(parse_flag(" 0 "), Some(false));
            assert_eq!(parse_flag("maybe"), None);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
