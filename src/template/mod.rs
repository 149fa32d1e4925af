//! Template collaborators.
//!
//! Templates are resolved by dotted name (`cards.og` → `<root>/cards/og.<ext>`)
//! and dispatched by file extension through a [`TemplateRegistry`]. Each
//! extension maps to a [`TemplateHandler`], which knows how to compile its
//! dialect for fingerprint checks, read directive parameters and render a
//! template with data and an optional slot.
//!
//! # Adding a dialect
//!
//! ```rust,ignore
//! use html2raster_api::template::{TemplateHandler, TemplateRegistry, TemplateInfo};
//!
//! struct MustacheHandler { /* ... */ }
//!
//! impl TemplateHandler for MustacheHandler {
//!     // compile / directive_parameters / render_body
//! }
//!
//! let registry = TemplateRegistry::new("templates")
//!     .register("html.mustache", MustacheHandler::new());
//! ```

pub mod tera;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{RasterError, Result};
use crate::fingerprint;
use crate::params::{DataMap, ImageType};

pub use self::tera::{DEFAULT_LAYOUT, TERA_EXTENSION, TeraHandler};

/// Render-time description of the current raster, exposed to templates as
/// the `raster` variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateInfo {
    /// Template name.
    pub name: String,
    /// Resolved width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels, if fixed.
    pub height: Option<u32>,
    /// Font scaling basis.
    pub basis: Option<u32>,
    /// Device scale factor.
    pub scale: u32,
    /// Output format.
    #[serde(rename = "type")]
    pub image_type: ImageType,
    /// Whether this is a preview render.
    pub preview: bool,
}

/// A template dialect.
///
/// Implementations must be thread-safe; one handler serves every render.
pub trait TemplateHandler: Send + Sync {
    /// Compile raw source into the form the fingerprint is searched in.
    ///
    /// Directive expansion happens here, so the marker appears only in
    /// the output of this method.
    fn compile(&self, source: &str) -> Result<String>;

    /// Whether the compiled source carries the fingerprint marker.
    fn has_fingerprint(&self, source: &str) -> Result<bool> {
        Ok(fingerprint::has_fingerprint(&self.compile(source)?))
    }

    /// Parameters declared by the template's raster directive, as
    /// key/value text in declaration order.
    fn directive_parameters(&self, source: &str) -> Result<Vec<(String, String)>>;

    /// Render `name` with `data`, placing `slot` where the template
    /// outputs its slot.
    fn render_body(
        &self,
        name: &str,
        data: &DataMap,
        slot: Option<&str>,
        info: &TemplateInfo,
    ) -> Result<String>;
}

/// A template located on disk.
#[derive(Clone)]
pub struct LocatedTemplate {
    /// Dotted template name.
    pub name: String,
    /// Absolute or root-relative file path.
    pub path: PathBuf,
    /// Matched extension, e.g. `html.tera`.
    pub extension: String,
    /// Handler registered for the extension.
    pub handler: Arc<dyn TemplateHandler>,
}

impl LocatedTemplate {
    /// Read the raw template source.
    ///
    /// Any read failure surfaces as [`RasterError::TemplateNotFound`].
    pub fn read_source(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            RasterError::TemplateNotFound(format!("{} ({}: {})", self.name, self.path.display(), e))
        })
    }
}

impl fmt::Debug for LocatedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatedTemplate")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("extension", &self.extension)
            .finish()
    }
}

/// Extension → handler registry rooted at a template directory.
pub struct TemplateRegistry {
    root: PathBuf,
    handlers: Vec<(String, Arc<dyn TemplateHandler>)>,
}

impl TemplateRegistry {
    /// Empty registry over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handlers: Vec::new(),
        }
    }

    /// Registry with the built-in Tera dialect for `html.tera` files.
    pub fn with_tera(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let handler = TeraHandler::new(&root)?;
        Ok(Self::new(root).register(TERA_EXTENSION, handler))
    }

    /// Register a handler for `extension` (without leading dot).
    ///
    /// Re-registering an extension replaces its handler.
    pub fn register<H>(mut self, extension: impl Into<String>, handler: H) -> Self
    where
        H: TemplateHandler + 'static,
    {
        let extension = extension.into();
        self.handlers.retain(|(ext, _)| *ext != extension);
        self.handlers.push((extension, Arc::new(handler)));
        self
    }

    /// Template root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handler for `extension`, if registered.
    pub fn handler(&self, extension: &str) -> Option<Arc<dyn TemplateHandler>> {
        self.handlers
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Registered extensions in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(ext, _)| ext.as_str())
    }

    /// Find the file for a dotted template name.
    ///
    /// Files with a registered extension win. A file that exists only with
    /// unregistered extensions is [`RasterError::UnsupportedResourceType`];
    /// no file at all is [`RasterError::TemplateNotFound`].
    pub fn locate(&self, name: &str) -> Result<LocatedTemplate> {
        let mut relative: PathBuf = name.split('.').collect();
        let stem = match relative.file_name().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => format!("{}.", stem),
            _ => return Err(RasterError::TemplateNotFound(name.to_string())),
        };
        relative.pop();
        let dir = self.root.join(relative);

        for (extension, handler) in &self.handlers {
            let path = dir.join(format!("{}{}", stem, extension));
            if path.is_file() {
                log::trace!("Template '{}' resolved to {}", name, path.display());
                return Ok(LocatedTemplate {
                    name: name.to_string(),
                    path,
                    extension: extension.clone(),
                    handler: Arc::clone(handler),
                });
            }
        }

        // Anything else with the same stem is a dialect nobody registered
        let unsupported = std::fs::read_dir(&dir)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .find_map(|file| file.strip_prefix(&stem).map(str::to_string));

        match unsupported {
            Some(extension) => Err(RasterError::UnsupportedResourceType(format!(
                "template extension '{}' for '{}'",
                extension, name
            ))),
            None => Err(RasterError::TemplateNotFound(name.to_string())),
        }
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("root", &self.root)
            .field("extensions", &self.extensions().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Directive syntax
// ============================================================================

/// A `{% raster ... %}` tag found in template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive<'a> {
    /// Byte range of the whole tag.
    pub start: usize,
    pub end: usize,
    /// Text between the keyword and the closing delimiter.
    pub args: &'a str,
}

/// Scan for raster directive tags, honoring `{%-`/`-%}` whitespace control.
pub(crate) fn find_directives(source: &str) -> Vec<Directive<'_>> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(open) = source[offset..].find("{%") {
        let start = offset + open;
        let Some(close) = source[start + 2..].find("%}") else {
            break;
        };
        let end = start + 2 + close + 2;
        let inner = source[start + 2..end - 2]
            .trim_start_matches('-')
            .trim_end_matches('-')
            .trim();

        if let Some(rest) = inner.strip_prefix("raster") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                found.push(Directive {
                    start,
                    end,
                    args: rest.trim(),
                });
            }
        }
        offset = end;
    }

    found
}

/// Parse `key=value` pairs separated by whitespace or commas.
///
/// Values may be bare (`1200`, `true`) or quoted (`"pdf"`, `'x y'`).
pub(crate) fn parse_directive_args(args: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut rest = args.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            return Err(RasterError::Template(format!(
                "malformed raster directive argument '{}'",
                rest
            )));
        };
        let key = rest[..eq].trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RasterError::Template(format!(
                "malformed raster directive key '{}'",
                key
            )));
        }

        let value_part = rest[eq + 1..].trim_start();
        let (value, remainder) = match value_part.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &value_part[1..];
                let Some(close) = body.find(quote) else {
                    return Err(RasterError::Template(format!(
                        "unterminated string for raster directive key '{}'",
                        key
                    )));
                };
                (&body[..close], &body[close + 1..])
            }
            _ => {
                let stop = value_part
                    .find(|c: char| c.is_whitespace() || c == ',')
                    .unwrap_or(value_part.len());
                (&value_part[..stop], &value_part[stop..])
            }
        };

        pairs.push((key.to_string(), value.to_string()));
        rest = remainder.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_directives() {
        let source = "a {% raster width=10 %} b {%- raster -%} c {% rasterize %} {% if x %}";
        let found = find_directives(source);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].args, "width=10");
        assert_eq!(&source[found[0].start..found[0].end], "{% raster width=10 %}");
        assert_eq!(found[1].args, "");
    }

    #[test]
    fn test_find_directives_unterminated() {
        assert!(find_directives("{% raster width=10").is_empty());
    }

    #[test]
    fn test_find_directives_degenerate_tags() {
        assert!(find_directives("<p>{%}</p>").is_empty());
        assert!(find_directives("<p>{%%}</p>").is_empty());
        assert_eq!(find_directives("{%%}{% raster %}").len(), 1);
    }

    #[test]
    fn test_parse_directive_args() {
        let pairs = parse_directive_args(r#"width=1200, basis=600 type="pdf" cacheId='a b'"#).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("width".to_string(), "1200".to_string()),
                ("basis".to_string(), "600".to_string()),
                ("type".to_string(), "pdf".to_string()),
                ("cacheId".to_string(), "a b".to_string()),
            ]
        );
        assert!(parse_directive_args("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_directive_args_errors() {
        assert!(parse_directive_args("width").is_err());
        assert!(parse_directive_args("=10").is_err());
        assert!(parse_directive_args("type=\"pdf").is_err());
    }

    #[test]
    fn test_locate_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::with_tera(dir.path()).unwrap();

        assert!(matches!(
            registry.locate("cards.og"),
            Err(RasterError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_locate_nested_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cards")).unwrap();
        std::fs::write(dir.path().join("cards/og.html.tera"), "<p>og</p>").unwrap();
        std::fs::write(dir.path().join("cards/legacy.blade.php"), "<p></p>").unwrap();
        let registry = TemplateRegistry::with_tera(dir.path()).unwrap();

        let located = registry.locate("cards.og").unwrap();
        assert_eq!(located.extension, TERA_EXTENSION);
        assert_eq!(located.read_source().unwrap(), "<p>og</p>");

        match registry.locate("cards.legacy") {
            Err(RasterError::UnsupportedResourceType(msg)) => assert!(msg.contains("blade.php")),
            other => panic!("Expected UnsupportedResourceType, got {:?}", other),
        }
    }

    #[test]
    fn test_register_replaces_extension() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::with_tera(dir.path())
            .unwrap()
            .register(TERA_EXTENSION, TeraHandler::new(dir.path()).unwrap());
        assert_eq!(registry.extensions().count(), 1);
        assert!(registry.handler(TERA_EXTENSION).is_some());
        assert!(registry.handler("twig").is_none());
    }
}
