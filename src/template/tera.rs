//! Built-in Tera dialect.
//!
//! Templates live under the template root as `*.html.tera` files and are
//! addressed by dotted name (`cards/og.html.tera` → `cards.og`). A template
//! opts into automatic rendering with a directive tag:
//!
//! ```text
//! {% raster width=1200 basis=600 type="png" %}
//! <h1>{{ title }}</h1>
//! ```
//!
//! Compilation rewrites the directive into a Tera comment carrying the
//! fingerprint, which renders to nothing. Every template receives its data,
//! a `slot` variable (inner HTML for layouts and components, output with
//! `{{ slot | safe }}`) and a `raster` object describing the render.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use ::tera::{Context, Tera};
use walkdir::WalkDir;

use super::{TemplateHandler, TemplateInfo, find_directives, parse_directive_args};
use crate::error::{RasterError, Result};
use crate::fingerprint::fingerprint;
use crate::params::DataMap;

/// File extension handled by [`TeraHandler`].
pub const TERA_EXTENSION: &str = "html.tera";

/// Name of the layout wrapped around every render.
pub const DEFAULT_LAYOUT: &str = "raster.layout";

const BUILTIN_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
</head>
<body style="margin: 0">{{ slot | safe }}</body>
</html>
"#;

/// Tera-backed [`TemplateHandler`].
pub struct TeraHandler {
    root: PathBuf,
    tera: RwLock<Tera>,
}

impl TeraHandler {
    /// Load and compile every `*.html.tera` file under `root`.
    ///
    /// A missing root directory yields a handler with only the built-in
    /// layout.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let tera = load(&root)?;
        Ok(Self {
            root,
            tera: RwLock::new(tera),
        })
    }

    /// Re-read all templates from disk.
    pub fn reload(&self) -> Result<()> {
        let fresh = load(&self.root)?;
        let mut tera = self
            .tera
            .write()
            .map_err(|e| RasterError::Template(format!("template set lock poisoned: {}", e)))?;
        *tera = fresh;
        log::debug!("Reloaded Tera templates from {}", self.root.display());
        Ok(())
    }

    /// Names of all loaded templates, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let Ok(tera) = self.tera.read() else {
            return Vec::new();
        };
        let mut names: Vec<String> = tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }
}

impl TemplateHandler for TeraHandler {
    fn compile(&self, source: &str) -> Result<String> {
        Ok(compile_source(source))
    }

    fn directive_parameters(&self, source: &str) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for directive in find_directives(source) {
            pairs.extend(parse_directive_args(directive.args)?);
        }
        Ok(pairs)
    }

    fn render_body(
        &self,
        name: &str,
        data: &DataMap,
        slot: Option<&str>,
        info: &TemplateInfo,
    ) -> Result<String> {
        let mut context = Context::from_serialize(data).map_err(tera_error)?;
        context.insert("slot", slot.unwrap_or_default());
        context.insert("raster", info);

        let tera = self
            .tera
            .read()
            .map_err(|e| RasterError::Template(format!("template set lock poisoned: {}", e)))?;
        tera.render(name, &context).map_err(tera_error)
    }
}

impl std::fmt::Debug for TeraHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeraHandler")
            .field("root", &self.root)
            .field("templates", &self.template_names())
            .finish()
    }
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Replace every raster directive with a comment carrying the fingerprint.
fn compile_source(source: &str) -> String {
    let directives = find_directives(source);
    if directives.is_empty() {
        return source.to_string();
    }

    let marker = format!("{{# {} #}}", fingerprint());
    let mut compiled = String::with_capacity(source.len() + directives.len() * marker.len());
    let mut cursor = 0;
    for directive in directives {
        compiled.push_str(&source[cursor..directive.start]);
        compiled.push_str(&marker);
        cursor = directive.end;
    }
    compiled.push_str(&source[cursor..]);
    compiled
}

fn load(root: &Path) -> Result<Tera> {
    let suffix = format!(".{}", TERA_EXTENSION);
    let mut sources = Vec::new();

    if root.is_dir() {
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| {
                RasterError::Template(format!("failed to scan {}: {}", root.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let Some(name) = template_name(relative, &suffix) else {
                continue;
            };
            let source = std::fs::read_to_string(entry.path()).map_err(|e| {
                RasterError::Template(format!("failed to read {}: {}", entry.path().display(), e))
            })?;
            sources.push((name, compile_source(&source)));
        }
    } else {
        log::debug!(
            "Template root {} does not exist, using built-in layout only",
            root.display()
        );
    }

    if !sources.iter().any(|(name, _)| name == DEFAULT_LAYOUT) {
        sources.push((DEFAULT_LAYOUT.to_string(), BUILTIN_LAYOUT.to_string()));
    }

    let mut tera = Tera::default();
    // Names are dotted, not `.html`, so escape everything
    tera.autoescape_on(vec![""]);
    tera.add_raw_templates(sources).map_err(tera_error)?;

    log::debug!(
        "Loaded {} Tera templates from {}",
        tera.get_template_names().count(),
        root.display()
    );
    Ok(tera)
}

/// `cards/og.html.tera` → `cards.og`.
fn template_name(relative: &Path, suffix: &str) -> Option<String> {
    let segments: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    let (file, dirs) = segments.split_last()?;
    let stem = file.strip_suffix(suffix).filter(|s| !s.is_empty())?;

    let mut name = dirs.join(".");
    if !name.is_empty() {
        name.push('.');
    }
    name.push_str(stem);
    Some(name)
}

fn tera_error(error: ::tera::Error) -> RasterError {
    if let ::tera::ErrorKind::TemplateNotFound(name) = &error.kind {
        return RasterError::TemplateNotFound(name.clone());
    }

    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    RasterError::Template(message)
}
