//! Render-awareness fingerprint.
//!
//! Templates opt into automatic rendering by carrying the raster directive.
//! A template handler's compile step turns that directive into a fixed
//! marker string, so the marker only exists in the *compiled* form of a
//! template and never in its raw source. Searching the raw source would
//! miss markers produced by directive expansion.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

/// Build-unique marker string, e.g. `__raster_3f2a…__`.
///
/// Derived once per process from the crate's identity.
pub fn fingerprint() -> &'static str {
    static FINGERPRINT: OnceLock<String> = OnceLock::new();
    FINGERPRINT.get_or_init(|| {
        let identity = concat!(
            env!("CARGO_PKG_NAME"),
            "@",
            env!("CARGO_PKG_VERSION"),
            ":",
            module_path!()
        );
        format!("__raster_{}__", hex::encode(Sha256::digest(identity.as_bytes())))
    })
}

/// Whether a compiled template contains the fingerprint.
pub fn has_fingerprint(compiled: &str) -> bool {
    compiled.contains(fingerprint())
}
