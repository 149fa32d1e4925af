//! CSS injected into every render.
//!
//! The base font size scales with `width / basis` so templates designed at
//! one width can be rendered at another using `rem` units. Preview mode adds
//! chrome that centers the body on a dark backdrop at the requested size.

/// Root font size in pixels when no basis is set.
pub const BASE_FONT_SIZE: f64 = 16.0;

const PREVIEW_BACKDROP: &str = "#27272a";

/// Compute the injected stylesheet.
///
/// `width` is the resolved render width. Pure and deterministic.
pub fn compute_style(
    width: u32,
    height: Option<u32>,
    basis: Option<u32>,
    preview: bool,
) -> String {
    let font_size = match basis {
        Some(basis) if basis > 0 => BASE_FONT_SIZE * f64::from(width) / f64::from(basis),
        _ => BASE_FONT_SIZE,
    };

    let mut rules = vec![format!(":root {{ font-size: {}px; }}", font_size)];

    if preview {
        rules.push(format!(
            ":root {{ min-height: 100vh; display: flex; background: {}; }}",
            PREVIEW_BACKDROP
        ));
        match height {
            Some(height) => rules.push(format!(
                "body {{ width: {}px; height: {}px; margin: auto; overflow: hidden; }}",
                width, height
            )),
            None => rules.push(format!("body {{ width: {}px; margin: auto; }}", width)),
        }
    }

    rules.join(" ")
}

/// Script appended to previews that tells an embedding frame the render
/// has finished loading.
pub fn preview_script(name: &str) -> String {
    let message = serde_json::json!({ "raster": "loaded", "name": name })
        .to_string()
        .replace("</", "<\\/");
    format!(
        "<script>window.addEventListener('load', function () {{ window.parent.postMessage({}, '*'); }});</script>",
        message
    )
}
