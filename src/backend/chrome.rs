//! Headless Chrome backend.
//!
//! Each job opens a fresh tab, loads the HTML as a data URL, sizes the
//! window, captures or prints, and closes the tab again. Browser process
//! lifecycle is left to `headless_chrome`.

use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::DOM::RGBA;
use headless_chrome::protocol::cdp::Emulation::SetDefaultBackgroundColorOverride;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::types::{Bounds, PrintToPdfOptions};
use headless_chrome::{Browser, LaunchOptions, Tab};

use super::{CaptureJob, MM_PER_INCH, PdfJob, Screenshotter};
use crate::error::{RasterError, Result};
use crate::params::ImageType;

/// Default per-tab timeout for navigation and CDP calls.
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// [`Screenshotter`] backed by a headless Chrome process.
pub struct ChromeScreenshotter {
    browser: Browser,
    page_timeout: Duration,
}

impl ChromeScreenshotter {
    /// Wrap an already running browser.
    pub fn from_browser(browser: Browser) -> Self {
        Self {
            browser,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }

    /// Launch Chrome, auto-detecting the binary unless `chrome_path` is set.
    pub fn launch(chrome_path: Option<&str>) -> Result<Self> {
        let options =
            create_chrome_options(chrome_path).map_err(|e| RasterError::Configuration(e.to_string()))?;

        log::debug!("Launching Chrome browser...");
        let browser = Browser::new(options)
            .map_err(|e| RasterError::RenderingBackend(format!("Chrome launch failed: {}", e)))?;
        Ok(Self::from_browser(browser))
    }

    /// Override the per-tab timeout.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Open a tab sized to `width × height` with `html` loaded.
    fn open_page(
        &self,
        html: &str,
        style: &str,
        width: u32,
        height: u32,
        transparent: bool,
    ) -> Result<std::sync::Arc<Tab>> {
        log::trace!("Creating new browser tab");
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| backend_error("failed to create tab", e))?;
        tab.set_default_timeout(self.page_timeout);

        tab.set_bounds(Bounds::Normal {
            left: Some(0),
            top: Some(0),
            width: Some(f64::from(width)),
            height: Some(f64::from(height.max(1))),
        })
        .map_err(|e| backend_error("failed to size window", e))?;

        if transparent {
            tab.call_method(SetDefaultBackgroundColorOverride {
                color: Some(RGBA {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: Some(0.0),
                }),
            })
            .map_err(|e| backend_error("failed to clear background", e))?;
        }

        let document = inject_style(html, style);
        let data_url = format!(
            "data:text/html;charset=utf-8,{}",
            urlencoding::encode(&document)
        );
        log::trace!("Data URL length: {} bytes", data_url.len());

        let nav_start = Instant::now();
        tab.navigate_to(&data_url)
            .map_err(|e| backend_error("navigation failed", e))?
            .wait_until_navigated()
            .map_err(|e| backend_error("navigation timeout", e))?;
        log::debug!("Navigation completed in {:?}", nav_start.elapsed());

        Ok(tab)
    }
}

impl Screenshotter for ChromeScreenshotter {
    fn capture(&self, job: &CaptureJob) -> Result<Vec<u8>> {
        let start = Instant::now();
        let tab = self.open_page(
            &job.html,
            &job.style,
            job.width,
            job.height.unwrap_or(1),
            job.transparent,
        )?;

        let result = (|| -> Result<Vec<u8>> {
            let height = match job.height {
                Some(height) => f64::from(height),
                None => document_height(&tab)?,
            };
            let format = match job.image_type {
                ImageType::Jpeg => CaptureScreenshotFormatOption::Jpeg,
                _ => CaptureScreenshotFormatOption::Png,
            };
            let clip = Viewport {
                x: 0.0,
                y: 0.0,
                width: f64::from(job.width),
                height,
                scale: f64::from(job.scale),
            };
            tab.capture_screenshot(format, None, Some(clip), true)
                .map_err(|e| backend_error("screenshot failed", e))
        })();

        close_tab_safely(&tab);
        let bytes = result?;
        log::debug!(
            "Captured {} in {:?} ({} bytes)",
            job.image_type,
            start.elapsed(),
            bytes.len()
        );
        Ok(bytes)
    }

    fn print_pdf(&self, job: &PdfJob) -> Result<Vec<u8>> {
        let start = Instant::now();
        let tab = self.open_page(&job.html, &job.style, job.width, job.height, false)?;

        let result = tab
            .print_to_pdf(Some(build_print_options(job)))
            .map_err(|e| backend_error("PDF generation failed", e));

        close_tab_safely(&tab);
        let bytes = result?;
        log::debug!("PDF printed in {:?} ({} bytes)", start.elapsed(), bytes.len());
        Ok(bytes)
    }
}

impl std::fmt::Debug for ChromeScreenshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeScreenshotter")
            .field("page_timeout", &self.page_timeout)
            .finish()
    }
}

/// Chrome launch options tuned for headless, containerized rendering.
pub fn create_chrome_options(
    chrome_path: Option<&str>,
) -> std::result::Result<LaunchOptions<'static>, Box<dyn std::error::Error + Send + Sync>> {
    match chrome_path {
        Some(path) => log::debug!("Creating Chrome options with custom path: {}", path),
        None => log::debug!("Creating Chrome options (auto-detect browser)"),
    }

    let mut builder = LaunchOptions::default_builder();

    if let Some(path) = chrome_path {
        builder.path(Some(path.to_string().into()));
    }

    builder
        .headless(true)
        .sandbox(false) // required in most containers
        .disable_default_args(true)
        .args(vec![
            "--disable-dev-shm-usage".as_ref(),
            "--disable-crash-reporter".as_ref(),
            "--disable-extensions".as_ref(),
            "--disable-sync".as_ref(),
            "--disable-default-apps".as_ref(),
            "--enable-automation".as_ref(),
            "--hide-scrollbars".as_ref(),
            "--font-render-hinting=none".as_ref(),
            "--force-color-profile=srgb".as_ref(),
            "--disable-background-timer-throttling".as_ref(),
            "--disable-backgrounding-occluded-windows".as_ref(),
            "--disable-renderer-backgrounding".as_ref(),
        ])
        .build()
        .map_err(|e| e.into())
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

fn backend_error(context: &str, error: impl std::fmt::Display) -> RasterError {
    RasterError::RenderingBackend(format!("{}: {}", context, error))
}

/// Place `style` at the end of `<head>`, or in front of the document.
fn inject_style(html: &str, style: &str) -> String {
    let tag = format!("<style>{}</style>", style);
    match html.find("</head>") {
        Some(idx) => format!("{}{}{}", &html[..idx], tag, &html[idx..]),
        None => format!("{}{}", tag, html),
    }
}

fn document_height(tab: &Tab) -> Result<f64> {
    let value = tab
        .evaluate(
            "Math.ceil(Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0))",
            false,
        )
        .map_err(|e| backend_error("failed to measure page", e))?
        .value
        .and_then(|v| v.as_f64())
        .unwrap_or(1.0);
    Ok(value.max(1.0))
}

fn build_print_options(job: &PdfJob) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(true),
        scale: Some(f64::from(job.scale)),
        // CDP takes inches
        paper_width: Some(job.paper_width_mm / MM_PER_INCH),
        paper_height: Some(job.paper_height_mm / MM_PER_INCH),
        margin_top: Some(0.0),
        margin_bottom: Some(0.0),
        margin_left: Some(0.0),
        margin_right: Some(0.0),
        page_ranges: Some("1".to_string()),
        ..Default::default()
    }
}

fn close_tab_safely(tab: &Tab) {
    if let Err(e) = tab.close(true) {
        log::warn!(
            "Failed to close tab (continuing anyway, resources will be cleaned up): {}",
            e
        );
    } else {
        log::trace!("Tab closed successfully");
    }
}
