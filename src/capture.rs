// ABOUTME: Visual capture of rendered slides into raster images
// ABOUTME: Drives a headless browser per export and composites slide backgrounds beneath captures

use crate::assets;
use crate::errors::{DeckError, Result};
use crate::model::Background;
use crate::surface::RenderedSlide;
use headless_chrome::protocol::cdp::{Emulation, Page, DOM};
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use image::{imageops, DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use log::{info, warn};
use std::env;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Pixel ratio used for slide thumbnails
pub const THUMBNAIL_SCALE: f64 = 0.4;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Configuration for browser-backed capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub browser_path: Option<String>,
    pub timeout_ms: u64,
    pub image_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            timeout_ms: 30000,
            image_timeout_ms: 10000,
        }
    }
}

/// Per-capture parameters
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Output resolution multiplier over the slide's native size
    pub scale: f64,
    /// Declared slide background, painted beneath transparent pixels
    pub background: Background,
    /// How long to wait for each embedded image to load
    pub image_timeout: Duration,
}

impl CaptureOptions {
    pub fn new(scale: f64, background: Background) -> Self {
        Self {
            scale,
            background,
            image_timeout: Duration::from_secs(10),
        }
    }
}

/// Rasterises a rendered slide
pub trait Capturer {
    fn capture(
        &mut self,
        slide: &RenderedSlide,
        stylesheet: &str,
        options: &CaptureOptions,
    ) -> Result<RgbaImage>;
}

/// Parse the CSS colour forms the editor produces
pub fn parse_css_color(input: &str) -> Option<Rgba<u8>> {
    let value = input.trim().to_ascii_lowercase();
    match value.as_str() {
        "white" => return Some(WHITE),
        "black" => return Some(Rgba([0, 0, 0, 255])),
        "red" => return Some(Rgba([255, 0, 0, 255])),
        "green" => return Some(Rgba([0, 128, 0, 255])),
        "blue" => return Some(Rgba([0, 0, 255, 255])),
        "gray" | "grey" => return Some(Rgba([128, 128, 128, 255])),
        "transparent" => return Some(Rgba([0, 0, 0, 0])),
        _ => {}
    }

    if let Some(hex) = value.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()?;
        return match digits.len() {
            3 | 4 => {
                let alpha = digits.get(3).map(|d| d * 17).unwrap_or(255);
                Some(Rgba([digits[0] * 17, digits[1] * 17, digits[2] * 17, alpha]))
            }
            6 | 8 => {
                let byte = |i: usize| digits[i] * 16 + digits[i + 1];
                let alpha = if digits.len() == 8 { byte(6) } else { 255 };
                Some(Rgba([byte(0), byte(2), byte(4), alpha]))
            }
            _ => None,
        };
    }

    let args = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    let channel = |p: &str| -> Option<u8> {
        match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok().map(|v| (v.clamp(0.0, 100.0) * 2.55).round() as u8),
            None => p.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8),
        }
    };
    let alpha = match parts.get(3) {
        Some(a) => match a.strip_suffix('%') {
            Some(pct) => (pct.parse::<f64>().ok()?.clamp(0.0, 100.0) * 2.55).round() as u8,
            None => (a.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        },
        None => 255,
    };
    Some(Rgba([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha]))
}

/// Paint `background` beneath `shot`, returning an image of the same size
pub fn composite_background(shot: &RgbaImage, background: &Background) -> RgbaImage {
    let (width, height) = shot.dimensions();
    let mut canvas = match background {
        Background::Color(color) => {
            let fill = parse_css_color(color).unwrap_or_else(|| {
                warn!("Unsupported background colour {:?}, using white", color);
                WHITE
            });
            RgbaImage::from_pixel(width, height, fill)
        }
        Background::Image(source) => match background_image(source, width, height) {
            Ok(image) => image,
            Err(e) => {
                warn!("Could not paint background image: {}", e);
                RgbaImage::from_pixel(width, height, WHITE)
            }
        },
    };
    imageops::overlay(&mut canvas, shot, 0, 0);
    canvas
}

fn background_image(source: &str, width: u32, height: u32) -> Result<RgbaImage> {
    if !assets::is_inline(source) {
        return Err(DeckError::ResolutionError(format!(
            "background {} was not resolved to inline content",
            source
        )));
    }
    let (_, bytes) = assets::decode_data_uri(source)?;
    let decoded = image::load_from_memory(&bytes)?;
    Ok(decoded
        .resize_to_fill(width, height, imageops::FilterType::Triangle)
        .to_rgba8())
}

/// Standalone page holding one slide, as loaded into the capture browser
pub fn capture_page_html(slide: &RenderedSlide, stylesheet: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <style>html, body {{ margin: 0; padding: 0; background: transparent; }}</style>\n\
         <style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>",
        stylesheet.replace("</style", "<\\/style"),
        slide.root.to_html()
    )
}

/// Capture a slide at thumbnail resolution on white and encode it as PNG
pub fn capture_thumbnail(
    capturer: &mut dyn Capturer,
    slide: &RenderedSlide,
    stylesheet: &str,
) -> Result<Vec<u8>> {
    let options = CaptureOptions::new(THUMBNAIL_SCALE, Background::Color("#ffffff".to_string()));
    let image = capturer.capture(slide, stylesheet, &options)?;
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)?;
    Ok(buffer)
}

/// Script resolving to the number of images that failed to load in time
fn wait_for_images_script(timeout: Duration) -> String {
    format!(
        r#"
        (function (timeout) {{
            var images = Array.prototype.slice.call(document.images);
            return Promise.all(images.map(function (img) {{
                if (img.complete) {{ return img.naturalWidth > 0; }}
                return new Promise(function (resolve) {{
                    var timer = setTimeout(function () {{ resolve(false); }}, timeout);
                    img.addEventListener('load', function () {{ clearTimeout(timer); resolve(true); }});
                    img.addEventListener('error', function () {{ clearTimeout(timer); resolve(false); }});
                }});
            }})).then(function (loaded) {{
                return loaded.filter(function (ok) {{ return !ok; }}).length;
            }});
        }})({})
        "#,
        timeout.as_millis()
    )
}

/// Override that keeps the page backdrop transparent so the declared background shows through
fn transparent_backdrop() -> Emulation::SetDefaultBackgroundColorOverride {
    Emulation::SetDefaultBackgroundColorOverride {
        color: Some(DOM::RGBA {
            r: 0,
            g: 0,
            b: 0,
            a: Some(0.0),
        }),
    }
}

/// Temporary page file backing one capture; removed on every exit path
struct PageLease {
    path: PathBuf,
}

impl PageLease {
    fn checkout(html: &str) -> Result<Self> {
        let path = env::temp_dir().join(format!("deck-capture-{}.html", uuid::Uuid::new_v4()));
        fs::write(&path, html)?;
        Ok(Self { path })
    }

    fn url(&self) -> String {
        format!("file://{}", self.path.to_string_lossy())
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to clean up capture page {:?}: {}", self.path, e);
        }
    }
}

/// Captures slides through a single headless Chrome tab
pub struct ChromeCapturer {
    // The browser process lives as long as the capturer
    _browser: Browser,
    tab: Arc<Tab>,
    timeout: Duration,
}

impl ChromeCapturer {
    /// Launch a headless browser whose window fits slides up to `width`×`height`
    pub fn launch(config: &CaptureConfig, width: u32, height: u32) -> Result<Self> {
        let mut launch_options_builder = LaunchOptionsBuilder::default();
        launch_options_builder.window_size(Some((width.max(1), height.max(1))));
        launch_options_builder.headless(true);

        if let Some(browser_path) = &config.browser_path {
            launch_options_builder.path(Some(browser_path.into()));
        }

        let launch_options = launch_options_builder
            .build()
            .map_err(|e| DeckError::browser(format!("Failed to build browser options: {:?}", e)))?;

        info!("Launching headless browser ({}x{})", width, height);
        let browser = Browser::new(launch_options)
            .map_err(|e| DeckError::browser(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DeckError::browser(format!("Failed to create new tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));
        tab.call_method(transparent_backdrop())
            .map_err(|e| DeckError::browser(format!("Failed to clear page backdrop: {}", e)))?;

        Ok(Self {
            _browser: browser,
            tab,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

impl Capturer for ChromeCapturer {
    fn capture(
        &mut self,
        slide: &RenderedSlide,
        stylesheet: &str,
        options: &CaptureOptions,
    ) -> Result<RgbaImage> {
        let id = slide.slide_id.as_str();
        let lease = PageLease::checkout(&capture_page_html(slide, stylesheet))?;

        self.tab
            .navigate_to(&lease.url())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| DeckError::capture(id, format!("navigation failed: {}", e)))?;
        self.tab
            .wait_for_element_with_custom_timeout("body", self.timeout)
            .map_err(|e| DeckError::capture(id, format!("page did not load: {}", e)))?;

        match self
            .tab
            .evaluate(&wait_for_images_script(options.image_timeout), true)
        {
            Ok(result) => {
                let pending = result.value.and_then(|v| v.as_u64()).unwrap_or(0);
                if pending > 0 {
                    warn!("{} image(s) on slide {} did not finish loading", pending, id);
                }
            }
            Err(e) => warn!("Failed to wait for images on slide {}: {}", id, e),
        }

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: slide.width,
            height: slide.height,
            scale: options.scale,
        };
        let png = self
            .tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(clip),
                true,
            )
            .map_err(|e| DeckError::capture(id, format!("screenshot failed: {}", e)))?;

        let shot = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .map_err(|e| DeckError::capture(id, format!("invalid screenshot data: {}", e)))?
            .to_rgba8();
        if shot.width() == 0 || shot.height() == 0 {
            return Err(DeckError::capture(id, "browser produced no image data"));
        }

        drop(lease);
        Ok(composite_background(&shot, &options.background))
    }
}
