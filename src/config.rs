// ABOUTME: Configuration module for the deck-export application
// ABOUTME: Provides configuration settings and environment variable handling

use crate::capture::CaptureConfig;
use crate::html::HtmlOptions;
use crate::json::JsonOptions;
use crate::pdf::{PdfOptions, Quality};
use log::warn;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub browser_path: Option<String>,
    pub store_dir: PathBuf,
    pub settle_delay_ms: u64,
    pub image_timeout_ms: u64,
    pub default_timeout_ms: u64,
    pub fetch_retries: u32,
    pub default_quality: Quality,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_path: None,
            store_dir: PathBuf::from("./deck-store"),
            settle_delay_ms: 500,
            image_timeout_ms: 10000,  // 10 seconds per image
            default_timeout_ms: 30000, // 30 seconds
            fetch_retries: 3,
            default_quality: Quality::High,
        }
    }
}

fn env_parsed<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring invalid value {:?} for {}", raw, name);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            browser_path: env::var("BROWSER_PATH").ok().filter(|p| !p.trim().is_empty()),
            store_dir: env::var("DECK_STORE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            settle_delay_ms: env_parsed("SETTLE_DELAY_MS", defaults.settle_delay_ms),
            image_timeout_ms: env_parsed("IMAGE_TIMEOUT_MS", defaults.image_timeout_ms),
            default_timeout_ms: env_parsed("DEFAULT_TIMEOUT_MS", defaults.default_timeout_ms),
            fetch_retries: env_parsed("FETCH_RETRIES", defaults.fetch_retries),
            default_quality: env_parsed("PDF_QUALITY", defaults.default_quality),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Get a capture configuration with defaults from this config
    pub fn get_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            browser_path: self.browser_path.clone(),
            timeout_ms: self.default_timeout_ms,
            image_timeout_ms: self.image_timeout_ms,
        }
    }

    /// Get PDF options, falling back to the configured quality
    pub fn get_pdf_options(&self, output_dir: &Path, quality: Option<Quality>) -> PdfOptions {
        PdfOptions {
            output_dir: output_dir.to_path_buf(),
            quality: quality.unwrap_or(self.default_quality),
            settle_delay: self.settle_delay(),
            image_timeout: Duration::from_millis(self.image_timeout_ms),
        }
    }

    pub fn get_html_options(&self, output_dir: &Path) -> HtmlOptions {
        HtmlOptions {
            output_dir: output_dir.to_path_buf(),
            settle_delay: self.settle_delay(),
        }
    }

    pub fn get_json_options(&self, output_dir: &Path) -> JsonOptions {
        JsonOptions {
            output_dir: output_dir.to_path_buf(),
        }
    }
}
