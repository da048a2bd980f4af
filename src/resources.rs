// ABOUTME: Resource handling for the deck-export application
// ABOUTME: Handles local and remote text resources (stylesheets) and HTTP byte fetches with retry

use crate::errors::{DeckError, Result};
use log::info;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Number of attempts made for a remote fetch before giving up
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Represents a resource file that can be either local or remote.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFile {
    pub path: String,
    pub is_remote: bool,
}

impl ResourceFile {
    /// Create a new ResourceFile from a path string.
    /// The path can be either a local file path or a URL.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            is_remote: is_remote_url(path),
        }
    }

    /// Read the content of a local resource.
    /// Remote resources are cross-origin for an exported document and
    /// cannot be introspected, so they are reported as an error.
    pub fn content(&self) -> Result<String> {
        if self.is_remote {
            return Err(DeckError::ValidationError(format!(
                "remote resource cannot be inlined: {}",
                self.path
            )));
        }
        info!("Reading local resource: {}", self.path);
        if !Path::new(&self.path).exists() {
            return Err(DeckError::ValidationError(format!(
                "resource not found: {}",
                self.path
            )));
        }
        fs::read_to_string(&self.path).map_err(DeckError::IoError)
    }
}

/// Whether a reference points at an http(s) location
pub fn is_remote_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Build the blocking HTTP client shared by remote fetches
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(DeckError::FetchError)
}

/// Fetch raw bytes from a remote URL with exponential backoff between attempts
pub fn fetch_bytes(client: &Client, url: &str, attempts: u32) -> Result<Vec<u8>> {
    info!("Fetching remote resource: {}", url);

    let mut retry_delay = 250; // milliseconds
    let mut last_error = None;

    for attempt in 1..=attempts.max(1) {
        match client.get(url).send() {
            Ok(response) => {
                if response.status().is_success() {
                    return response
                        .bytes()
                        .map(|b| b.to_vec())
                        .map_err(DeckError::FetchError);
                }
                let status = response.status();
                last_error = Some(DeckError::ResolutionError(format!(
                    "HTTP error {} for {}",
                    status, url
                )));
                // Client errors will not change on retry
                if status.is_client_error() {
                    break;
                }
            }
            Err(e) => {
                last_error = Some(DeckError::FetchError(e));
            }
        }

        if attempt < attempts {
            info!(
                "Fetch attempt {} failed, retrying in {} ms",
                attempt, retry_delay
            );
            std::thread::sleep(Duration::from_millis(retry_delay));
            retry_delay *= 2;
        }
    }

    Err(last_error
        .unwrap_or_else(|| DeckError::ResolutionError(format!("unknown error fetching {}", url))))
}
