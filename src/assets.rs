// ABOUTME: Asset resolution between opaque asset references and inline data URIs
// ABOUTME: Degrades to the original reference with a warning when an asset cannot be fetched

use crate::errors::{DeckError, Result};
use crate::resources::{self, DEFAULT_FETCH_ATTEMPTS};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, warn};
use reqwest::blocking::Client;
use std::sync::Arc;
use std::time::Duration;

/// Source of binary assets keyed by identifier (the editor's image store)
pub trait AssetStore: Send + Sync {
    /// Load the bytes stored under `id`, or `None` when nothing is stored there
    fn load_asset(&self, id: &str) -> Result<Option<Vec<u8>>>;
}

/// Whether a reference is already an inline encoding
pub fn is_inline(reference: &str) -> bool {
    reference.starts_with("data:")
}

/// Sniff a MIME type from magic bytes
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png";
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if data.starts_with(b"GIF8") {
        return "image/gif";
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if data.starts_with(b"BM") {
        return "image/bmp";
    }
    let head = String::from_utf8_lossy(&data[..data.len().min(256)]).to_lowercase();
    if head.contains("<svg") || (head.starts_with("<?xml") && head.contains("svg")) {
        return "image/svg+xml";
    }
    "application/octet-stream"
}

/// Encode bytes as a base64 data URI
pub fn encode_data_uri(data: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(data), STANDARD.encode(data))
}

/// Decode a base64 data URI into its MIME type and bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| DeckError::ResolutionError("not a data URI".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| DeckError::ResolutionError("data URI has no payload".to_string()))?;

    let mut parts = meta.split(';');
    let mime = parts.next().filter(|m| !m.is_empty()).unwrap_or("text/plain");
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| DeckError::ResolutionError(format!("invalid base64 payload: {}", e)))?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok((mime.to_string(), bytes))
}

/// Converts asset references into inline-encoded content.
///
/// References are tried in this order: inline data URIs are returned as-is,
/// `http(s)://` references are fetched, `file://` references are read from disk,
/// and anything else is looked up in the asset store.
#[derive(Clone)]
pub struct AssetResolver {
    store: Option<Arc<dyn AssetStore>>,
    client: Option<Client>,
    fetch_attempts: u32,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self {
            store: None,
            client: None,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }
}

impl AssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable fetching of remote references
    pub fn with_http(mut self, timeout: Duration, attempts: u32) -> Result<Self> {
        self.client = Some(resources::http_client(timeout)?);
        self.fetch_attempts = attempts;
        Ok(self)
    }

    /// Resolve a reference to inline content, falling back to the reference itself
    pub fn resolve(&self, reference: &str) -> String {
        match self.try_resolve(reference) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to convert asset to base64: {} ({})", reference, e);
                reference.to_string()
            }
        }
    }

    /// Resolve a reference, reporting why it could not be resolved
    pub fn try_resolve(&self, reference: &str) -> Result<String> {
        if is_inline(reference) {
            return Ok(reference.to_string());
        }
        if reference.trim().is_empty() {
            return Err(DeckError::ResolutionError("empty asset reference".to_string()));
        }

        let bytes = if resources::is_remote_url(reference) {
            let client = self.client.as_ref().ok_or_else(|| {
                DeckError::ResolutionError(format!("remote fetching disabled for {}", reference))
            })?;
            resources::fetch_bytes(client, reference, self.fetch_attempts)?
        } else if let Ok(url) = url::Url::parse(reference) {
            if url.scheme() != "file" {
                return Err(DeckError::ResolutionError(format!(
                    "unsupported asset scheme: {}",
                    url.scheme()
                )));
            }
            let path = url.to_file_path().map_err(|_| {
                DeckError::ResolutionError(format!("invalid file URL: {}", reference))
            })?;
            std::fs::read(path)?
        } else {
            let store = self.store.as_ref().ok_or_else(|| {
                DeckError::ResolutionError(format!("no asset store to look up {}", reference))
            })?;
            store.load_asset(reference)?.ok_or_else(|| {
                DeckError::ResolutionError(format!("asset not found: {}", reference))
            })?
        };

        if bytes.is_empty() {
            return Err(DeckError::ResolutionError(format!("asset {} is empty", reference)));
        }
        debug!("Resolved asset {} ({} bytes)", reference, bytes.len());
        Ok(encode_data_uri(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemoryStore(HashMap<String, Vec<u8>>);

    impl AssetStore for MemoryStore {
        fn load_asset(&self, id: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.0.get(id).cloned())
        }
    }

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn inline_references_are_returned_unchanged() {
        let resolver = AssetResolver::new();
        let uri = "data:image/png;base64,AAAA";
        assert_eq!(resolver.resolve(uri), uri);
    }

    #[test]
    fn store_references_become_data_uris() {
        let mut map = HashMap::new();
        map.insert("img-1".to_string(), PNG_HEADER.to_vec());
        let resolver = AssetResolver::new().with_store(Arc::new(MemoryStore(map)));

        let resolved = resolver.resolve("img-1");
        assert!(resolved.starts_with("data:image/png;base64,"));
        let (mime, bytes) = decode_data_uri(&resolved).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, PNG_HEADER.to_vec());
    }

    #[test]
    fn unresolvable_reference_degrades_to_original() {
        let resolver = AssetResolver::new().with_store(Arc::new(MemoryStore(HashMap::new())));
        assert_eq!(resolver.resolve("missing"), "missing");
        assert!(matches!(
            resolver.try_resolve("missing"),
            Err(DeckError::ResolutionError(_))
        ));
    }

    #[test]
    fn remote_reference_without_client_degrades() {
        let resolver = AssetResolver::new();
        assert_eq!(
            resolver.resolve("https://example.com/a.png"),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_mime(b"<svg xmlns='http://www.w3.org/2000/svg'/>"), "image/svg+xml");
        assert_eq!(sniff_mime(b"hello"), "application/octet-stream");
    }

    #[test]
    fn decodes_plain_data_uris() {
        let (mime, bytes) = decode_data_uri("data:text/plain,hi").unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"hi".to_vec());
        assert!(decode_data_uri("not-a-uri").is_err());
    }
}
