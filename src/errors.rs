// ABOUTME: Error types for the deck-export application
// ABOUTME: Provides structured error handling for each stage of the export pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Render surface error: {0}")]
    RenderError(String),

    #[error("Failed to capture slide {slide_id}: {message}")]
    CaptureError { slide_id: String, message: String },

    #[error("Failed to resolve asset: {0}")]
    ResolutionError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to fetch remote resource: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Headless browser error: {message}")]
    BrowserError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("PDF generation error: {0}")]
    PdfError(String),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl DeckError {
    /// Shorthand for a capture failure scoped to one slide
    pub fn capture(slide_id: &str, message: impl Into<String>) -> Self {
        DeckError::CaptureError {
            slide_id: slide_id.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a browser failure that only carries a message
    pub fn browser(message: impl Into<String>) -> Self {
        DeckError::BrowserError {
            message: message.into(),
            source: None,
        }
    }
}

// Implement conversion from anyhow::Error to our DeckError
impl From<anyhow::Error> for DeckError {
    fn from(err: anyhow::Error) -> Self {
        DeckError::UnknownError(err.to_string())
    }
}

impl From<lopdf::Error> for DeckError {
    fn from(err: lopdf::Error) -> Self {
        DeckError::PdfError(err.to_string())
    }
}

impl From<image::ImageError> for DeckError {
    fn from(err: image::ImageError) -> Self {
        DeckError::ImageError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
