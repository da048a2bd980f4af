// ABOUTME: Library module for the deck-export program.
// ABOUTME: Contains the export engine that turns slide decks into HTML, PDF and JSON artifacts.

// Reexport modules
pub mod assets;
pub mod capture;
pub mod config;
pub mod dom;
pub mod errors;
pub mod geometry;
pub mod html;
pub mod json;
pub mod model;
pub mod pdf;
pub mod resources;
pub mod store;
pub mod surface;
pub mod utils;

// Reexport common types and functions
pub use assets::{AssetResolver, AssetStore};
pub use capture::{capture_thumbnail, CaptureConfig, CaptureOptions, Capturer, ChromeCapturer};
pub use config::Config;
pub use errors::{DeckError, Result};
pub use geometry::bounding_box;
pub use html::{export_html, render_html_document, HtmlOptions};
pub use json::{
    archive_presentation, export_json, import_json_file, import_json_str, JsonOptions,
    PresentationArchive,
};
pub use model::{Background, Element, ElementKind, Presentation, Slide};
pub use pdf::{build_pdf, export_pdf, PdfExport, PdfOptions, PdfReport, Quality, SlideProgress};
pub use resources::ResourceFile;
pub use store::FileStore;
pub use surface::{ExportSession, RenderSurface, RenderedDeck, RenderedSlide, StaticSurface, StyleSource};

#[cfg(test)]
mod tests;
