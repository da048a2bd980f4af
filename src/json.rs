// ABOUTME: JSON archive export and import with every image embedded in a side asset map
// ABOUTME: Export mints fresh asset ids per reference; import substitutes them back tolerantly

use crate::assets::AssetResolver;
use crate::errors::{DeckError, Result};
use crate::model::{new_id, Background, ElementKind, Presentation, Slide};
use crate::utils;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

/// Self-contained archive of a presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationArchive {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct JsonOptions {
    pub output_dir: PathBuf,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

/// Replace one reference with a fresh asset id, recording its inline content
fn externalize(reference: &str, resolver: &AssetResolver, assets: &mut Vec<(String, String)>) -> String {
    let content = resolver.resolve(reference);
    let asset_id = new_id();
    debug!("Assigned asset id {} to {}", asset_id, reference);
    assets.push((asset_id.clone(), content));
    asset_id
}

fn archive_slide(slide: &Slide, resolver: &AssetResolver) -> (Slide, Vec<(String, String)>) {
    let mut assets = Vec::new();
    let mut archived = slide.clone();

    if let Background::Image(reference) = &slide.background {
        archived.background = Background::Image(externalize(reference, resolver, &mut assets));
    }
    for element in &mut archived.elements {
        if let ElementKind::Image(image) = &mut element.kind {
            image.asset_id = externalize(&image.asset_id, resolver, &mut assets);
        }
    }
    (archived, assets)
}

/// Build the archive form of a presentation.
///
/// Slides are processed concurrently, one worker per slide, and joined in
/// order. Assets that cannot be resolved keep their original reference as content.
pub fn archive_presentation(
    presentation: &Presentation,
    resolver: &AssetResolver,
) -> Result<PresentationArchive> {
    let results = thread::scope(|scope| {
        let workers: Vec<_> = presentation
            .slides
            .iter()
            .map(|slide| scope.spawn(move || archive_slide(slide, resolver)))
            .collect();
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .map_err(|_| DeckError::UnknownError("asset worker panicked".to_string()))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut slides = Vec::with_capacity(results.len());
    let mut assets = BTreeMap::new();
    for (slide, slide_assets) in results {
        slides.push(slide);
        assets.extend(slide_assets);
    }

    Ok(PresentationArchive {
        id: presentation.id.clone(),
        title: presentation.title.clone(),
        created_at: presentation.created_at,
        updated_at: presentation.updated_at,
        slides,
        assets,
    })
}

/// Export a presentation to `<title>.json` with embedded assets
pub fn export_json(
    presentation: &Presentation,
    resolver: &AssetResolver,
    options: &JsonOptions,
) -> Result<PathBuf> {
    info!("Exporting presentation {} to JSON", presentation.id);
    if presentation.slides.is_empty() {
        return Err(DeckError::ValidationError("no slides".to_string()));
    }

    let archive = archive_presentation(presentation, resolver)?;
    let text = serde_json::to_string_pretty(&archive)?;
    let path = utils::write_artifact(&options.output_dir, &presentation.title, "json", text.as_bytes())?;
    info!("JSON written to {:?} ({} assets)", path, archive.assets.len());
    Ok(path)
}

fn restore(reference: &str, assets: &BTreeMap<String, String>) -> String {
    match assets.get(reference) {
        Some(content) => content.clone(),
        None => {
            warn!("Asset {} missing from archive, keeping the stored value", reference);
            reference.to_string()
        }
    }
}

/// Rebuild a presentation from an archive under a fresh identifier
pub fn import_archive(archive: PresentationArchive) -> Result<Presentation> {
    if archive.slides.is_empty() {
        return Err(DeckError::ValidationError(
            "archive contains no slides".to_string(),
        ));
    }

    let assets = archive.assets;
    let mut slides = archive.slides;
    for slide in &mut slides {
        if let Background::Image(reference) = &slide.background {
            slide.background = Background::Image(restore(reference, &assets));
        }
        for element in &mut slide.elements {
            if let ElementKind::Image(image) = &mut element.kind {
                image.asset_id = restore(&image.asset_id, &assets);
            }
        }
    }

    Ok(Presentation {
        id: new_id(),
        title: archive.title,
        slides,
        created_at: archive.created_at,
        updated_at: archive.updated_at,
    })
}

/// Parse archive text and import it
pub fn import_json_str(text: &str) -> Result<Presentation> {
    let archive: PresentationArchive = serde_json::from_str(text)?;
    let presentation = import_archive(archive)?;
    info!(
        "Imported presentation '{}' as {}",
        presentation.title, presentation.id
    );
    Ok(presentation)
}

/// Read an archive from disk and import it
pub fn import_json_file(path: &Path) -> Result<Presentation> {
    let text = fs::read_to_string(path)?;
    import_json_str(&text)
}
