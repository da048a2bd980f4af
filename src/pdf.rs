// ABOUTME: PDF export of a presentation: one raster page per slide with clickable link regions
// ABOUTME: Slide capture failures become blank pages so the page count always matches the deck

use crate::capture::{CaptureOptions, Capturer};
use crate::dom::Rect;
use crate::errors::{DeckError, Result};
use crate::geometry;
use crate::model::Presentation;
use crate::surface::{collect_styles, ExportSession, RenderSurface, RenderedDeck, RenderedSlide};
use crate::utils;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use log::{debug, info, warn};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Raster resolution of captured slides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

impl Quality {
    /// Capture scale factor: high=2x, medium=1.5x, low=1x
    pub fn scale(&self) -> f64 {
        match self {
            Quality::High => 2.0,
            Quality::Medium => 1.5,
            Quality::Low => 1.0,
        }
    }
}

impl FromStr for Quality {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            "low" => Ok(Quality::Low),
            other => Err(DeckError::ValidationError(format!(
                "unknown PDF quality '{}', expected high, medium or low",
                other
            ))),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Landscape when wider than tall
pub fn page_orientation(width: f64, height: f64) -> Orientation {
    if width > height {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    }
}

/// Options for a PDF export
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub settle_delay: Duration,
    pub image_timeout: Duration,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            quality: Quality::High,
            settle_delay: Duration::from_millis(500),
            image_timeout: Duration::from_secs(10),
        }
    }
}

/// Reported after every slide attempt, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct SlideProgress {
    pub completed: usize,
    pub total: usize,
    pub slide_id: String,
    pub failure: Option<String>,
}

/// Outcome of building a PDF
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfReport {
    pub pages: usize,
    /// Slide id and reason for every slide rendered as a blank page
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfExport {
    pub path: PathBuf,
    pub report: PdfReport,
}

/// Where a link region points
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Zero-based page index
    Page(usize),
    External(String),
}

/// A clickable region in slide coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRegion {
    pub rect: Rect,
    pub target: LinkTarget,
}

/// Resolve an href against the deck.
///
/// `#fragment` hrefs match a slide id, web and mail addresses are external,
/// and anything else is tried as a bare slide id. Unresolvable hrefs give `None`.
pub fn resolve_href(href: &str, presentation: &Presentation) -> Option<LinkTarget> {
    let href = href.trim();
    if let Some(fragment) = href.strip_prefix('#') {
        return presentation.slide_index(fragment).map(LinkTarget::Page);
    }
    if href.starts_with("http://") || href.starts_with("https://") || href.starts_with("mailto:")
    {
        return Some(LinkTarget::External(href.to_string()));
    }
    presentation.slide_index(href).map(LinkTarget::Page)
}

/// Record the link regions of a rendered slide before it is flattened to pixels
pub fn extract_links(rendered: &RenderedSlide, presentation: &Presentation) -> Vec<LinkRegion> {
    let mut regions = Vec::new();
    for anchor in rendered.root.find_all(|n| n.tag.eq_ignore_ascii_case("a")) {
        let Some(href) = anchor.get_attr("href").filter(|h| !h.trim().is_empty()) else {
            continue;
        };
        let Some(rect) = geometry::bounding_box(anchor, &rendered.root) else {
            debug!("Link {} on slide {} is clipped, skipping", href, rendered.slide_id);
            continue;
        };
        match resolve_href(href, presentation) {
            Some(target) => regions.push(LinkRegion { rect, target }),
            None => debug!("Link {} on slide {} does not resolve", href, rendered.slide_id),
        }
    }
    regions
}

/// Flatten RGBA over white and deflate it into an image XObject
fn image_xobject(image: &RgbaImage) -> Result<Stream> {
    let mut rgb = Vec::with_capacity((image.width() * image.height() * 3) as usize);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        for channel in [r, g, b] {
            rgb.push(((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8);
        }
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&rgb)?;
    let compressed = encoder.finish()?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed,
    ))
}

fn content_stream(operations: Vec<Operation>) -> Result<Stream> {
    let content = Content { operations };
    Ok(Stream::new(dictionary! {}, content.encode()?))
}

fn link_annotation(
    region: &LinkRegion,
    page_height: f32,
    page_ids: &[ObjectId],
) -> Option<lopdf::Dictionary> {
    let r = &region.rect;
    let rect: Vec<Object> = vec![
        (r.x as f32).into(),
        (page_height - (r.y + r.height) as f32).into(),
        ((r.x + r.width) as f32).into(),
        (page_height - r.y as f32).into(),
    ];
    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect,
        "Border" => vec![0.into(), 0.into(), 0.into()],
    };
    match &region.target {
        LinkTarget::Page(index) => {
            let page_id = page_ids.get(*index)?;
            annot.set("Dest", vec![Object::Reference(*page_id), "Fit".into()]);
        }
        LinkTarget::External(uri) => {
            annot.set(
                "A",
                dictionary! {
                    "S" => "URI",
                    "URI" => Object::String(uri.as_bytes().to_vec(), StringFormat::Literal),
                },
            );
        }
    }
    Some(annot)
}

/// Build the PDF bytes for a rendered deck.
///
/// Slides are processed strictly in presentation order. A slide that cannot be
/// captured (or was not rendered) gets a blank page of its size and no links.
pub fn build_pdf(
    presentation: &Presentation,
    deck: &RenderedDeck,
    capturer: &mut dyn Capturer,
    options: &PdfOptions,
    mut progress: Option<&mut dyn FnMut(&SlideProgress)>,
) -> Result<(Vec<u8>, PdfReport)> {
    if presentation.slides.is_empty() {
        return Err(DeckError::ValidationError("no slides".to_string()));
    }

    let stylesheet = collect_styles(&deck.stylesheets);
    let total = presentation.slides.len();
    let mut report = PdfReport::default();

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_ids: Vec<ObjectId> = presentation.slides.iter().map(|_| doc.new_object_id()).collect();

    for (index, slide) in presentation.slides.iter().enumerate() {
        let (width, height) = (slide.width as f32, slide.height as f32);
        debug!(
            "Page {} for slide {}: {}x{} px ({:?})",
            index + 1,
            slide.id,
            width,
            height,
            page_orientation(slide.width, slide.height)
        );

        let captured = match deck.slide(&slide.id) {
            Some(rendered) => {
                let links = extract_links(rendered, presentation);
                let capture_options = CaptureOptions {
                    scale: options.quality.scale(),
                    background: slide.background.clone(),
                    image_timeout: options.image_timeout,
                };
                capturer
                    .capture(rendered, &stylesheet, &capture_options)
                    .map(|image| (image, links))
            }
            None => Err(DeckError::capture(&slide.id, "slide was not rendered")),
        };

        let mut resources = lopdf::Dictionary::new();
        let mut annots = Vec::new();
        let failure = match captured {
            Ok((image, links)) => {
                let image_id = doc.add_object(image_xobject(&image)?);
                resources.set("XObject", dictionary! { "Im1" => image_id });
                let content = content_stream(vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ])?;
                let content_id = doc.add_object(content);

                for region in &links {
                    if let Some(annot) = link_annotation(region, height, &page_ids) {
                        annots.push(Object::Reference(doc.add_object(annot)));
                    }
                }
                doc.objects.insert(
                    page_ids[index],
                    Object::Dictionary(page_dict(pages_id, width, height, content_id, resources, annots)),
                );
                None
            }
            Err(e) => {
                warn!("Rendering slide {} as a blank page: {}", slide.id, e);
                let content = content_stream(vec![
                    Operation::new("g", vec![1.into()]),
                    Operation::new(
                        "re",
                        vec![0.into(), 0.into(), width.into(), height.into()],
                    ),
                    Operation::new("f", vec![]),
                ])?;
                let content_id = doc.add_object(content);
                doc.objects.insert(
                    page_ids[index],
                    Object::Dictionary(page_dict(pages_id, width, height, content_id, resources, annots)),
                );
                report.failures.push((slide.id.clone(), e.to_string()));
                Some(e.to_string())
            }
        };

        report.pages += 1;
        if let Some(callback) = progress.as_deref_mut() {
            callback(&SlideProgress {
                completed: index + 1,
                total,
                slide_id: slide.id.clone(),
                failure,
            });
        }
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(presentation.title.as_bytes().to_vec(), StringFormat::Literal),
        "Producer" => Object::String(b"deck-export".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok((buffer, report))
}

fn page_dict(
    pages_id: ObjectId,
    width: f32,
    height: f32,
    content_id: ObjectId,
    resources: lopdf::Dictionary,
    annots: Vec<Object>,
) -> lopdf::Dictionary {
    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => resources,
    };
    if !annots.is_empty() {
        page.set("Annots", annots);
    }
    page
}

/// Export a presentation to `<title>.pdf` in the configured output directory
pub fn export_pdf(
    presentation: &Presentation,
    surface: &mut dyn RenderSurface,
    capturer: &mut dyn Capturer,
    options: &PdfOptions,
    progress: Option<&mut dyn FnMut(&SlideProgress)>,
) -> Result<PdfExport> {
    info!(
        "Exporting presentation {} to PDF ({} quality)",
        presentation.id, options.quality
    );
    if presentation.slides.is_empty() {
        return Err(DeckError::ValidationError("no slides".to_string()));
    }

    let session = ExportSession::begin(surface, options.settle_delay)?;
    let deck = session.snapshot(presentation)?;
    let (bytes, report) = build_pdf(presentation, &deck, capturer, options, progress)?;
    session.end();

    let path = utils::write_artifact(&options.output_dir, &presentation.title, "pdf", &bytes)?;
    if !report.failures.is_empty() {
        warn!(
            "{} of {} slides could not be captured",
            report.failures.len(),
            report.pages
        );
    }
    info!("PDF written to {:?} ({} pages)", path, report.pages);
    Ok(PdfExport { path, report })
}
