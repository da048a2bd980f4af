use super::*;
use crate::dom::Rect;
use crate::model::{ButtonLink, ImageRef, Quiz};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

struct MemoryStore(HashMap<String, Vec<u8>>);

impl AssetStore for MemoryStore {
    fn load_asset(&self, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(id).cloned())
    }
}

/// Fills every capture with one colour at the requested scale
struct SolidCapturer;

impl Capturer for SolidCapturer {
    fn capture(
        &mut self,
        slide: &RenderedSlide,
        _stylesheet: &str,
        options: &CaptureOptions,
    ) -> Result<RgbaImage> {
        let w = (slide.width * options.scale).round() as u32;
        let h = (slide.height * options.scale).round() as u32;
        Ok(RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255])))
    }
}

fn demo() -> (Presentation, AssetResolver) {
    let mut store = HashMap::new();
    store.insert("stored-image".to_string(), PNG_BYTES.to_vec());
    let resolver = AssetResolver::new().with_store(std::sync::Arc::new(MemoryStore(store)));

    let mut p = Presentation::new("Demo");
    p.slides.push(Slide::new(800.0, 500.0));
    p.slides[0].elements.push(
        Element::new(ElementKind::Image(ImageRef {
            asset_id: "stored-image".to_string(),
        }))
        .at(20.0, 20.0, 200.0, 150.0),
    );
    p.slides[0].elements.push(
        Element::new(ElementKind::Quiz(Quiz {
            question: "Pick B".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
            correct_answer_index: 1,
        }))
        .at(300.0, 20.0, 300.0, 200.0),
    );
    let target = p.slides[1].id.clone();
    p.slides[0].elements.push(
        Element::new(ElementKind::Button(ButtonLink {
            slide_id: target,
            label: Some("Go".to_string()),
        }))
        .at(20.0, 400.0, 120.0, 50.0),
    );
    (p, resolver)
}

#[test]
fn test_demo_json_has_one_asset_for_the_image() {
    let (p, resolver) = demo();
    let archive = archive_presentation(&p, &resolver).unwrap();

    assert_eq!(archive.assets.len(), 1);
    let (key, content) = archive.assets.iter().next().unwrap();
    assert_eq!(content, &assets::encode_data_uri(PNG_BYTES));

    let image = archive.slides[0]
        .elements
        .iter()
        .find_map(|el| match &el.kind {
            ElementKind::Image(image) => Some(image),
            _ => None,
        })
        .unwrap();
    assert_eq!(&image.asset_id, key);

    let quiz = &archive.slides[0].elements[1];
    assert!(matches!(quiz.kind, ElementKind::Quiz(_)));
}

#[test]
fn test_demo_json_round_trip_restores_pixels() {
    let (p, resolver) = demo();
    let dir = TempDir::new().unwrap();
    let path = export_json(&p, &resolver, &JsonOptions { output_dir: dir.path().to_path_buf() }).unwrap();
    assert_eq!(path.file_name().unwrap(), "Demo.json");

    let imported = import_json_file(&path).unwrap();
    assert_ne!(imported.id, p.id);
    let ElementKind::Image(image) = &imported.slides[0].elements[0].kind else {
        panic!("first element should stay an image");
    };
    let (_, bytes) = assets::decode_data_uri(&image.asset_id).unwrap();
    assert_eq!(bytes, PNG_BYTES.to_vec());
    assert_eq!(imported.slides[0].elements[0].x, 20.0);
    assert_eq!(imported.slides[0].elements[0].height, 150.0);
}

#[test]
fn test_demo_html_export() {
    let (p, resolver) = demo();
    let mut surface = StaticSurface::new(resolver);
    surface.set_visible(true);
    let deck = surface.snapshot(&p).unwrap();

    let html = render_html_document(&p, &deck, "").unwrap();
    assert_eq!(html.matches("class=\"slide-container").count(), 2);
    assert!(html.contains("data-correct-index=\"1\""));
    assert!(html.contains(&format!("href=\"#{}\"", p.slides[1].id)));
    assert!(html.contains("data:image/png;base64,"));
}

#[test]
fn test_demo_pdf_pages_and_links() {
    let (p, resolver) = demo();
    let mut surface = StaticSurface::new(resolver);
    surface.set_visible(true);
    let deck = surface.snapshot(&p).unwrap();

    let mut seen = Vec::new();
    let mut progress = |s: &SlideProgress| seen.push((s.completed, s.total));
    let options = PdfOptions {
        settle_delay: Duration::ZERO,
        ..PdfOptions::default()
    };
    let (bytes, report) =
        build_pdf(&p, &deck, &mut SolidCapturer, &options, Some(&mut progress)).unwrap();

    assert_eq!(report.pages, 2);
    assert!(report.failures.is_empty());
    assert_eq!(seen, vec![(1, 2), (2, 2)]);

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_demo_link_regions_are_slide_relative() {
    let (p, resolver) = demo();
    let mut surface = StaticSurface::new(resolver);
    surface.set_visible(true);
    let deck = surface.snapshot(&p).unwrap();

    let links = pdf::extract_links(&deck.slides[0], &p);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].rect, Rect::new(20.0, 400.0, 120.0, 50.0));
    assert_eq!(links[0].target, pdf::LinkTarget::Page(1));
}
