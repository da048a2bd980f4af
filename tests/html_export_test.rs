use deck_export::model::{ButtonLink, Quiz};
use deck_export::{
    export_html, AssetResolver, DeckError, Element, ElementKind, HtmlOptions, Presentation,
    RenderSurface, Slide, StaticSurface,
};
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Three slides: A links to C, B holds a quiz whose right answer is "Paris"
fn linked_deck() -> Presentation {
    let mut p = Presentation::new("Viewer");
    p.slides = vec![
        Slide::new(800.0, 500.0),
        Slide::new(800.0, 500.0),
        Slide::new(800.0, 500.0),
    ];
    for (slide, id) in p.slides.iter_mut().zip(["slide-a", "slide-b", "slide-c"]) {
        slide.id = id.to_string();
    }
    p.slides[0].elements.push(
        Element::new(ElementKind::Button(ButtonLink {
            slide_id: "slide-c".to_string(),
            label: Some("Jump".to_string()),
        }))
        .at(10.0, 10.0, 120.0, 40.0),
    );
    p.slides[1].elements.push(
        Element::new(ElementKind::Quiz(Quiz {
            question: "Capital of France?".to_string(),
            options: vec!["Lyon".to_string(), "Paris".to_string(), "Nice".to_string()],
            correct_answer_index: 1,
        }))
        .at(50.0, 50.0, 400.0, 300.0),
    );
    p
}

fn export(dir: &Path) -> std::path::PathBuf {
    let mut surface = StaticSurface::new(AssetResolver::new());
    let options = HtmlOptions {
        output_dir: dir.to_path_buf(),
        settle_delay: Duration::ZERO,
    };
    export_html(&linked_deck(), &mut surface, &options).expect("Export failed")
}

#[test]
fn test_document_is_self_contained() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = export(dir.path());
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("Viewer.html"));

    let html = fs::read_to_string(&path).expect("Failed to read export");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(html.matches("class=\"slide-container").count(), 3);
    assert_eq!(html.matches("slide-container active").count(), 1);
    assert!(html.contains("data-slide-id=\"slide-a\""));
    assert!(html.contains("href=\"#slide-c\""));
    assert!(html.contains("<span class=\"slide-counter\">1 / 3</span>"));
    assert!(!html.contains("<link"));
    assert!(!html.contains("<script src"));

    let first = html.find("data-slide-id=\"slide-a\"").expect("slide A missing");
    let second = html.find("data-slide-id=\"slide-b\"").expect("slide B missing");
    let third = html.find("data-slide-id=\"slide-c\"").expect("slide C missing");
    assert!(first < second && second < third);
}

#[test]
fn test_quiz_is_rehydrated_without_handlers() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let html = fs::read_to_string(export(dir.path())).expect("Failed to read export");

    assert_eq!(html.matches("data-quiz=\"true\"").count(), 1);
    assert!(html.contains("data-correct-index=\"1\""));
    assert!(html.contains("data-quiz-state=\"unanswered\""));
    assert_eq!(html.matches("data-option-index=").count(), 3);
    assert!(html.contains("class=\"quiz-submit\""));
    assert!(html.contains("class=\"quiz-reset\""));
    assert!(html.contains("class=\"quiz-feedback\""));
    assert!(!html.contains("onclick="));
}

#[test]
fn test_hidden_surface_is_restored_after_export() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut surface = StaticSurface::new(AssetResolver::new());
    let options = HtmlOptions {
        output_dir: dir.path().to_path_buf(),
        settle_delay: Duration::ZERO,
    };

    export_html(&linked_deck(), &mut surface, &options).expect("Export failed");
    assert!(!surface.is_visible());
}

#[test]
fn test_empty_presentation_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut p = linked_deck();
    p.slides.clear();
    let mut surface = StaticSurface::new(AssetResolver::new());
    let options = HtmlOptions {
        output_dir: dir.path().to_path_buf(),
        settle_delay: Duration::ZERO,
    };

    let result = export_html(&p, &mut surface, &options);
    assert!(matches!(result, Err(DeckError::ValidationError(_))));
    assert!(fs::read_dir(dir.path()).expect("Failed to list dir").next().is_none());
}

fn open_in_browser(path: &Path) -> (Browser, Arc<Tab>) {
    let options = LaunchOptionsBuilder::default()
        .headless(true)
        .sandbox(false)
        .build()
        .expect("Failed to build launch options");
    let browser = Browser::new(options).expect("Failed to launch browser");
    let tab = browser.new_tab().expect("Failed to open tab");
    let url = url::Url::from_file_path(path).expect("Invalid file path");
    tab.navigate_to(url.as_str()).expect("Failed to navigate");
    tab.wait_until_navigated().expect("Navigation did not finish");
    (browser, tab)
}

fn eval(tab: &Tab, js: &str) -> serde_json::Value {
    tab.evaluate(js, false)
        .expect("Script failed")
        .value
        .unwrap_or(serde_json::Value::Null)
}

#[test]
#[ignore = "requires a local Chrome installation"]
fn test_back_returns_to_previous_slide() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (_browser, tab) = open_in_browser(&export(dir.path()));

    assert_eq!(eval(&tab, "deck.currentId()"), "slide-a");
    assert_eq!(eval(&tab, "document.querySelector('[data-deck-action=\"back\"]').disabled"), true);
    assert_eq!(eval(&tab, "deck.showSlide('slide-b'); deck.back(); deck.currentId()"), "slide-a");

    eval(&tab, "document.querySelector('a[href=\"#slide-c\"]').click()");
    assert_eq!(eval(&tab, "deck.currentId()"), "slide-c");
    assert_eq!(eval(&tab, "window.location.hash"), "#slide-c");
    assert_eq!(eval(&tab, "document.querySelector('.slide-counter').textContent"), "3 / 3");
    assert_eq!(eval(&tab, "document.querySelector('[data-deck-action=\"next\"]').disabled"), true);
    assert_eq!(eval(&tab, "deck.back(); deck.currentId()"), "slide-a");
    assert_eq!(eval(&tab, "deck.back()"), false);
}

#[test]
#[ignore = "requires a local Chrome installation"]
fn test_quiz_flow_in_browser() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (_browser, tab) = open_in_browser(&export(dir.path()));
    eval(&tab, "deck.showSlide('slide-b')");

    let quiz = "document.querySelector('[data-quiz]')";
    assert_eq!(
        eval(&tab, &format!("{}.querySelector('.quiz-submit').disabled", quiz)),
        true
    );

    eval(&tab, &format!("{}.querySelectorAll('.quiz-option')[0].click()", quiz));
    eval(&tab, &format!("{}.querySelector('.quiz-submit').click()", quiz));
    assert_eq!(eval(&tab, &format!("{}.getAttribute('data-quiz-state')", quiz)), "submitted");
    assert_eq!(
        eval(&tab, &format!("{}.querySelector('.quiz-feedback').textContent", quiz)),
        "Incorrect. The correct answer was: Paris"
    );
    assert_eq!(
        eval(&tab, &format!("{}.querySelectorAll('.quiz-option.correct').length", quiz)),
        1
    );

    // Locked until reset
    eval(&tab, &format!("{}.querySelectorAll('.quiz-option')[1].click()", quiz));
    assert_eq!(eval(&tab, "deck.quizzes[0].state().selected"), 0);

    eval(&tab, &format!("{}.querySelector('.quiz-reset').click()", quiz));
    assert_eq!(eval(&tab, &format!("{}.getAttribute('data-quiz-state')", quiz)), "unanswered");
    assert_eq!(
        eval(&tab, &format!("{}.querySelectorAll('.quiz-option.selected').length", quiz)),
        0
    );
    assert_eq!(
        eval(&tab, &format!("{}.querySelector('.quiz-feedback').hidden", quiz)),
        true
    );

    eval(&tab, &format!("{}.querySelectorAll('.quiz-option')[1].click()", quiz));
    eval(&tab, &format!("{}.querySelector('.quiz-submit').click()", quiz));
    assert_eq!(
        eval(&tab, &format!("{}.querySelector('.quiz-feedback').textContent", quiz)),
        "Correct!"
    );
}
