// ABOUTME: Document model for presentations, slides and their typed elements
// ABOUTME: Serde mapping mirrors the editor's JSON shape so archives stay compatible

use crate::errors::{DeckError, Result};
use serde::{Deserialize, Serialize};

/// Default slide size used by the editor for fresh slides
pub const DEFAULT_SLIDE_WIDTH: f64 = 800.0;
pub const DEFAULT_SLIDE_HEIGHT: f64 = 500.0;

/// Mint a fresh random identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub id: String,
    pub title: String,
    pub slides: Vec<Slide>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Presentation {
    /// Create a presentation holding a single blank slide
    pub fn new(title: &str) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            title: title.to_string(),
            slides: vec![Slide::new(DEFAULT_SLIDE_WIDTH, DEFAULT_SLIDE_HEIGHT)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the structural invariants every export relies on
    pub fn validate(&self) -> Result<()> {
        if self.slides.is_empty() {
            return Err(DeckError::ValidationError(format!(
                "presentation {} has no slides",
                self.id
            )));
        }
        if self.updated_at < self.created_at {
            return Err(DeckError::ValidationError(format!(
                "presentation {} was updated ({}) before it was created ({})",
                self.id, self.updated_at, self.created_at
            )));
        }
        for slide in &self.slides {
            if !(slide.width > 0.0 && slide.height > 0.0) {
                return Err(DeckError::ValidationError(format!(
                    "slide {} has invalid size {}x{}",
                    slide.id, slide.width, slide.height
                )));
            }
        }
        Ok(())
    }

    pub fn slide_index(&self, slide_id: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.id == slide_id)
    }

    /// Largest slide dimensions in the deck, used to size capture surfaces
    pub fn max_slide_size(&self) -> (f64, f64) {
        self.slides.iter().fold((0.0_f64, 0.0_f64), |(w, h), s| {
            (w.max(s.width), h.max(s.height))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub background: Background,
    pub elements: Vec<Element>,
}

impl Slide {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            id: new_id(),
            width,
            height,
            background: Background::Color("#ffffff".to_string()),
            elements: Vec::new(),
        }
    }

    /// Elements in paint order: lowest z-index first, ties kept in sequence order
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        ordered.sort_by(|a, b| a.z_index.total_cmp(&b.z_index));
        ordered
    }

    pub fn quizzes(&self) -> impl Iterator<Item = (&Element, &Quiz)> {
        self.elements.iter().filter_map(|el| match &el.kind {
            ElementKind::Quiz(quiz) => Some((el, quiz)),
            _ => None,
        })
    }
}

/// Slide background, serialised as `{ "type": "color" | "image", "value": "..." }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Background {
    Color(String),
    Image(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
}

impl BorderStyle {
    pub fn as_css(&self) -> &'static str {
        match self {
            BorderStyle::Solid => "solid",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Dashed => "dashed",
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_fill_color() -> String {
    "#ccccff".to_string()
}

fn default_border_color() -> String {
    "#8888ff".to_string()
}

/// A typed visual unit on a slide: common geometric/style envelope plus payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    /// Any JSON number; fractional values order between their neighbours
    #[serde(default)]
    pub z_index: f64,
    #[serde(default = "default_fill_color")]
    pub fill_color: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default)]
    pub border_thickness: f64,
    #[serde(default)]
    pub border_radius: f64,
    #[serde(default)]
    pub border_style: BorderStyle,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Create an element with the editor's default envelope
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: new_id(),
            x: 0.0,
            y: 0.0,
            width: 250.0,
            height: 250.0,
            rotation: 0.0,
            z_index: 0.0,
            fill_color: default_fill_color(),
            border_color: default_border_color(),
            border_thickness: 2.0,
            border_radius: 0.0,
            border_style: BorderStyle::Solid,
            opacity: 1.0,
            kind,
        }
    }

    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ElementKind::Text { .. } => "text",
            ElementKind::Image(_) => "image",
            ElementKind::Table { .. } => "table",
            ElementKind::Quiz(_) => "quizz",
            ElementKind::Shape(_) => "shape",
            ElementKind::Button(_) => "button",
            ElementKind::Chart(_) => "chart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text {
        text: String,
    },
    Image(ImageRef),
    Table {
        table: Vec<Vec<String>>,
    },
    #[serde(rename = "quizz", alias = "quiz")]
    Quiz(Quiz),
    Shape(Shape),
    Button(ButtonLink),
    Chart(Chart),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub asset_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
}

impl Default for Quiz {
    fn default() -> Self {
        Self {
            question: "Quelle est la couleur du cheval blanc de Henri IV ?".to_string(),
            options: vec!["Blanc".to_string(), "Gris".to_string(), "Noir".to_string()],
            correct_answer_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    Circle,
    Triangle,
    Star,
    Bubble,
    Heart,
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub shape_type: ShapeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonLink {
    pub slide_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub chart_type: ChartType,
    pub data: Vec<Series>,
}

/// One chart series; field names are kept from the editor's archive format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    #[serde(rename = "valeurs")]
    pub values: Vec<f64>,
    #[serde(rename = "couleur")]
    pub color: String,
}
