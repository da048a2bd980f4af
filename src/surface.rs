// ABOUTME: Render-surface contract, scoped export sessions and the built-in static renderer
// ABOUTME: Produces positioned render trees for every slide of a presentation

use crate::assets::AssetResolver;
use crate::dom::{ElementNode, Node, Rect};
use crate::errors::{DeckError, Result};
use crate::model::{
    Background, Chart, ChartType, Element, ElementKind, Presentation, ShapeType, Slide,
};
use crate::resources::ResourceFile;
use log::{info, warn};
use std::collections::HashMap;
use std::fmt::Write;
use std::thread;
use std::time::Duration;

/// Base rules for nodes produced by [`StaticSurface`]
pub const SURFACE_CSS: &str = r#"
.slide { position: relative; overflow: hidden; font-family: system-ui, -apple-system, sans-serif; }
.element { position: absolute; box-sizing: border-box; overflow: hidden; }
.element-text .text-content { width: 100%; height: 100%; padding: 4px; white-space: pre-wrap; }
.element-image img { width: 100%; height: 100%; object-fit: contain; display: block; }
.element-table table { width: 100%; height: 100%; border-collapse: collapse; }
.element-table td { border: 1px solid currentColor; padding: 2px 4px; }
.element-quizz { padding: 8px; display: flex; flex-direction: column; gap: 6px; }
.quiz-question { font-weight: 600; }
.quiz-options { display: flex; flex-direction: column; gap: 4px; }
.quiz-option { padding: 4px 8px; border: 1px solid #888; border-radius: 4px; background: #fff; cursor: pointer; text-align: left; }
.button-link { display: flex; width: 100%; height: 100%; align-items: center; justify-content: center; color: inherit; text-decoration: none; }
.element-chart svg { width: 100%; height: 100%; display: block; }
"#;

/// Where a stylesheet rule set comes from
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSource {
    Inline(String),
    Linked(ResourceFile),
}

impl StyleSource {
    /// Text of the rules, when they can be introspected
    pub fn css_text(&self) -> Result<String> {
        match self {
            StyleSource::Inline(css) => Ok(css.clone()),
            StyleSource::Linked(resource) => resource.content(),
        }
    }
}

/// Concatenate every readable stylesheet; unreadable ones are skipped with a warning
pub fn collect_styles(sources: &[StyleSource]) -> String {
    let mut rules = Vec::with_capacity(sources.len());
    for source in sources {
        match source.css_text() {
            Ok(css) => rules.push(css),
            Err(e) => {
                let name = match source {
                    StyleSource::Linked(r) => r.path.as_str(),
                    StyleSource::Inline(_) => "<inline>",
                };
                warn!("Could not access stylesheet {}: {}", name, e);
            }
        }
    }
    rules.join("\n")
}

/// One slide as rendered by the surface
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSlide {
    pub slide_id: String,
    pub width: f64,
    pub height: f64,
    pub root: ElementNode,
}

/// Everything the surface exposes for one export
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedDeck {
    pub slides: Vec<RenderedSlide>,
    pub stylesheets: Vec<StyleSource>,
}

impl RenderedDeck {
    pub fn slide(&self, slide_id: &str) -> Option<&RenderedSlide> {
        self.slides.iter().find(|s| s.slide_id == slide_id)
    }
}

/// The live visual representation of slides, owned by the editor
pub trait RenderSurface {
    fn is_mounted(&self) -> bool;
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
    /// Render trees for the slides of `presentation`, keyed by slide identifier
    fn snapshot(&self, presentation: &Presentation) -> Result<RenderedDeck>;
}

/// Scoped hold on a render surface for the duration of one export.
///
/// The surface is made visible on `begin` and its previous visibility is
/// restored when the session ends, on every exit path.
pub struct ExportSession<'a> {
    surface: &'a mut dyn RenderSurface,
    prior_visible: bool,
    ended: bool,
}

impl<'a> ExportSession<'a> {
    pub fn begin(surface: &'a mut dyn RenderSurface, settle_delay: Duration) -> Result<Self> {
        if !surface.is_mounted() {
            return Err(DeckError::RenderError(
                "export slides container not found; make sure the render surface is mounted"
                    .to_string(),
            ));
        }

        let prior_visible = surface.is_visible();
        surface.set_visible(true);
        let session = Self {
            surface,
            prior_visible,
            ended: false,
        };

        if !settle_delay.is_zero() {
            info!("Waiting {} ms for the render surface to settle", settle_delay.as_millis());
            thread::sleep(settle_delay);
        }
        Ok(session)
    }

    /// Snapshot the rendered slides; an empty render is fatal for the export
    pub fn snapshot(&self, presentation: &Presentation) -> Result<RenderedDeck> {
        let deck = self.surface.snapshot(presentation)?;
        if deck.slides.is_empty() {
            return Err(DeckError::RenderError(
                "no slides found in export container".to_string(),
            ));
        }
        Ok(deck)
    }

    pub fn prior_visibility(&self) -> bool {
        self.prior_visible
    }

    /// End the session, returning the visibility that was restored
    pub fn end(mut self) -> bool {
        self.restore();
        self.prior_visible
    }

    fn restore(&mut self) {
        if !self.ended {
            self.surface.set_visible(self.prior_visible);
            self.ended = true;
        }
    }
}

impl Drop for ExportSession<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Built-in render surface that lays out the document model directly.
///
/// Slides are stacked vertically in one detached container, separated by
/// `slide_gap` pixels, so every layout rectangle lives in a shared space.
pub struct StaticSurface {
    resolver: AssetResolver,
    stylesheets: Vec<StyleSource>,
    slide_gap: f64,
    mounted: bool,
    visible: bool,
}

impl StaticSurface {
    pub fn new(resolver: AssetResolver) -> Self {
        Self {
            resolver,
            stylesheets: vec![StyleSource::Inline(SURFACE_CSS.to_string())],
            slide_gap: 40.0,
            mounted: true,
            visible: false,
        }
    }

    pub fn with_stylesheet(mut self, source: StyleSource) -> Self {
        self.stylesheets.push(source);
        self
    }

    pub fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }

    /// Render one slide with its top-left corner at `origin_y` in the container
    pub fn render_slide(
        &self,
        slide: &Slide,
        origin_y: f64,
        images: &mut HashMap<String, String>,
    ) -> RenderedSlide {
        let mut style = format!(
            "position:relative;width:{}px;height:{}px;overflow:hidden;",
            slide.width, slide.height
        );
        match &slide.background {
            Background::Color(color) => {
                let _ = write!(style, "background-color:{};", color);
            }
            Background::Image(reference) => {
                let src = self.resolve_cached(reference, images);
                let _ = write!(
                    style,
                    "background-image:url('{}');background-size:cover;background-position:center;",
                    src
                );
            }
        }

        let mut root = ElementNode::new("div")
            .attr("class", "slide")
            .attr("data-slide-id", slide.id.as_str())
            .attr("style", style)
            .with_layout(Rect::new(0.0, origin_y, slide.width, slide.height));

        for element in slide.paint_order() {
            let node = self.render_element(element, origin_y, images);
            root.children.push(Node::Element(node));
        }

        RenderedSlide {
            slide_id: slide.id.clone(),
            width: slide.width,
            height: slide.height,
            root,
        }
    }

    fn resolve_cached(&self, reference: &str, images: &mut HashMap<String, String>) -> String {
        images
            .entry(reference.to_string())
            .or_insert_with(|| self.resolver.resolve(reference))
            .clone()
    }

    fn render_element(
        &self,
        el: &Element,
        origin_y: f64,
        images: &mut HashMap<String, String>,
    ) -> ElementNode {
        let type_name = el.type_name();
        let bounds = Rect::new(el.x, el.y, el.width, el.height)
            .rotated_bounds(el.rotation)
            .translate(0.0, origin_y);

        let mut node = ElementNode::new("div")
            .attr("class", format!("element element-{}", type_name))
            .attr("data-element-id", el.id.as_str())
            .attr("data-element-type", type_name)
            .attr("style", envelope_style(el))
            .with_layout(bounds);

        match &el.kind {
            ElementKind::Text { text } => {
                let mut content = ElementNode::new("div").attr("class", "text-content");
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        content.children.push(ElementNode::new("br").into());
                    }
                    content.children.push(Node::text(line));
                }
                node.children.push(content.into());
            }
            ElementKind::Image(image) => {
                let src = self.resolve_cached(&image.asset_id, images);
                node.children.push(
                    ElementNode::new("img")
                        .attr("src", src)
                        .attr("alt", "")
                        .attr("draggable", "false")
                        .into(),
                );
            }
            ElementKind::Table { table } => {
                let mut body = ElementNode::new("tbody");
                for row in table {
                    let mut tr = ElementNode::new("tr");
                    for cell in row {
                        tr.children.push(ElementNode::new("td").text_child(cell.as_str()).into());
                    }
                    body.children.push(tr.into());
                }
                node.children
                    .push(ElementNode::new("table").attr("class", "table-content").child(body).into());
            }
            ElementKind::Quiz(quiz) => {
                node.children.push(
                    ElementNode::new("p")
                        .attr("class", "quiz-question")
                        .text_child(quiz.question.as_str())
                        .into(),
                );
                let mut options = ElementNode::new("div").attr("class", "quiz-options");
                for (i, option) in quiz.options.iter().enumerate() {
                    options.children.push(
                        ElementNode::new("button")
                            .attr("type", "button")
                            .attr("class", "quiz-option")
                            .attr("onclick", format!("selectQuizOption(this, {})", i))
                            .text_child(option.as_str())
                            .into(),
                    );
                }
                node.children.push(options.into());
            }
            ElementKind::Shape(shape) => {
                if let Some(extra) = shape_style(shape.shape_type) {
                    let style = format!("{}{}", node.get_attr("style").unwrap_or_default(), extra);
                    node.set_attr("style", style);
                }
                node.add_class(&format!("shape-{}", shape_name(shape.shape_type)));
            }
            ElementKind::Button(button) => {
                let label = button.label.clone().unwrap_or_else(|| "\u{2192}".to_string());
                node.children.push(
                    ElementNode::new("a")
                        .attr("class", "button-link")
                        .attr("href", format!("#{}", button.slide_id))
                        .text_child(label)
                        .with_layout(bounds)
                        .into(),
                );
            }
            ElementKind::Chart(chart) => {
                node.children.push(render_chart(chart, el.width, el.height).into());
            }
        }
        node
    }
}

impl RenderSurface for StaticSurface {
    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn snapshot(&self, presentation: &Presentation) -> Result<RenderedDeck> {
        if !self.mounted {
            return Err(DeckError::RenderError("render surface is not mounted".to_string()));
        }
        if !self.visible {
            return Err(DeckError::RenderError(
                "render surface is hidden and cannot be queried".to_string(),
            ));
        }

        let mut images = HashMap::new();
        let mut origin_y = 0.0;
        let mut slides = Vec::with_capacity(presentation.slides.len());
        for slide in &presentation.slides {
            slides.push(self.render_slide(slide, origin_y, &mut images));
            origin_y += slide.height + self.slide_gap;
        }

        Ok(RenderedDeck {
            slides,
            stylesheets: self.stylesheets.clone(),
        })
    }
}

fn envelope_style(el: &Element) -> String {
    let mut style = format!(
        "left:{}px;top:{}px;width:{}px;height:{}px;z-index:{};background-color:{};border:{}px {} {};border-radius:{}px;opacity:{};",
        el.x,
        el.y,
        el.width,
        el.height,
        el.z_index.round() as i64,
        el.fill_color,
        el.border_thickness,
        el.border_style.as_css(),
        el.border_color,
        el.border_radius,
        el.opacity
    );
    if el.rotation != 0.0 {
        let _ = write!(style, "transform:rotate({}deg);", el.rotation);
    }
    style
}

fn shape_name(shape: ShapeType) -> &'static str {
    match shape {
        ShapeType::Rectangle => "rectangle",
        ShapeType::Circle => "circle",
        ShapeType::Triangle => "triangle",
        ShapeType::Star => "star",
        ShapeType::Bubble => "bubble",
        ShapeType::Heart => "heart",
        ShapeType::Arrow => "arrow",
    }
}

fn shape_style(shape: ShapeType) -> Option<&'static str> {
    match shape {
        ShapeType::Rectangle => None,
        ShapeType::Circle => Some("border-radius:50%;"),
        ShapeType::Triangle => Some("clip-path:polygon(50% 0%,100% 100%,0% 100%);"),
        ShapeType::Star => Some(
            "clip-path:polygon(50% 0%,61% 35%,98% 35%,68% 57%,79% 91%,50% 70%,21% 91%,32% 57%,2% 35%,39% 35%);",
        ),
        ShapeType::Bubble => {
            Some("clip-path:polygon(0% 0%,100% 0%,100% 75%,45% 75%,25% 100%,25% 75%,0% 75%);")
        }
        ShapeType::Heart => Some(
            "clip-path:polygon(50% 100%,10% 60%,0% 35%,5% 12%,25% 2%,50% 18%,75% 2%,95% 12%,100% 35%,90% 60%);",
        ),
        ShapeType::Arrow => {
            Some("clip-path:polygon(0% 30%,60% 30%,60% 0%,100% 50%,60% 100%,60% 70%,0% 70%);")
        }
    }
}

fn render_chart(chart: &Chart, width: f64, height: f64) -> ElementNode {
    let mut svg = ElementNode::new("svg")
        .attr("xmlns", "http://www.w3.org/2000/svg")
        .attr("viewBox", format!("0 0 {} {}", width, height))
        .attr("preserveAspectRatio", "none")
        .attr("class", format!("chart chart-{:?}", chart.chart_type).to_lowercase());

    let max = chart
        .data
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max);
    let points = chart.data.iter().map(|s| s.values.len()).max().unwrap_or(0);
    if points == 0 || max <= 0.0 {
        return svg;
    }

    match chart.chart_type {
        ChartType::Bar => {
            let group = width / points as f64;
            let bar = group / (chart.data.len() as f64 + 1.0);
            for (si, series) in chart.data.iter().enumerate() {
                for (i, value) in series.values.iter().enumerate() {
                    let h = value.max(0.0) / max * height;
                    svg.children.push(
                        ElementNode::new("rect")
                            .attr("x", format!("{:.2}", i as f64 * group + bar * (si as f64 + 0.5)))
                            .attr("y", format!("{:.2}", height - h))
                            .attr("width", format!("{:.2}", bar))
                            .attr("height", format!("{:.2}", h))
                            .attr("fill", series.color.as_str())
                            .into(),
                    );
                }
            }
        }
        ChartType::Line => {
            let step = if points > 1 { width / (points - 1) as f64 } else { 0.0 };
            for series in &chart.data {
                let coords: Vec<String> = series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("{:.2},{:.2}", i as f64 * step, height - v / max * height))
                    .collect();
                svg.children.push(
                    ElementNode::new("polyline")
                        .attr("points", coords.join(" "))
                        .attr("fill", "none")
                        .attr("stroke", series.color.as_str())
                        .attr("stroke-width", "2")
                        .into(),
                );
            }
        }
        ChartType::Pie => {
            // A pie shows the first series; slice colours come from the series list
            let series = &chart.data[0];
            let total: f64 = series.values.iter().filter(|v| **v > 0.0).sum();
            let (cx, cy) = (width / 2.0, height / 2.0);
            let r = cx.min(cy);
            let mut angle = -std::f64::consts::FRAC_PI_2;
            for (i, value) in series.values.iter().enumerate() {
                if *value <= 0.0 || total <= 0.0 {
                    continue;
                }
                let sweep = value / total * std::f64::consts::TAU;
                let (x1, y1) = (cx + r * angle.cos(), cy + r * angle.sin());
                let end = angle + sweep;
                let (x2, y2) = (cx + r * end.cos(), cy + r * end.sin());
                let large = if sweep > std::f64::consts::PI { 1 } else { 0 };
                let color = chart
                    .data
                    .get(i)
                    .map(|s| s.color.as_str())
                    .unwrap_or(series.color.as_str());
                svg.children.push(
                    ElementNode::new("path")
                        .attr(
                            "d",
                            format!(
                                "M {:.2} {:.2} L {:.2} {:.2} A {:.2} {:.2} 0 {} 1 {:.2} {:.2} Z",
                                cx, cy, x1, y1, r, r, large, x2, y2
                            ),
                        )
                        .attr("fill", color)
                        .into(),
                );
                angle = end;
            }
        }
    }
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ButtonLink, ImageRef, Quiz, Series};

    fn deck() -> Presentation {
        let mut p = Presentation::new("Demo");
        let mut second = Slide::new(800.0, 500.0);
        second.id = "s2".to_string();
        p.slides.push(second);

        let button = Element::new(ElementKind::Button(ButtonLink {
            slide_id: "s2".to_string(),
            label: Some("Next".to_string()),
        }))
        .at(10.0, 20.0, 100.0, 40.0);
        let quiz = Element::new(ElementKind::Quiz(Quiz::default())).at(200.0, 20.0, 300.0, 200.0);
        p.slides[1].elements.push(button);
        p.slides[1].elements.push(quiz);
        p
    }

    #[test]
    fn snapshot_requires_visibility() {
        let surface = StaticSurface::new(AssetResolver::new());
        assert!(matches!(
            surface.snapshot(&deck()),
            Err(DeckError::RenderError(_))
        ));
    }

    #[test]
    fn slides_are_stacked_with_element_stamps() {
        let mut surface = StaticSurface::new(AssetResolver::new());
        surface.set_visible(true);
        let rendered = surface.snapshot(&deck()).unwrap();

        assert_eq!(rendered.slides.len(), 2);
        let second = &rendered.slides[1];
        assert_eq!(second.root.layout, Some(Rect::new(0.0, 540.0, 800.0, 500.0)));
        assert_eq!(second.root.get_attr("data-slide-id"), Some("s2"));

        let link = second.root.find(|n| n.tag == "a").unwrap();
        assert_eq!(link.get_attr("href"), Some("#s2"));
        assert_eq!(link.layout, Some(Rect::new(10.0, 560.0, 100.0, 40.0)));

        let quiz = second
            .root
            .find(|n| n.get_attr("data-element-type") == Some("quizz"))
            .unwrap();
        assert_eq!(quiz.find_all(|n| n.has_class("quiz-option")).len(), 3);
    }

    #[test]
    fn unresolved_images_keep_their_reference() {
        let mut p = Presentation::new("img");
        p.slides[0].elements.push(Element::new(ElementKind::Image(ImageRef {
            asset_id: "missing-asset".to_string(),
        })));
        let mut surface = StaticSurface::new(AssetResolver::new());
        surface.set_visible(true);

        let rendered = surface.snapshot(&p).unwrap();
        let img = rendered.slides[0].root.find(|n| n.tag == "img").unwrap();
        assert_eq!(img.get_attr("src"), Some("missing-asset"));
    }

    #[test]
    fn fractional_z_index_becomes_integer_css() {
        let mut el = Element::new(ElementKind::Text { text: "t".into() });
        el.z_index = 2.6;
        let style = envelope_style(&el);
        assert!(style.contains("z-index:3;"));
    }

    #[test]
    fn session_restores_visibility_on_drop() {
        let mut surface = StaticSurface::new(AssetResolver::new());
        {
            let session = ExportSession::begin(&mut surface, Duration::ZERO).unwrap();
            assert!(!session.prior_visibility());
            assert!(session.snapshot(&deck()).is_ok());
        }
        assert!(!surface.is_visible());
    }

    #[test]
    fn session_rejects_unmounted_surface() {
        let mut surface = StaticSurface::new(AssetResolver::new());
        surface.set_mounted(false);
        assert!(matches!(
            ExportSession::begin(&mut surface, Duration::ZERO),
            Err(DeckError::RenderError(_))
        ));
        assert!(!surface.is_visible());
    }

    #[test]
    fn bar_chart_renders_one_rect_per_value() {
        let chart = Chart {
            chart_type: ChartType::Bar,
            data: vec![
                Series { label: "a".into(), values: vec![1.0, 2.0, 3.0], color: "#f00".into() },
                Series { label: "b".into(), values: vec![4.0, 5.0, 6.0], color: "#0f0".into() },
            ],
        };
        let svg = render_chart(&chart, 300.0, 200.0);
        assert_eq!(svg.find_all(|n| n.tag == "rect").len(), 6);
    }
}
