// ABOUTME: HTML export of a rendered presentation as one self-contained document
// ABOUTME: Rehydrates quiz widgets and embeds history-based slide navigation

use crate::dom::{escape_text, ElementNode, Node};
use crate::errors::{DeckError, Result};
use crate::model::{Element, Presentation, Quiz, Slide};
use crate::surface::{collect_styles, ExportSession, RenderSurface, RenderedDeck, RenderedSlide};
use crate::utils;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// Options for writing an HTML export
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub output_dir: PathBuf,
    pub settle_delay: Duration,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            settle_delay: Duration::from_millis(500),
        }
    }
}

const DECK_CSS: &str = r#"
html, body { margin: 0; padding: 0; background: #222; }
.deck { display: flex; align-items: center; justify-content: center; min-height: 100vh; }
.slide-container { display: none; position: relative; margin: 0 auto; box-shadow: 0 4px 24px rgba(0,0,0,.4); }
.slide-container.active { display: block; }
.deck-nav { position: fixed; bottom: 16px; right: 16px; display: flex; gap: 8px; }
.deck-nav .slide-counter { align-self: center; color: #fff; font: 14px system-ui, sans-serif; }
.deck-nav button[disabled] { opacity: .4; cursor: default; }
.deck-nav button { padding: 6px 12px; border: none; border-radius: 4px; background: rgba(255,255,255,.85); cursor: pointer; }
"#;

const QUIZ_CSS: &str = r#"
[data-quiz] .quiz-option { cursor: pointer; user-select: none; }
[data-quiz] .quiz-option.selected { border-color: #36a2eb; background: #e6f3fc; }
[data-quiz] .quiz-option.locked { cursor: default; }
[data-quiz] .quiz-option.correct { border-color: #2e7d32; background: #e8f5e9; }
[data-quiz] .quiz-option.incorrect { border-color: #c62828; background: #ffebee; }
.quiz-controls { display: flex; gap: 6px; margin-top: 6px; }
.quiz-controls button { padding: 4px 10px; border-radius: 4px; border: 1px solid #888; cursor: pointer; }
.quiz-controls button[disabled] { opacity: .5; cursor: default; }
.quiz-feedback { margin-top: 4px; font-weight: 600; }
.quiz-feedback.correct { color: #2e7d32; }
.quiz-feedback.incorrect { color: #c62828; }
"#;

/// Viewer runtime: history-stack navigation, fragment sync and quiz state machines
const VIEWER_SCRIPT: &str = r##"
(function () {
  'use strict';
  var slides = Array.prototype.slice.call(document.querySelectorAll('.slide-container'));
  var ids = slides.map(function (s) { return s.getAttribute('data-slide-id'); });
  var visited = [];
  var current = -1;

  function indexOfId(id) { return ids.indexOf(id); }

  var counter = document.querySelector('.slide-counter');
  var backButton = document.querySelector('[data-deck-action="back"]');
  var nextButton = document.querySelector('[data-deck-action="next"]');

  function updateNav() {
    if (counter) { counter.textContent = (current + 1) + ' / ' + slides.length; }
    if (backButton) { backButton.disabled = !visited.length; }
    if (nextButton) { nextButton.disabled = current >= slides.length - 1; }
  }

  function activate(index) {
    slides.forEach(function (s, i) { s.classList.toggle('active', i === index); });
    current = index;
    updateNav();
    var hash = '#' + encodeURIComponent(ids[index]);
    if (window.location.hash !== hash && window.history && window.history.replaceState) {
      window.history.replaceState(null, '', hash);
    }
  }

  function showSlideAt(index) {
    if (index < 0 || index >= slides.length || index === current) { return false; }
    if (current >= 0) { visited.push(current); }
    activate(index);
    return true;
  }

  function showSlide(id) {
    var index = indexOfId(id);
    return index >= 0 ? showSlideAt(index) : false;
  }

  function back() {
    if (!visited.length) { return false; }
    activate(visited.pop());
    return true;
  }

  function next() { return showSlideAt(current + 1); }

  function fragmentId() {
    var hash = window.location.hash;
    return hash.length > 1 ? decodeURIComponent(hash.slice(1)) : '';
  }

  document.addEventListener('click', function (event) {
    var link = event.target.closest ? event.target.closest('a[href^="#"]') : null;
    if (!link) { return; }
    var id = decodeURIComponent(link.getAttribute('href').slice(1));
    if (indexOfId(id) >= 0) {
      event.preventDefault();
      showSlide(id);
    }
  });

  Array.prototype.forEach.call(document.querySelectorAll('[data-deck-action]'), function (button) {
    button.addEventListener('click', function () {
      if (button.getAttribute('data-deck-action') === 'back') { back(); } else { next(); }
    });
  });

  document.addEventListener('keydown', function (event) {
    if (event.target.closest && event.target.closest('[data-quiz], input, textarea')) { return; }
    switch (event.key) {
      case 'ArrowRight': case 'PageDown': case ' ':
        event.preventDefault(); next(); break;
      case 'ArrowLeft': case 'PageUp': case 'Backspace':
        event.preventDefault(); back(); break;
    }
  });

  window.addEventListener('hashchange', function () {
    var id = fragmentId();
    if (id && id !== ids[current]) { showSlide(id); }
  });

  function setupQuiz(quiz) {
    var options = Array.prototype.slice.call(quiz.querySelectorAll('.quiz-option'));
    var submitButton = quiz.querySelector('.quiz-submit');
    var resetButton = quiz.querySelector('.quiz-reset');
    var feedback = quiz.querySelector('.quiz-feedback');
    var correct = parseInt(quiz.getAttribute('data-correct-index'), 10);
    var state = { phase: 'unanswered', selected: -1 };

    function render() {
      var done = state.phase === 'submitted';
      quiz.setAttribute('data-quiz-state', state.phase);
      options.forEach(function (option, i) {
        option.classList.toggle('selected', i === state.selected);
        option.classList.toggle('locked', done);
        option.classList.toggle('correct', done && i === correct);
        option.classList.toggle('incorrect', done && i === state.selected && i !== correct);
        option.setAttribute('aria-disabled', done ? 'true' : 'false');
      });
      submitButton.disabled = state.phase !== 'selected';
      submitButton.hidden = done;
      resetButton.hidden = !done;
      if (done) {
        var right = state.selected === correct;
        var answer = options[correct] ? options[correct].textContent.trim() : '';
        feedback.textContent = right ? 'Correct!' : 'Incorrect. The correct answer was: ' + answer;
        feedback.className = 'quiz-feedback ' + (right ? 'correct' : 'incorrect');
        feedback.hidden = false;
      } else {
        feedback.textContent = '';
        feedback.className = 'quiz-feedback';
        feedback.hidden = true;
      }
    }

    function select(i) {
      if (state.phase === 'submitted' || i < 0 || i >= options.length) { return false; }
      state.selected = i;
      state.phase = 'selected';
      render();
      return true;
    }

    function submit() {
      if (state.phase !== 'selected') { return false; }
      state.phase = 'submitted';
      render();
      return true;
    }

    function reset() {
      state.phase = 'unanswered';
      state.selected = -1;
      render();
      return true;
    }

    options.forEach(function (option, i) {
      option.addEventListener('click', function (event) { event.stopPropagation(); select(i); });
      option.addEventListener('keydown', function (event) {
        if (event.key === 'Enter' || event.key === ' ') { event.preventDefault(); select(i); }
      });
    });
    submitButton.addEventListener('click', function (event) { event.stopPropagation(); submit(); });
    resetButton.addEventListener('click', function (event) { event.stopPropagation(); reset(); });
    render();

    return {
      select: select,
      submit: submit,
      reset: reset,
      state: function () { return { phase: state.phase, selected: state.selected }; }
    };
  }

  var quizzes = Array.prototype.map.call(document.querySelectorAll('[data-quiz]'), setupQuiz);

  var initial = indexOfId(fragmentId());
  activate(initial >= 0 ? initial : 0);

  window.deck = {
    showSlide: showSlide,
    showSlideAt: showSlideAt,
    back: back,
    next: next,
    currentId: function () { return ids[current]; },
    quizzes: quizzes
  };
})();
"##;

/// Assemble the standalone HTML document for a rendered deck.
///
/// Slides follow the presentation's order; slides the surface did not render
/// are skipped with a warning. The first slide starts active.
pub fn render_html_document(
    presentation: &Presentation,
    deck: &RenderedDeck,
    styles: &str,
) -> Result<String> {
    if deck.slides.is_empty() {
        return Err(DeckError::ValidationError("no slides".to_string()));
    }

    let mut containers = Vec::with_capacity(presentation.slides.len());
    for slide in &presentation.slides {
        match deck.slide(&slide.id) {
            Some(rendered) => containers.push(rehydrate_slide(rendered, slide)),
            None => warn!("Slide {} was not rendered, leaving it out of the export", slide.id),
        }
    }
    if containers.is_empty() {
        return Err(DeckError::ValidationError("no slides".to_string()));
    }
    if let Some(first) = containers.first_mut() {
        first.add_class("active");
    }

    let title = if presentation.title.trim().is_empty() {
        "presentation"
    } else {
        presentation.title.as_str()
    };

    let mut html_doc = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html_doc.push_str("<meta charset=\"UTF-8\">\n");
    html_doc.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html_doc.push_str(&format!("<title>{}</title>\n", escape_text(title)));
    html_doc.push_str("<style>");
    html_doc.push_str(DECK_CSS);
    html_doc.push_str(QUIZ_CSS);
    html_doc.push_str(&styles.replace("</style", "<\\/style"));
    html_doc.push_str("</style>\n</head>\n<body>\n<div class=\"deck\">\n");

    for container in &containers {
        html_doc.push_str(&container.to_html());
        html_doc.push('\n');
    }

    html_doc.push_str("</div>\n<nav class=\"deck-nav\">");
    html_doc.push_str("<button type=\"button\" data-deck-action=\"back\">Back</button>");
    html_doc.push_str(&format!(
        "<span class=\"slide-counter\">1 / {}</span>",
        containers.len()
    ));
    html_doc.push_str("<button type=\"button\" data-deck-action=\"next\">Next</button>");
    html_doc.push_str("</nav>\n<script>");
    html_doc.push_str(VIEWER_SCRIPT);
    html_doc.push_str("</script>\n</body>\n</html>\n");

    Ok(html_doc)
}

/// Clone a rendered slide into an isolated container with its quizzes made interactive
pub fn rehydrate_slide(rendered: &RenderedSlide, slide: &Slide) -> ElementNode {
    let mut root = rendered.root.clone();

    for (element, quiz) in slide.quizzes() {
        let Some(path) = locate_quiz(&root, element, quiz) else {
            warn!(
                "Quiz {} on slide {} has no rendered counterpart",
                element.id, slide.id
            );
            continue;
        };
        if let Some(target) = root.at_path_mut(&path) {
            *target = rehydrate_quiz(target, quiz);
        }
    }

    ElementNode::new("div")
        .attr("class", "slide-container")
        .attr("data-slide-id", slide.id.as_str())
        .attr(
            "style",
            format!(
                "width:{}px;height:{}px;overflow:hidden;",
                rendered.width, rendered.height
            ),
        )
        .child(root)
}

/// Find the rendered subtree of a quiz: by element id first, then by question text
fn locate_quiz(root: &ElementNode, element: &Element, quiz: &Quiz) -> Option<Vec<usize>> {
    let by_id = |n: &ElementNode| n.get_attr("data-element-id") == Some(element.id.as_str());
    if let Some(path) = root.find_path(&by_id) {
        return Some(path);
    }

    let question = quiz.question.trim();
    let by_text = |n: &ElementNode| {
        n.get_attr("data-quiz").is_none()
            && n.children.iter().any(|c| {
                c.as_element()
                    .map(|q| q.has_class("quiz-question") && q.text_content().trim() == question)
                    .unwrap_or(false)
            })
    };
    let path = root.find_path(&by_text)?;
    debug!("Matched quiz {} by question text", element.id);
    Some(path)
}

fn is_handler(name: &str) -> bool {
    name.len() > 2 && name[..2].eq_ignore_ascii_case("on")
}

fn is_option_control(node: &ElementNode) -> bool {
    node.has_class("quiz-option")
        || (node.tag.eq_ignore_ascii_case("button")
            && !node.has_class("quiz-submit")
            && !node.has_class("quiz-reset"))
}

fn option_marker(index: usize, label: &str) -> ElementNode {
    ElementNode::new("div")
        .attr("class", "quiz-option")
        .attr("data-option-index", index.to_string())
        .attr("role", "button")
        .attr("tabindex", "0")
        .text_child(label)
}

/// Copy a subtree without event handlers, turning option controls into static markers
fn strip_controls(node: &ElementNode, quiz: &Quiz, next_index: &mut usize) -> ElementNode {
    if is_option_control(node) {
        let index = *next_index;
        *next_index += 1;
        let rendered = node.text_content();
        let label = if rendered.trim().is_empty() {
            quiz.options.get(index).map(String::as_str).unwrap_or_default()
        } else {
            rendered.trim()
        };
        return option_marker(index, label);
    }

    ElementNode {
        tag: node.tag.clone(),
        attrs: node
            .attrs
            .iter()
            .filter(|(name, _)| !is_handler(name))
            .cloned()
            .collect(),
        children: node
            .children
            .iter()
            .map(|child| match child {
                Node::Element(el) => Node::Element(strip_controls(el, quiz, next_index)),
                Node::Text(text) => Node::Text(text.clone()),
            })
            .collect(),
        layout: node.layout,
    }
}

/// Turn a rendered quiz subtree into an inert, self-describing quiz widget
pub fn rehydrate_quiz(node: &ElementNode, quiz: &Quiz) -> ElementNode {
    let mut count = 0;
    let mut out = strip_controls(node, quiz, &mut count);

    if count == 0 {
        let mut options = ElementNode::new("div").attr("class", "quiz-options");
        for (i, label) in quiz.options.iter().enumerate() {
            options.children.push(option_marker(i, label).into());
        }
        out.children.push(options.into());
    } else if count != quiz.options.len() {
        warn!(
            "Rendered quiz has {} options but the model lists {}",
            count,
            quiz.options.len()
        );
    }

    out.set_attr("data-quiz", "true");
    out.set_attr("data-correct-index", quiz.correct_answer_index.to_string());
    out.set_attr("data-quiz-state", "unanswered");

    let controls = ElementNode::new("div")
        .attr("class", "quiz-controls")
        .child(
            ElementNode::new("button")
                .attr("type", "button")
                .attr("class", "quiz-submit")
                .attr("disabled", "")
                .text_child("Submit"),
        )
        .child(
            ElementNode::new("button")
                .attr("type", "button")
                .attr("class", "quiz-reset")
                .attr("hidden", "")
                .text_child("Reset"),
        );
    out.children.push(controls.into());
    out.children.push(
        ElementNode::new("div")
            .attr("class", "quiz-feedback")
            .attr("aria-live", "polite")
            .attr("hidden", "")
            .into(),
    );
    out
}

/// Export a presentation as a single interactive HTML file
pub fn export_html(
    presentation: &Presentation,
    surface: &mut dyn RenderSurface,
    options: &HtmlOptions,
) -> Result<PathBuf> {
    info!("Exporting presentation {} to HTML", presentation.id);
    if presentation.slides.is_empty() {
        return Err(DeckError::ValidationError("no slides".to_string()));
    }

    let session = ExportSession::begin(surface, options.settle_delay)?;
    let deck = session.snapshot(presentation)?;
    let styles = collect_styles(&deck.stylesheets);
    let document = render_html_document(presentation, &deck, &styles)?;
    session.end();

    let path = utils::write_artifact(
        &options.output_dir,
        &presentation.title,
        "html",
        document.as_bytes(),
    )?;
    info!("HTML written to {:?}", path);
    Ok(path)
}
