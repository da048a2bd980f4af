// ABOUTME: Render-tree snapshot used by the exporters in place of a live DOM
// ABOUTME: Element nodes carry attributes, children and an optional layout rectangle

use std::fmt::Write;

/// Axis-aligned rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Bounding box of this rectangle rotated by `degrees` around its centre
    pub fn rotated_bounds(&self, degrees: f64) -> Self {
        if degrees % 360.0 == 0.0 {
            return *self;
        }
        let radians = degrees.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
        let width = self.width * cos + self.height * sin;
        let height = self.width * sin + self.height * cos;
        let cx = self.x + self.width / 2.0;
        let cy = self.y + self.height / 2.0;
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(ElementNode),
    Text(String),
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }
}

impl From<ElementNode> for Node {
    fn from(el: ElementNode) -> Self {
        Node::Element(el)
    }
}

/// Elements that never have children or a closing tag
const VOID_TAGS: &[&str] = &["area", "br", "col", "hr", "img", "input", "link", "meta"];

/// Elements whose text content is emitted verbatim
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub layout: Option<Rect>,
}

impl ElementNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
            layout: None,
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn text_child(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn with_layout(mut self, rect: Rect) -> Self {
        self.layout = Some(rect);
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.get_attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Pre-order walk over this node and all descendant elements
    pub fn descendants(&self) -> Vec<&ElementNode> {
        let mut out = Vec::new();
        collect_elements(self, &mut out);
        out
    }

    pub fn find_all<'a>(&'a self, pred: impl Fn(&ElementNode) -> bool) -> Vec<&'a ElementNode> {
        self.descendants().into_iter().filter(|n| pred(*n)).collect()
    }

    pub fn find<'a>(&'a self, pred: impl Fn(&ElementNode) -> bool) -> Option<&'a ElementNode> {
        self.descendants().into_iter().find(|n| pred(*n))
    }

    /// Child-index path to the first descendant matching `pred`
    pub fn find_path(&self, pred: &dyn Fn(&ElementNode) -> bool) -> Option<Vec<usize>> {
        if pred(self) {
            return Some(Vec::new());
        }
        for (i, child) in self.children.iter().enumerate() {
            if let Node::Element(el) = child {
                if let Some(mut path) = el.find_path(pred) {
                    path.insert(0, i);
                    return Some(path);
                }
            }
        }
        None
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&ElementNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.children.get(*head)?.as_element()?.at_path(rest),
        }
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut ElementNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => match self.children.get_mut(*head)? {
                Node::Element(el) => el.at_path_mut(rest),
                Node::Text(_) => None,
            },
        }
    }

    /// Serialise this subtree to HTML text
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn collect_text(el: &ElementNode, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

fn collect_elements<'a>(el: &'a ElementNode, out: &mut Vec<&'a ElementNode>) {
    out.push(el);
    for child in &el.children {
        if let Node::Element(e) = child {
            collect_elements(e, out);
        }
    }
}

fn write_element(el: &ElementNode, out: &mut String) {
    let tag = el.tag.to_ascii_lowercase();
    out.push('<');
    out.push_str(&tag);
    for (name, value) in &el.attrs {
        // Writing into a String cannot fail
        let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
    }
    out.push('>');

    if VOID_TAGS.contains(&tag.as_str()) {
        return;
    }

    let raw = RAW_TEXT_TAGS.contains(&tag.as_str());
    for child in &el.children {
        match child {
            Node::Text(t) if raw => out.push_str(t),
            Node::Text(t) => out.push_str(&escape_text(t)),
            Node::Element(e) => write_element(e, out),
        }
    }
    let _ = write!(out, "</{}>", tag);
}

/// Escape text for use between tags
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for use inside a double-quoted attribute
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
