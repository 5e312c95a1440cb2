//! View Trees
//!
//! A page section is described by a [`ViewNode`] tree built by a pure render
//! function from backend data. Nothing here depends on previously rendered
//! state, so the same input always produces the same tree.

mod render;

pub use render::{
    render_ranking, render_report_list, render_theme_toggle, render_user_stats, to_fixed,
    PLACEHOLDER_PHOTO,
};

use std::collections::BTreeMap;
use std::fmt;

/// A node in a rendered view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Element(Element),
    Text(String),
}

/// An element with attributes and children. Attributes are kept sorted so
/// serialisation is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<ViewNode>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Add one or more space-separated classes
    pub fn class(mut self, classes: &str) -> Self {
        let entry = self.attrs.entry("class".to_string()).or_default();
        for class in classes.split_whitespace() {
            if !entry.split_whitespace().any(|c| c == class) {
                if !entry.is_empty() {
                    entry.push(' ');
                }
                entry.push_str(class);
            }
        }
        self
    }

    pub fn child(mut self, child: impl Into<ViewNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ViewNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(ViewNode::Text(text.into()))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .get("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Hidden elements carry `hidden`, like the DOM attribute
    pub fn is_hidden(&self) -> bool {
        self.attrs.contains_key("hidden")
    }
}

impl From<Element> for ViewNode {
    fn from(element: Element) -> Self {
        ViewNode::Element(element)
    }
}

impl From<&str> for ViewNode {
    fn from(text: &str) -> Self {
        ViewNode::Text(text.to_string())
    }
}

impl From<String> for ViewNode {
    fn from(text: String) -> Self {
        ViewNode::Text(text)
    }
}

const BLOCK_TAGS: &[&str] = &[
    "div", "section", "article", "ul", "ol", "li", "p", "h1", "h2", "h3", "h4", "header", "footer",
];

impl ViewNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            ViewNode::Element(e) => Some(e),
            ViewNode::Text(_) => None,
        }
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            ViewNode::Text(t) => out.push_str(t),
            ViewNode::Element(e) => e.children.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// Depth-first search for the first element with `class`
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        let element = self.as_element()?;
        if element.has_class(class) {
            return Some(element);
        }
        element.children.iter().find_map(|c| c.find_by_class(class))
    }

    /// Every element with `class`, in document order
    pub fn find_all_by_class<'a>(&'a self, class: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_by_class(class, &mut found);
        found
    }

    fn collect_by_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if let ViewNode::Element(e) = self {
            if e.has_class(class) {
                found.push(e);
            }
            for child in &e.children {
                child.collect_by_class(class, found);
            }
        }
    }

    /// Serialise to HTML with text and attribute escaping
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            ViewNode::Text(t) => out.push_str(&escape(t)),
            ViewNode::Element(e) => {
                out.push('<');
                out.push_str(&e.tag);
                for (name, value) in &e.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape(value));
                    out.push('"');
                }
                out.push('>');
                for child in &e.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(&e.tag);
                out.push('>');
            }
        }
    }

    /// Plain-text layout for terminals: block elements start new lines,
    /// hidden elements are skipped.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        let mut current = String::new();
        self.write_text(&mut lines, &mut current);
        flush_line(&mut lines, &mut current);
        lines.join("\n")
    }

    fn write_text(&self, lines: &mut Vec<String>, current: &mut String) {
        match self {
            ViewNode::Text(t) => {
                let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
                if t.is_empty() {
                    return;
                }
                if !current.is_empty() && !current.ends_with(' ') {
                    current.push(' ');
                }
                current.push_str(&t);
            }
            ViewNode::Element(e) => {
                if e.is_hidden() {
                    return;
                }
                let block = BLOCK_TAGS.contains(&e.tag.as_str());
                if block {
                    flush_line(lines, current);
                }
                for child in &e.children {
                    child.write_text(lines, current);
                }
                if block {
                    flush_line(lines, current);
                }
            }
        }
    }
}

fn flush_line(lines: &mut Vec<String>, current: &mut String) {
    let line = current.trim();
    if !line.is_empty() {
        lines.push(line.to_string());
    }
    current.clear();
}

impl fmt::Display for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
