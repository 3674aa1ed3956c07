//! Owned node snapshots returned by [`DocumentHandle::query`](crate::DocumentHandle::query).
//!
//! Parsed trees are not `Send`, so handles hand out detached copies. A
//! [`NodePath`] (element-child indices from `<html>`) lets a handle find the
//! same element again when the caller clicks it.

use std::collections::BTreeMap;

use certscrape_shared::{CertScrapeError, Result};
use scraper::{ElementRef, Html, Selector};

use crate::visibility;

/// Structural address of an element: child indices from the root element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Compute the path of `el` within its tree.
    pub fn of(el: ElementRef<'_>) -> Self {
        let mut indices = Vec::new();
        let mut current = el;

        while let Some(parent) = current.parent().and_then(ElementRef::wrap) {
            let idx = parent
                .children()
                .filter_map(ElementRef::wrap)
                .position(|child| child.id() == current.id())
                .unwrap_or(0);
            indices.push(idx);
            current = parent;
        }

        indices.reverse();
        Self(indices)
    }

    /// Find the element at this path in `doc`.
    pub fn resolve<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        let mut current = doc.root_element();
        for &idx in &self.0 {
            current = current.children().filter_map(ElementRef::wrap).nth(idx)?;
        }
        Some(current)
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &NodePath) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

/// A detached copy of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
    visible: bool,
    path: NodePath,
}

impl Node {
    /// Snapshot an element.
    pub fn from_element(el: ElementRef<'_>) -> Self {
        Self {
            tag: el.value().name().to_string(),
            text: normalize_text(&el.text().collect::<String>()),
            attributes: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            visible: visibility::is_visible(el),
            path: NodePath::of(el),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whitespace-normalized text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a CSS selector, mapping failures into the crate error.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| CertScrapeError::parse(format!("invalid selector {selector:?}: {e:?}")))
}

/// Run `selector` over `markup` and snapshot every match in document order.
pub fn query_markup(markup: &str, selector: &str) -> Result<Vec<Node>> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(markup);
    Ok(doc.select(&sel).map(Node::from_element).collect())
}

/// The `href` of the element at `path`, if it exists and has one.
pub fn href_at(markup: &str, path: &NodePath) -> Option<String> {
    let doc = Html::parse_document(markup);
    path.resolve(&doc)
        .and_then(|el| el.value().attr("href"))
        .map(String::from)
}
