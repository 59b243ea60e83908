//! Style and geometry model of the in-memory document.
//!
//! Deliberately tiny: inline `style` declarations for `display`, `visibility`,
//! `width` and `height`; text is 8px per character on a 16px line; element
//! children stack vertically. Rendering follows the composed (flat) tree, so a
//! shadow host renders its shadow root and a `<slot>` renders the host's light
//! children.

use super::document::Document;
use super::{BoundingBox, ComputedStyle, Display, DomView, NodeId, NodeKind, Visibility};

const CHAR_WIDTH: f32 = 8.0;
const LINE_HEIGHT: f32 = 16.0;

const HIDDEN_TAGS: &[&str] = &[
    "head", "script", "style", "template", "meta", "link", "title",
];
const INLINE_TAGS: &[&str] = &[
    "span", "a", "b", "i", "em", "strong", "label", "code", "small",
];

/// Declared `(property, value)` pairs of an inline style attribute
pub(crate) fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            (!property.is_empty() && !value.is_empty()).then_some((property, value))
        })
        .collect()
}

fn declared(doc: &Document, node: NodeId, property: &str) -> Option<String> {
    let style = doc.attribute(node, "style")?;
    parse_inline_style(style)
        .into_iter()
        .rev()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value)
}

fn parse_px(value: &str) -> Option<f32> {
    value
        .strip_suffix("px")
        .unwrap_or(value)
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|px| px.is_finite() && *px >= 0.0)
}

fn own_display(doc: &Document, node: NodeId) -> Display {
    match declared(doc, node, "display").as_deref() {
        Some("none") => Display::None,
        Some("inline" | "inline-block" | "inline-flex") => Display::Inline,
        Some(_) => Display::Block,
        None => match doc.tag_name(node) {
            Some(tag) if HIDDEN_TAGS.contains(&tag) => Display::None,
            Some(tag) if INLINE_TAGS.contains(&tag) => Display::Inline,
            _ => Display::Block,
        },
    }
}

/// Where a node sits in the rendered (flat) tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlatParent {
    /// Rendered under this element or the document
    Node(NodeId),
    /// The document itself
    Root,
    /// Not part of the rendered tree
    Unrendered,
}

/// Shadow root whose tree contains `node`, if any
fn containing_shadow_root(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = doc.parent(node);
    while let Some(id) = current {
        if matches!(doc.kind(id), Some(NodeKind::ShadowRoot(_))) {
            return Some(id);
        }
        current = doc.parent(id);
    }
    None
}

/// First `<slot>` of a shadow tree, not descending into nested shadow roots
fn first_slot(doc: &Document, shadow_root: NodeId) -> Option<NodeId> {
    let mut stack: Vec<NodeId> = doc.children(shadow_root).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if doc.tag_name(id) == Some("slot") {
            return Some(id);
        }
        stack.extend(doc.children(id).iter().rev().copied());
    }
    None
}

/// Host whose light children a slot element renders
fn slot_host(doc: &Document, slot: NodeId) -> Option<NodeId> {
    if doc.tag_name(slot) != Some("slot") {
        return None;
    }
    let root = containing_shadow_root(doc, slot)?;
    let host = doc.host(root)?;
    (first_slot(doc, root) == Some(slot)).then_some(host)
}

fn flat_parent(doc: &Document, node: NodeId) -> FlatParent {
    if node == doc.document() {
        return FlatParent::Root;
    }
    let Some(parent) = doc.parent(node) else {
        return FlatParent::Unrendered;
    };
    match doc.kind(parent) {
        Some(NodeKind::Document) => FlatParent::Node(parent),
        Some(NodeKind::ShadowRoot(_)) => doc
            .host(parent)
            .map_or(FlatParent::Unrendered, FlatParent::Node),
        Some(NodeKind::Element) => {
            if let Some(shadow_root) = doc.shadow_root(parent) {
                return first_slot(doc, shadow_root)
                    .map_or(FlatParent::Unrendered, FlatParent::Node);
            }
            if let Some(host) = slot_host(doc, parent) {
                if !doc.children(host).is_empty() {
                    return FlatParent::Unrendered;
                }
            }
            FlatParent::Node(parent)
        }
        Some(NodeKind::Text) | None => FlatParent::Unrendered,
    }
}

fn flat_children(doc: &Document, node: NodeId) -> Vec<NodeId> {
    if let Some(shadow_root) = doc.shadow_root(node) {
        return doc.children(shadow_root).to_vec();
    }
    if let Some(host) = slot_host(doc, node) {
        let assigned = doc.children(host);
        if !assigned.is_empty() {
            return assigned.to_vec();
        }
    }
    doc.children(node).to_vec()
}

pub(crate) fn computed_style(doc: &Document, node: NodeId) -> ComputedStyle {
    if !doc.is_element(node) {
        return ComputedStyle::default();
    }
    let display = own_display(doc, node);
    let visibility = match declared(doc, node, "visibility").as_deref() {
        Some("hidden") => Visibility::Hidden,
        Some("collapse") => Visibility::Collapse,
        Some("visible") => Visibility::Visible,
        _ => match flat_parent(doc, node) {
            FlatParent::Node(parent) if doc.is_element(parent) => {
                computed_style(doc, parent).visibility
            }
            _ => Visibility::Visible,
        },
    };
    ComputedStyle {
        display,
        visibility,
    }
}

/// Size of `node` in the rendered tree, `None` when it generates no box
fn box_size(doc: &Document, node: NodeId) -> Option<(f32, f32)> {
    match doc.kind(node)? {
        NodeKind::Text => {
            let chars = super::normalize_whitespace(&doc.text_content(node))
                .chars()
                .count();
            if chars == 0 {
                Some((0.0, 0.0))
            } else {
                Some((chars as f32 * CHAR_WIDTH, LINE_HEIGHT))
            }
        }
        NodeKind::Element => {
            if own_display(doc, node) == Display::None {
                return None;
            }
            let (mut width, mut height) = (0.0_f32, 0.0_f32);
            for child in flat_children(doc, node) {
                if let Some((w, h)) = box_size(doc, child) {
                    width = width.max(w);
                    height += h;
                }
            }
            if let Some(w) = declared(doc, node, "width").as_deref().and_then(parse_px) {
                width = w;
            }
            if let Some(h) = declared(doc, node, "height").as_deref().and_then(parse_px) {
                height = h;
            }
            Some((width, height))
        }
        NodeKind::Document | NodeKind::ShadowRoot(_) => None,
    }
}

pub(crate) fn bounding_box(doc: &Document, node: NodeId) -> Option<BoundingBox> {
    let (width, height) = box_size(doc, node)?;
    let mut chain = vec![node];
    loop {
        let current = chain[chain.len() - 1];
        match flat_parent(doc, current) {
            FlatParent::Node(parent) if parent == doc.document() => break,
            FlatParent::Node(parent) => {
                if doc.is_element(parent) && own_display(doc, parent) == Display::None {
                    return None;
                }
                chain.push(parent);
            }
            FlatParent::Root => break,
            FlatParent::Unrendered => return None,
        }
    }
    // Walk from the outermost box inwards, stacking preceding siblings.
    let mut y = 0.0_f32;
    let mut previous = doc.document();
    for &id in chain.iter().rev() {
        for sibling in flat_children_of_parent(doc, previous) {
            if sibling == id {
                break;
            }
            if let Some((_, h)) = box_size(doc, sibling) {
                y += h;
            }
        }
        previous = id;
    }
    Some(BoundingBox::new(0.0, y, width, height))
}

fn flat_children_of_parent(doc: &Document, parent: NodeId) -> Vec<NodeId> {
    if parent == doc.document() {
        doc.children(parent).to_vec()
    } else {
        flat_children(doc, parent)
    }
}
