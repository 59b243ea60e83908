//! Host document interface.
//!
//! The selector engine only ever *reads* a document. Everything it needs from
//! the host runtime (tree shape, attributes, shadow attachment, style and
//! geometry) goes through [`DomView`]. [`Document`] is the in-memory host used
//! by the CLI and the test-suite; [`SharedDocument`] wraps it for concurrent
//! mutation between poll ticks.

mod document;
mod fixture;
mod layout;
mod shared;

pub use document::Document;
pub use fixture::{DocumentFixture, ElementSpec, NodeSpec, ShadowSpec};
pub use shared::SharedDocument;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a node of a host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shadow root encapsulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowRootMode {
    /// Reachable from outside; pierced by default traversal
    #[default]
    Open,
    /// Never entered by any traversal
    Closed,
}

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The document node
    Document,
    /// An element
    Element,
    /// A text node
    Text,
    /// A shadow root attached to a host element
    ShadowRoot(ShadowRootMode),
}

/// Computed `display`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    /// Generates a box
    #[default]
    Block,
    /// Generates an inline box
    Inline,
    /// Generates no box for itself or its descendants
    None,
}

/// Computed `visibility`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Painted
    #[default]
    Visible,
    /// Not painted, still takes space
    Hidden,
    /// Like hidden
    Collapse,
}

/// Computed style subset consumed by `:visible`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComputedStyle {
    /// Computed display
    pub display: Display,
    /// Computed (inherited) visibility
    pub visibility: Visibility,
}

/// Rendered box of an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rendered area
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether the box has zero width or zero height
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Center point as `(x, y)`
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Read access to a live, composed document tree.
///
/// Implementations must answer every query for ids they handed out; unknown
/// ids behave like detached, childless nodes.
pub trait DomView {
    /// The document node
    fn document(&self) -> NodeId;

    /// Kind of `node`, `None` for unknown ids
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Light-tree parent (a shadow root's children report the shadow root)
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Light-tree children in order
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Shadow root attached to `host`, regardless of mode
    fn shadow_root(&self, host: NodeId) -> Option<NodeId>;

    /// Host of a shadow root
    fn host(&self, shadow_root: NodeId) -> Option<NodeId>;

    /// Lower-case tag name for elements
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Attribute value
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Concatenated text of all descendant text nodes (light tree)
    fn text_content(&self, node: NodeId) -> String;

    /// Computed style
    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    /// Rendered box, `None` when the element generates no box
    fn bounding_box(&self, node: NodeId) -> Option<BoundingBox>;

    /// Whether `node` is an element
    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    /// Element children in order
    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    /// Open shadow root attached to `host`
    fn open_shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.shadow_root(host)
            .filter(|&root| self.kind(root) == Some(NodeKind::ShadowRoot(ShadowRootMode::Open)))
    }
}

/// Collapse runs of whitespace and trim, the way text engines compare text
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod bounding_box_tests {
        use super::*;

        #[test]
        fn test_bounding_box_center() {
            let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
            let (x, y) = bbox.center();
            assert!((x - 50.0).abs() < f32::EPSILON);
            assert!((y - 25.0).abs() < f32::EPSILON);
        }

        #[test]
        fn test_bounding_box_empty() {
            assert!(BoundingBox::new(0.0, 0.0, 0.0, 16.0).is_empty());
            assert!(BoundingBox::new(0.0, 0.0, 16.0, 0.0).is_empty());
            assert!(!BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_empty());
        }

        #[test]
        fn test_bounding_box_area() {
            let bbox = BoundingBox::new(10.0, 20.0, 4.0, 5.0);
            assert!((bbox.area() - 20.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Hello \n  from\troot2 "), "Hello from root2");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "#7");
        assert_eq!(NodeId(7).index(), 7);
    }
}
