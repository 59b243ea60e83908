//! Shadow-including tree walks.
//!
//! Pierce order is a depth-first preorder in which an open shadow root's
//! subtree is visited right after its host and before the host's light
//! children. Closed shadow roots are never entered; light mode never enters
//! any shadow root.

use crate::dom::{DomView, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a clause walks the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Descend into open shadow roots
    #[default]
    Pierce,
    /// Stay in the light tree of the scope
    Light,
}

impl TraversalMode {
    /// Mode for a clause's light flag
    #[must_use]
    pub const fn from_light(light: bool) -> Self {
        if light {
            Self::Light
        } else {
            Self::Pierce
        }
    }
}

/// Child nodes visited after `node`: open shadow content first when piercing
fn traversal_children(dom: &dyn DomView, node: NodeId, mode: TraversalMode) -> Vec<NodeId> {
    let mut next = Vec::new();
    if mode == TraversalMode::Pierce {
        if let Some(root) = dom.open_shadow_root(node) {
            next.extend_from_slice(dom.children(root));
        }
    }
    next.extend_from_slice(dom.children(node));
    next
}

/// Element descendants of `root` in traversal order, `root` excluded
#[must_use]
pub fn descendants(dom: &dyn DomView, root: NodeId, mode: TraversalMode) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = traversal_children(dom, root, mode);
    stack.reverse();
    while let Some(node) = stack.pop() {
        if !dom.is_element(node) {
            continue;
        }
        out.push(node);
        let mut next = traversal_children(dom, node, mode);
        next.reverse();
        stack.extend(next);
    }
    out
}

/// Element parent used by ancestor combinators.
///
/// Crossing from a shadow root to its host only happens when piercing; light
/// mode stops at the shadow boundary.
#[must_use]
pub fn element_parent(dom: &dyn DomView, node: NodeId, mode: TraversalMode) -> Option<NodeId> {
    let parent = dom.parent(node)?;
    match dom.kind(parent)? {
        NodeKind::Element => Some(parent),
        NodeKind::ShadowRoot(_) if mode == TraversalMode::Pierce => dom.host(parent),
        NodeKind::ShadowRoot(_) | NodeKind::Document | NodeKind::Text => None,
    }
}

/// Element children of the node's parent (which may be a shadow root)
#[must_use]
pub fn element_siblings(dom: &dyn DomView, node: NodeId) -> Vec<NodeId> {
    dom.parent(node)
        .map_or_else(|| vec![node], |parent| dom.element_children(parent))
}

/// Composed document order of every element, closed shadow trees included
#[derive(Debug, Clone, Default)]
pub struct DocumentOrder {
    positions: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    /// Index the whole document
    #[must_use]
    pub fn new(dom: &dyn DomView) -> Self {
        let mut positions = HashMap::new();
        let mut stack = vec![dom.document()];
        while let Some(node) = stack.pop() {
            positions.insert(node, positions.len());
            let mut next = Vec::new();
            if let Some(root) = dom.shadow_root(node) {
                next.push(root);
            }
            next.extend_from_slice(dom.children(node));
            next.reverse();
            stack.extend(next);
        }
        Self { positions }
    }

    /// Position of a node, `None` when detached
    #[must_use]
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.positions.get(&node).copied()
    }

    /// Sort into document order and drop duplicates; detached nodes go last
    pub fn sort_dedup(&self, nodes: &mut Vec<NodeId>) {
        nodes.sort_by_key(|node| (self.position(*node).unwrap_or(usize::MAX), *node));
        nodes.dedup();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dom::{Document, ShadowRootMode};

    /// body > host(#host) [shadow: a, b > c] + light child d, and e after host
    fn shadow_doc() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let host = doc.append_element(body, "div", &[("id", "host")]).unwrap();
        let root = doc.attach_shadow(host, ShadowRootMode::Open).unwrap();
        let a = doc.append_element(root, "span", &[("id", "a")]).unwrap();
        let b = doc.append_element(root, "div", &[("id", "b")]).unwrap();
        let c = doc.append_element(b, "span", &[("id", "c")]).unwrap();
        let d = doc.append_element(host, "p", &[("id", "d")]).unwrap();
        let e = doc.append_element(body, "p", &[("id", "e")]).unwrap();
        (doc, vec![host, a, b, c, d, e])
    }

    #[test]
    fn test_pierce_visits_shadow_before_light_children() {
        let (doc, ids) = shadow_doc();
        assert_eq!(descendants(&doc, doc.body(), TraversalMode::Pierce), ids);
    }

    #[test]
    fn test_light_skips_shadow_trees() {
        let (doc, ids) = shadow_doc();
        let light = descendants(&doc, doc.body(), TraversalMode::Light);
        assert_eq!(light, vec![ids[0], ids[4], ids[5]]);
    }

    #[test]
    fn test_closed_shadow_root_is_never_entered() {
        let mut doc = Document::new();
        let body = doc.body();
        let host = doc.append_element(body, "div", &[]).unwrap();
        let root = doc.attach_shadow(host, ShadowRootMode::Closed).unwrap();
        doc.append_element(root, "span", &[]).unwrap();
        assert_eq!(descendants(&doc, body, TraversalMode::Pierce), vec![host]);
    }

    #[test]
    fn test_element_parent_across_shadow_boundary() {
        let (doc, ids) = shadow_doc();
        let (host, a) = (ids[0], ids[1]);
        assert_eq!(element_parent(&doc, a, TraversalMode::Pierce), Some(host));
        assert_eq!(element_parent(&doc, a, TraversalMode::Light), None);
        assert_eq!(element_parent(&doc, ids[3], TraversalMode::Light), Some(ids[2]));
    }

    #[test]
    fn test_document_order_sorts_and_dedups() {
        let (doc, ids) = shadow_doc();
        let order = DocumentOrder::new(&doc);
        let mut nodes = vec![ids[5], ids[3], ids[1], ids[3], ids[0]];
        order.sort_dedup(&mut nodes);
        assert_eq!(nodes, vec![ids[0], ids[1], ids[3], ids[5]]);
        assert!(order.position(ids[4]).unwrap() > order.position(ids[3]).unwrap());
    }

    #[test]
    fn test_traversal_is_repeatable() {
        let (doc, _) = shadow_doc();
        let first = descendants(&doc, doc.document(), TraversalMode::Pierce);
        let second = descendants(&doc, doc.document(), TraversalMode::Pierce);
        assert_eq!(first, second);
    }
}
