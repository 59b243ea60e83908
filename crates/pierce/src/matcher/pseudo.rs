//! Pseudo-class predicates that do not depend on selector recursion.

use super::traversal::element_siblings;
use crate::dom::{normalize_whitespace, DomView, NodeId, Visibility};
use crate::selector::Nth;

/// `:visible`: painted and rendered with a non-empty box
#[must_use]
pub fn is_visible(dom: &dyn DomView, node: NodeId) -> bool {
    if !dom.is_element(node) || dom.computed_style(node).visibility != Visibility::Visible {
        return false;
    }
    dom.bounding_box(node).is_some_and(|bbox| !bbox.is_empty())
}

/// `:has-text(needle)`: case-insensitive substring of normalized text
#[must_use]
pub fn has_text(dom: &dyn DomView, node: NodeId, needle: &str) -> bool {
    normalize_whitespace(&dom.text_content(node))
        .to_lowercase()
        .contains(&normalize_whitespace(needle).to_lowercase())
}

/// `:empty`: no element children and no text
#[must_use]
pub fn is_empty(dom: &dyn DomView, node: NodeId) -> bool {
    dom.element_children(node).is_empty() && dom.text_content(node).is_empty()
}

/// 1-based position among element siblings, and the sibling count
fn sibling_position(dom: &dyn DomView, node: NodeId) -> (usize, usize) {
    let siblings = element_siblings(dom, node);
    let position = siblings
        .iter()
        .position(|&sibling| sibling == node)
        .map_or(0, |i| i + 1);
    (position, siblings.len())
}

/// `:first-child`
#[must_use]
pub fn is_first_child(dom: &dyn DomView, node: NodeId) -> bool {
    sibling_position(dom, node).0 == 1
}

/// `:last-child`
#[must_use]
pub fn is_last_child(dom: &dyn DomView, node: NodeId) -> bool {
    let (position, count) = sibling_position(dom, node);
    position != 0 && position == count
}

/// `:only-child`
#[must_use]
pub fn is_only_child(dom: &dyn DomView, node: NodeId) -> bool {
    sibling_position(dom, node) == (1, 1)
}

/// `:nth-child(an+b)`
#[must_use]
pub fn is_nth_child(dom: &dyn DomView, node: NodeId, nth: Nth) -> bool {
    let (position, _) = sibling_position(dom, node);
    i64::try_from(position).is_ok_and(|position| position > 0 && nth.matches(position))
}
