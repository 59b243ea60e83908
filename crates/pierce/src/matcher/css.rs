//! Right-to-left matching of parsed css selector lists.

use super::pseudo;
use super::traversal::{descendants, element_parent, element_siblings, TraversalMode};
use crate::dom::{DomView, NodeId};
use crate::selector::{
    Combinator, ComplexPart, ComplexSelector, CompoundSelector, IndexPseudo, PseudoClass,
    SelectorList,
};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;

/// Evaluates css selectors inside one clause scope.
///
/// A matcher lives for a single evaluation pass over a single scope, so the
/// `:index` unions it memoizes can never go stale.
pub struct CssMatcher<'a> {
    dom: &'a dyn DomView,
    scope: NodeId,
    mode: TraversalMode,
    candidates: OnceCell<Vec<NodeId>>,
    index_targets: RefCell<HashMap<usize, Option<NodeId>>>,
}

impl<'a> CssMatcher<'a> {
    /// Matcher for the descendants of `scope`
    #[must_use]
    pub fn new(dom: &'a dyn DomView, scope: NodeId, mode: TraversalMode) -> Self {
        Self {
            dom,
            scope,
            mode,
            candidates: OnceCell::new(),
            index_targets: RefCell::new(HashMap::new()),
        }
    }

    /// Elements searched, in traversal order
    pub fn candidates(&self) -> &[NodeId] {
        self.candidates
            .get_or_init(|| descendants(self.dom, self.scope, self.mode))
    }

    /// Every candidate matching `list`, in traversal order
    #[must_use]
    pub fn query(&self, list: &SelectorList) -> Vec<NodeId> {
        self.candidates()
            .iter()
            .copied()
            .filter(|&node| self.matches_list(node, list))
            .collect()
    }

    /// Whether `node` matches any selector of `list`
    #[must_use]
    pub fn matches_list(&self, node: NodeId, list: &SelectorList) -> bool {
        list.selectors
            .iter()
            .any(|selector| self.matches_complex(node, selector))
    }

    fn matches_complex(&self, node: NodeId, selector: &ComplexSelector) -> bool {
        match selector.parts.len() {
            0 => false,
            len => self.matches_from(node, &selector.parts, len - 1),
        }
    }

    fn matches_from(&self, node: NodeId, parts: &[ComplexPart], index: usize) -> bool {
        let part = &parts[index];
        if !self.matches_compound(node, &part.compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match part.combinator {
            None => true,
            Some(Combinator::Child) => self
                .parent(node)
                .is_some_and(|parent| self.matches_from(parent, parts, index - 1)),
            Some(Combinator::Descendant) => {
                let mut ancestor = self.parent(node);
                while let Some(current) = ancestor {
                    if self.matches_from(current, parts, index - 1) {
                        return true;
                    }
                    ancestor = self.parent(current);
                }
                false
            }
            Some(Combinator::NextSibling) => self
                .previous_siblings(node)
                .last()
                .is_some_and(|&sibling| self.matches_from(sibling, parts, index - 1)),
            Some(Combinator::SubsequentSibling) => self
                .previous_siblings(node)
                .iter()
                .any(|&sibling| self.matches_from(sibling, parts, index - 1)),
        }
    }

    /// Ancestor step for combinators; the scope itself is never matched
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        element_parent(self.dom, node, self.mode).filter(|&parent| parent != self.scope)
    }

    fn previous_siblings(&self, node: NodeId) -> Vec<NodeId> {
        let siblings = element_siblings(self.dom, node);
        let end = siblings
            .iter()
            .position(|&sibling| sibling == node)
            .unwrap_or(0);
        siblings[..end]
            .iter()
            .copied()
            .filter(|&sibling| sibling != self.scope)
            .collect()
    }

    fn matches_compound(&self, node: NodeId, compound: &CompoundSelector) -> bool {
        let dom = self.dom;
        if let Some(tag) = &compound.tag {
            if dom.tag_name(node) != Some(tag.as_str()) {
                return false;
            }
        }
        if !compound
            .ids
            .iter()
            .all(|id| dom.attribute(node, "id") == Some(id.as_str()))
        {
            return false;
        }
        if !compound.classes.is_empty() {
            let class_attr = dom.attribute(node, "class").unwrap_or_default();
            if !compound
                .classes
                .iter()
                .all(|class| class_attr.split_whitespace().any(|c| c == class))
            {
                return false;
            }
        }
        if !compound.attributes.iter().all(|attribute| {
            dom.attribute(node, &attribute.name)
                .is_some_and(|value| attribute.matcher.matches(value))
        }) {
            return false;
        }
        compound
            .pseudo_classes
            .iter()
            .all(|pseudo| self.matches_pseudo(node, pseudo))
    }

    fn matches_pseudo(&self, node: NodeId, pseudo: &PseudoClass) -> bool {
        let dom = self.dom;
        match pseudo {
            PseudoClass::Visible => pseudo::is_visible(dom, node),
            PseudoClass::Index(index) => self.index_target(index) == Some(node),
            PseudoClass::Not(list) => !self.matches_list(node, list),
            PseudoClass::Is(list) => self.matches_list(node, list),
            PseudoClass::HasText(text) => pseudo::has_text(dom, node, text),
            PseudoClass::FirstChild => pseudo::is_first_child(dom, node),
            PseudoClass::LastChild => pseudo::is_last_child(dom, node),
            PseudoClass::OnlyChild => pseudo::is_only_child(dom, node),
            PseudoClass::NthChild(nth) => pseudo::is_nth_child(dom, node, *nth),
            PseudoClass::Empty => pseudo::is_empty(dom, node),
        }
    }

    /// The `n`-th element of the union of the `:index` sub-selectors,
    /// computed once per matcher
    fn index_target(&self, index: &IndexPseudo) -> Option<NodeId> {
        let key = std::ptr::from_ref(index) as usize;
        let cached = self.index_targets.borrow().get(&key).copied();
        if let Some(target) = cached {
            return target;
        }
        let target = self
            .candidates()
            .iter()
            .copied()
            .filter(|&candidate| {
                index
                    .selectors
                    .iter()
                    .any(|selector| self.matches_complex(candidate, selector))
            })
            .nth(index.n - 1);
        self.index_targets.borrow_mut().insert(key, target);
        target
    }
}
