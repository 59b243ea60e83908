//! In-memory host document.

use super::layout;
use super::{BoundingBox, ComputedStyle, DomView, NodeId, NodeKind, ShadowRootMode};
use crate::result::{PierceError, PierceResult};

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: Option<String>,
    attributes: Vec<(String, String)>,
    text: String,
    shadow_root: Option<NodeId>,
    host: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            tag: None,
            attributes: Vec::new(),
            text: String::new(),
            shadow_root: None,
            host: None,
        }
    }
}

/// Arena-backed document tree with shadow roots, attributes and a toy layout.
///
/// A fresh document already contains `<html><head></head><body></body></html>`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    head: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty HTML document
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            head: NodeId(0),
            body: NodeId(0),
        };
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(NodeId(0), html, None);
        doc.link(html, head, None);
        doc.link(html, body, None);
        doc.head = head;
        doc.body = body;
        doc
    }

    /// The `<body>` element
    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// The `<head>` element
    #[must_use]
    pub const fn head(&self) -> NodeId {
        self.head
    }

    /// Number of nodes ever created (detached ones included)
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena only holds the document node
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = Some(tag.to_ascii_lowercase());
        self.push(data)
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.text = text.to_string();
        self.push(data)
    }

    /// Create an element with attributes and append it to `parent`
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> PierceResult<NodeId> {
        let element = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(element, name, value)?;
        }
        self.append_child(parent, element)?;
        Ok(element)
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> PierceResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> PierceResult<()> {
        let parent_kind = self.kind_of(parent)?;
        if matches!(parent_kind, NodeKind::Text) {
            return Err(PierceError::invalid_operation(format!(
                "text node {parent} cannot have children"
            )));
        }
        match self.kind_of(child)? {
            NodeKind::Document | NodeKind::ShadowRoot(_) => {
                return Err(PierceError::invalid_operation(format!(
                    "node {child} cannot be inserted into a tree"
                )));
            }
            NodeKind::Element | NodeKind::Text => {}
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(PierceError::invalid_operation(format!(
                "inserting {child} into {parent} would create a cycle"
            )));
        }
        if let Some(reference) = reference {
            if self.nodes[reference.0].parent != Some(parent) || reference == child {
                return Err(PierceError::invalid_operation(format!(
                    "{reference} is not a child of {parent}"
                )));
            }
        }
        self.unlink(child);
        self.link(parent, child, reference);
        Ok(())
    }

    /// Detach `node` from its parent; the subtree stays intact
    pub fn remove(&mut self, node: NodeId) -> PierceResult<()> {
        match self.kind_of(node)? {
            NodeKind::Element | NodeKind::Text => {
                self.unlink(node);
                Ok(())
            }
            NodeKind::Document | NodeKind::ShadowRoot(_) => Err(
                PierceError::invalid_operation(format!("node {node} cannot be removed")),
            ),
        }
    }

    /// Set (or replace) an attribute
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> PierceResult<()> {
        self.expect_element(node)?;
        let name = name.to_ascii_lowercase();
        let attributes = &mut self.nodes[node.0].attributes;
        match attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    /// Remove an attribute if present
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> PierceResult<()> {
        self.expect_element(node)?;
        let name = name.to_ascii_lowercase();
        self.nodes[node.0].attributes.retain(|(key, _)| *key != name);
        Ok(())
    }

    /// Attribute names and values in insertion order
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        self.nodes
            .get(node.0)
            .map_or(&[][..], |data| data.attributes.as_slice())
    }

    /// Replace all children with a single text node (like `textContent = ...`)
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> PierceResult<()> {
        match self.kind_of(node)? {
            NodeKind::Text => {
                self.nodes[node.0].text = text.to_string();
                Ok(())
            }
            NodeKind::Element | NodeKind::ShadowRoot(_) => {
                for child in std::mem::take(&mut self.nodes[node.0].children) {
                    self.nodes[child.0].parent = None;
                }
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    self.link(node, text_node, None);
                }
                Ok(())
            }
            NodeKind::Document => Err(PierceError::invalid_operation(
                "cannot set text content of the document",
            )),
        }
    }

    /// Attach a shadow root to `host`
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> PierceResult<NodeId> {
        self.expect_element(host)?;
        if self.nodes[host.0].shadow_root.is_some() {
            return Err(PierceError::invalid_operation(format!(
                "element {host} already hosts a shadow root"
            )));
        }
        let mut data = NodeData::new(NodeKind::ShadowRoot(mode));
        data.host = Some(host);
        let root = self.push(data);
        self.nodes[host.0].shadow_root = Some(root);
        Ok(root)
    }

    /// Whether `node` is connected to the document through composed parents
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(data) = self.nodes.get(id.0) else {
                return false;
            };
            if data.kind == NodeKind::Document {
                return true;
            }
            current = data.parent.or(data.host);
        }
        false
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn kind_of(&self, node: NodeId) -> PierceResult<NodeKind> {
        self.nodes
            .get(node.0)
            .map(|data| data.kind)
            .ok_or_else(|| PierceError::invalid_operation(format!("unknown node {node}")))
    }

    fn expect_element(&self, node: NodeId) -> PierceResult<()> {
        match self.kind_of(node)? {
            NodeKind::Element => Ok(()),
            _ => Err(PierceError::invalid_operation(format!(
                "node {node} is not an element"
            ))),
        }
    }

    /// Whether `ancestor` is `node` or one of its composed ancestors
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            let data = &self.nodes[id.0];
            current = data.parent.or(data.host);
        }
        false
    }

    fn unlink(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|&id| id != child);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let children = &mut self.nodes[parent.0].children;
        let position = reference
            .and_then(|reference| children.iter().position(|&id| id == reference))
            .unwrap_or(children.len());
        children.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
    }
}

impl DomView for Document {
    fn document(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node.0).map(|data| data.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|data| data.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map_or(&[][..], |data| data.children.as_slice())
    }

    fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.nodes.get(host.0).and_then(|data| data.shadow_root)
    }

    fn host(&self, shadow_root: NodeId) -> Option<NodeId> {
        self.nodes.get(shadow_root.0).and_then(|data| data.host)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|data| data.tag.as_deref())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(node.0).and_then(|data| {
            data.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        })
    }

    fn text_content(&self, node: NodeId) -> String {
        let Some(data) = self.nodes.get(node.0) else {
            return String::new();
        };
        if data.kind == NodeKind::Text {
            return data.text.clone();
        }
        let mut text = String::new();
        let mut stack: Vec<NodeId> = data.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let child = &self.nodes[id.0];
            if child.kind == NodeKind::Text {
                text.push_str(&child.text);
            } else {
                stack.extend(child.children.iter().rev().copied());
            }
        }
        text
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        layout::computed_style(self, node)
    }

    fn bounding_box(&self, node: NodeId) -> Option<BoundingBox> {
        layout::bounding_box(self, node)
    }
}
