//! Declarative document fixtures (YAML or JSON).
//!
//! ```yaml
//! body:
//!   - tag: section
//!     children:
//!       - tag: div
//!         attrs: { id: host }
//!         shadow:
//!           mode: open
//!           children:
//!             - tag: span
//!               attrs: { data-testid: foo }
//!               text: Hello from root1
//! ```

use super::{Document, NodeId, ShadowRootMode};
use crate::result::PierceResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A node of a fixture: plain strings are text nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// Text node
    Text(String),
    /// Element node
    Element(ElementSpec),
}

/// An element of a fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Tag name
    pub tag: String,
    /// Attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// Shorthand for the `style` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Text inserted before `children`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Light children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
    /// Attached shadow root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowSpec>,
}

/// A shadow root of a fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowSpec {
    /// Encapsulation mode
    #[serde(default)]
    pub mode: ShadowRootMode,
    /// Shadow children
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

/// A whole document fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFixture {
    /// Children of `<head>`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub head: Vec<NodeSpec>,
    /// Children of `<body>`
    #[serde(default)]
    pub body: Vec<NodeSpec>,
}

impl DocumentFixture {
    /// Parse a YAML fixture
    pub fn from_yaml_str(source: &str) -> PierceResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Parse a JSON fixture
    pub fn from_json_str(source: &str) -> PierceResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a fixture file; `.json` is JSON, anything else YAML
    pub fn load(path: impl AsRef<Path>) -> PierceResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_yaml_str(&source)
        }
    }

    /// Build a fresh document from this fixture
    pub fn build(&self) -> PierceResult<Document> {
        let mut doc = Document::new();
        let head = doc.head();
        let body = doc.body();
        for spec in &self.head {
            append_spec(&mut doc, head, spec)?;
        }
        for spec in &self.body {
            append_spec(&mut doc, body, spec)?;
        }
        Ok(doc)
    }
}

fn append_spec(doc: &mut Document, parent: NodeId, spec: &NodeSpec) -> PierceResult<NodeId> {
    match spec {
        NodeSpec::Text(text) => {
            let node = doc.create_text(text);
            doc.append_child(parent, node)?;
            Ok(node)
        }
        NodeSpec::Element(element) => {
            let node = doc.create_element(&element.tag);
            for (name, value) in &element.attrs {
                doc.set_attribute(node, name, value)?;
            }
            if let Some(style) = &element.style {
                doc.set_attribute(node, "style", style)?;
            }
            doc.append_child(parent, node)?;
            if let Some(text) = &element.text {
                let text_node = doc.create_text(text);
                doc.append_child(node, text_node)?;
            }
            for child in &element.children {
                append_spec(doc, node, child)?;
            }
            if let Some(shadow) = &element.shadow {
                let root = doc.attach_shadow(node, shadow.mode)?;
                for child in &shadow.children {
                    append_spec(doc, root, child)?;
                }
            }
            Ok(node)
        }
    }
}
