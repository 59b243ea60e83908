//! Output formatting

use console::{style, Term};
use pierce::prelude::*;
use serde::Serialize;

/// A matched element, as printed by `query` and `wait`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementReport {
    /// Arena index of the node
    pub node: usize,
    /// Lower-case tag name
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Normalized text content
    pub text: String,
    /// Whether the element is rendered with a non-empty box
    pub visible: bool,
    /// Host chain, outermost first, e.g. `div#outer > div.inner-host`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shadow_hosts: Vec<String>,
}

impl ElementReport {
    /// Describe `node` of `doc`
    #[must_use]
    pub fn new(doc: &Document, node: NodeId) -> Self {
        Self {
            node: node.index(),
            tag: doc.tag_name(node).unwrap_or_default().to_string(),
            attributes: doc.attributes(node).to_vec(),
            text: pierce::dom::normalize_whitespace(&doc.text_content(node)),
            visible: pierce::matcher::is_visible(doc, node),
            shadow_hosts: shadow_hosts(doc, node),
        }
    }

    /// One-line rendering: `<span id="target"> "Hello"`
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            line.push_str(&format!(" {name}=\"{value}\""));
        }
        line.push('>');
        if !self.text.is_empty() {
            line.push_str(&format!(" \"{}\"", self.text));
        }
        if !self.shadow_hosts.is_empty() {
            line.push_str(&format!(" (in shadow of {})", self.shadow_hosts.join(" > ")));
        }
        line
    }
}

fn short_name(doc: &Document, node: NodeId) -> String {
    let mut name = doc.tag_name(node).unwrap_or_default().to_string();
    if let Some(id) = doc.attribute(node, "id") {
        name.push('#');
        name.push_str(id);
    } else if let Some(class) = doc.attribute(node, "class") {
        for part in class.split_whitespace() {
            name.push('.');
            name.push_str(part);
        }
    }
    name
}

fn shadow_hosts(doc: &Document, node: NodeId) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut current = doc.parent(node);
    while let Some(id) = current {
        current = match doc.host(id) {
            Some(host) => {
                hosts.push(short_name(doc, host));
                Some(host)
            }
            None => doc.parent(id),
        };
    }
    hosts.reverse();
    hosts
}

/// Writes command results to stdout, honoring color and quiet settings
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a result line; results are printed even in quiet mode
    pub fn result(&self, line: &str) {
        let _ = self.term.write_line(line);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Highlight a selector or engine name
    #[must_use]
    pub fn emphasize(&self, text: &str) -> String {
        if self.use_color {
            style(text).cyan().to_string()
        } else {
            text.to_string()
        }
    }
}
