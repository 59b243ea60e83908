//! Attribute shorthand and text engines.

use crate::dom::{normalize_whitespace, DomView, NodeId};
use regex::{Regex, RegexBuilder};

/// Attribute-shorthand engines and the attribute each one tests
pub const ATTRIBUTE_ENGINES: &[(&str, &str)] = &[
    ("id", "id"),
    ("data-testid", "data-testid"),
    ("data-test-id", "data-test-id"),
    ("data-test", "data-test"),
];

/// Attribute tested by an attribute-shorthand engine
#[must_use]
pub fn attribute_for_engine(engine: &str) -> Option<&'static str> {
    ATTRIBUTE_ENGINES
        .iter()
        .find(|(name, _)| *name == engine)
        .map(|(_, attribute)| *attribute)
}

/// Strip one pair of matching surrounding quotes
#[must_use]
pub fn unquote(body: &str) -> String {
    let body = body.trim();
    let mut chars = body.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('"' | '\'')), Some(close)) if open == close && body.len() >= 2 => {
            let inner = &body[1..body.len() - 1];
            let mut value = String::with_capacity(inner.len());
            let mut escaped = false;
            for ch in inner.chars() {
                if escaped {
                    value.push(ch);
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else {
                    value.push(ch);
                }
            }
            value
        }
        _ => body.to_string(),
    }
}

/// Elements among `candidates` whose `attribute` equals `value`
#[must_use]
pub fn match_attribute(
    dom: &dyn DomView,
    candidates: &[NodeId],
    attribute: &str,
    value: &str,
) -> Vec<NodeId> {
    candidates
        .iter()
        .copied()
        .filter(|&node| dom.attribute(node, attribute) == Some(value))
        .collect()
}

/// Compiled body of the text engine
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// `"text"`: whitespace-normalized equality
    Exact(String),
    /// `/re/flags`
    Pattern(Regex),
    /// bare text: case-insensitive substring
    Substring(String),
}

impl TextMatcher {
    /// Compile a text engine body
    pub fn compile(body: &str) -> Result<Self, String> {
        let body = body.trim();
        if body.len() >= 2 && (body.starts_with('"') || body.starts_with('\'')) {
            let first = body.chars().next();
            if body.chars().next_back() == first {
                return Ok(Self::Exact(normalize_whitespace(&unquote(body))));
            }
        }
        if let Some(rest) = body.strip_prefix('/') {
            if let Some(end) = rest.rfind('/') {
                let (pattern, flags) = (&rest[..end], &rest[end + 1..]);
                if let Some(flag) = flags.chars().find(|ch| !matches!(ch, 'i' | 's' | 'm')) {
                    return Err(format!("unsupported regex flag '{flag}'"));
                }
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(flags.contains('i'))
                    .dot_matches_new_line(flags.contains('s'))
                    .multi_line(flags.contains('m'))
                    .build()
                    .map_err(|e| format!("invalid text pattern: {e}"))?;
                return Ok(Self::Pattern(regex));
            }
        }
        Ok(Self::Substring(normalize_whitespace(body).to_lowercase()))
    }

    /// Test an element's text
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize_whitespace(text);
        match self {
            Self::Exact(expected) => text == *expected,
            Self::Pattern(regex) => regex.is_match(&text),
            Self::Substring(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }

    /// Innermost matching elements: the element's text matches and none of
    /// its element children's text does
    #[must_use]
    pub fn query(&self, dom: &dyn DomView, candidates: &[NodeId]) -> Vec<NodeId> {
        candidates
            .iter()
            .copied()
            .filter(|&node| {
                self.matches(&dom.text_content(node))
                    && !dom
                        .element_children(node)
                        .into_iter()
                        .any(|child| self.matches(&dom.text_content(child)))
            })
            .collect()
    }
}
