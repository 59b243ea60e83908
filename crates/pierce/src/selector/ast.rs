//! Parsed selector expressions.
//!
//! `Display` renders the canonical form of every node; parsing the canonical
//! form yields a structurally equal tree.

use serde::Serialize;
use std::fmt;

/// Name of the default engine
pub const CSS_ENGINE: &str = "css";

/// Name of the text engine (also used by quoted clauses)
pub const TEXT_ENGINE: &str = "text";

/// A whole selector: clauses chained with `>>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorExpression {
    /// Clauses, evaluated left to right
    pub clauses: Vec<Clause>,
}

impl SelectorExpression {
    /// Engine names used by this expression, in clause order, deduplicated
    #[must_use]
    pub fn engine_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for clause in &self.clauses {
            if !names.contains(&clause.engine.as_str()) {
                names.push(&clause.engine);
            }
        }
        names
    }
}

/// One `>>`-separated clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    /// Engine evaluating the clause
    pub engine: String,
    /// Light-DOM only traversal (`engine:light=` or trailing `:light`)
    pub light: bool,
    /// Clause body
    pub body: ClauseBody,
}

/// Body of a clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClauseBody {
    /// Parsed CSS selector list (the `css` engine)
    Css(SelectorList),
    /// Raw body handed to a non-css engine
    Raw(String),
}

/// Comma-separated complex selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorList {
    /// Alternatives
    pub selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexSelector {
    /// Parts left to right; the first part has no combinator
    pub parts: Vec<ComplexPart>,
}

/// A compound selector and its relation to the part on its left
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexPart {
    /// Combinator linking this part to the previous one
    pub combinator: Option<Combinator>,
    /// The compound selector
    pub compound: CompoundSelector,
}

/// CSS combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

/// Simple selectors that must all match one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompoundSelector {
    /// Lower-case type selector
    pub tag: Option<String>,
    /// `*`
    pub universal: bool,
    /// `#id` selectors
    pub ids: Vec<String>,
    /// `.class` selectors
    pub classes: Vec<String>,
    /// `[attr...]` selectors
    pub attributes: Vec<AttributeSelector>,
    /// `:pseudo` selectors
    pub pseudo_classes: Vec<PseudoClass>,
}

impl CompoundSelector {
    /// Whether nothing was parsed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

/// `[name op value]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSelector {
    /// Lower-case attribute name
    pub name: String,
    /// Value test
    pub matcher: AttributeMatcher,
}

/// Attribute value tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttributeMatcher {
    /// `[a]`
    Exists,
    /// `[a=v]`
    Equals(String),
    /// `[a~=v]`
    Includes(String),
    /// `[a^=v]`
    Prefix(String),
    /// `[a$=v]`
    Suffix(String),
    /// `[a*=v]`
    Substring(String),
    /// `[a|=v]`
    DashMatch(String),
}

impl AttributeMatcher {
    /// Test an attribute value
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exists => true,
            Self::Equals(expected) => value == expected,
            Self::Includes(expected) => value.split_whitespace().any(|word| word == expected),
            Self::Prefix(expected) => !expected.is_empty() && value.starts_with(expected.as_str()),
            Self::Suffix(expected) => !expected.is_empty() && value.ends_with(expected.as_str()),
            Self::Substring(expected) => !expected.is_empty() && value.contains(expected.as_str()),
            Self::DashMatch(expected) => {
                value == expected
                    || value
                        .strip_prefix(expected.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

/// Pseudo-classes understood by the css engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PseudoClass {
    /// `:visible`
    Visible,
    /// `:index(n, selector, ...)`
    Index(IndexPseudo),
    /// `:not(list)`
    Not(SelectorList),
    /// `:is(list)`
    Is(SelectorList),
    /// `:has-text("text")`
    HasText(String),
    /// `:first-child`
    FirstChild,
    /// `:last-child`
    LastChild,
    /// `:only-child`
    OnlyChild,
    /// `:nth-child(an+b)`
    NthChild(Nth),
    /// `:empty`
    Empty,
}

/// Arguments of `:index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPseudo {
    /// 1-based position in the union
    pub n: usize,
    /// Sub-selectors whose matches are unioned
    pub selectors: Vec<ComplexSelector>,
}

/// `an+b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Nth {
    /// Step
    pub a: i64,
    /// Offset
    pub b: i64,
}

impl Nth {
    /// Whether the 1-based `position` is selected
    #[must_use]
    pub const fn matches(&self, position: i64) -> bool {
        // Overflow means the offset is out of reach of any real position
        let Some(delta) = position.checked_sub(self.b) else {
            return false;
        };
        if self.a == 0 {
            return delta == 0;
        }
        match (delta.checked_rem(self.a), delta.checked_div(self.a)) {
            (Some(0), Some(steps)) => steps >= 0,
            _ => false,
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{ch}")?;
    }
    f.write_str("\"")
}

fn write_ident(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            write!(f, "{ch}")?;
        } else {
            write!(f, "\\{ch}")?;
        }
    }
    Ok(())
}

impl fmt::Display for SelectorExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let light = if self.light { ":light" } else { "" };
        match &self.body {
            ClauseBody::Css(list) if self.light => write!(f, "{CSS_ENGINE}{light}={list}"),
            ClauseBody::Css(list) => write!(f, "{list}"),
            ClauseBody::Raw(body) => write!(f, "{}{light}={body}", self.engine),
        }
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part.combinator {
                None => {}
                Some(Combinator::Descendant) => f.write_str(" ")?,
                Some(Combinator::Child) => f.write_str(" > ")?,
                Some(Combinator::NextSibling) => f.write_str(" + ")?,
                Some(Combinator::SubsequentSibling) => f.write_str(" ~ ")?,
            }
            write!(f, "{}", part.compound)?;
        }
        Ok(())
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write_ident(f, tag)?;
        } else if self.universal {
            f.write_str("*")?;
        }
        for id in &self.ids {
            f.write_str("#")?;
            write_ident(f, id)?;
        }
        for class in &self.classes {
            f.write_str(".")?;
            write_ident(f, class)?;
        }
        for attribute in &self.attributes {
            write!(f, "{attribute}")?;
        }
        for pseudo in &self.pseudo_classes {
            write!(f, "{pseudo}")?;
        }
        Ok(())
    }
}

impl fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        write_ident(f, &self.name)?;
        let (op, value) = match &self.matcher {
            AttributeMatcher::Exists => return f.write_str("]"),
            AttributeMatcher::Equals(v) => ("=", v),
            AttributeMatcher::Includes(v) => ("~=", v),
            AttributeMatcher::Prefix(v) => ("^=", v),
            AttributeMatcher::Suffix(v) => ("$=", v),
            AttributeMatcher::Substring(v) => ("*=", v),
            AttributeMatcher::DashMatch(v) => ("|=", v),
        };
        f.write_str(op)?;
        write_quoted(f, value)?;
        f.write_str("]")
    }
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => f.write_str(":visible"),
            Self::Index(index) => {
                write!(f, ":index({}", index.n)?;
                for selector in &index.selectors {
                    write!(f, ", {selector}")?;
                }
                f.write_str(")")
            }
            Self::Not(list) => write!(f, ":not({list})"),
            Self::Is(list) => write!(f, ":is({list})"),
            Self::HasText(text) => {
                f.write_str(":has-text(")?;
                write_quoted(f, text)?;
                f.write_str(")")
            }
            Self::FirstChild => f.write_str(":first-child"),
            Self::LastChild => f.write_str(":last-child"),
            Self::OnlyChild => f.write_str(":only-child"),
            Self::NthChild(nth) => write!(f, ":nth-child({}n{:+})", nth.a, nth.b),
            Self::Empty => f.write_str(":empty"),
        }
    }
}
