//! Selector string parser.
//!
//! Parsing happens in two steps: the selector is split into `>>` clauses
//! (outside quotes, brackets and parentheses), then every css clause is
//! parsed by a small recursive descent parser over its characters.

use super::ast::{
    AttributeMatcher, AttributeSelector, Clause, ClauseBody, Combinator, ComplexPart,
    ComplexSelector, CompoundSelector, IndexPseudo, Nth, PseudoClass, SelectorExpression,
    SelectorList, CSS_ENGINE, TEXT_ENGINE,
};
use crate::config::GrammarGeneration;
use crate::result::{PierceError, PierceResult};

const LIGHT_SUFFIX: &str = ":light";

/// Parse a selector string with the given grammar generation
pub fn parse(selector: &str, grammar: GrammarGeneration) -> PierceResult<SelectorExpression> {
    let clauses = split_clauses(selector)?
        .into_iter()
        .map(|raw| parse_clause(selector, raw, grammar))
        .collect::<PierceResult<Vec<_>>>()?;
    Ok(SelectorExpression { clauses })
}

/// Split on `>>` at nesting depth zero
fn split_clauses(selector: &str) -> PierceResult<Vec<&str>> {
    let bytes = selector.as_bytes();
    let mut clauses = Vec::new();
    let mut quote: Option<u8> = None;
    let mut depth: Vec<u8> = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' | b'\'' => quote = Some(b),
            b'[' => depth.push(b']'),
            b'(' => depth.push(b')'),
            b']' | b')' => {
                if depth.pop() != Some(b) {
                    return Err(PierceError::syntax(
                        selector,
                        format!("unexpected '{}' at offset {i}", char::from(b)),
                    ));
                }
            }
            b'>' if depth.is_empty() && bytes.get(i + 1) == Some(&b'>') => {
                if bytes.get(i + 2) == Some(&b'>') {
                    return Err(PierceError::syntax(
                        selector,
                        format!("unknown combinator '>>>' at offset {i}"),
                    ));
                }
                clauses.push(&selector[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if quote.is_some() {
        return Err(PierceError::syntax(selector, "unterminated string"));
    }
    if let Some(close) = depth.last() {
        let what = if *close == b']' {
            "attribute selector"
        } else {
            "argument list"
        };
        return Err(PierceError::syntax(
            selector,
            format!("unterminated {what}, expected '{}'", char::from(*close)),
        ));
    }
    clauses.push(&selector[start.min(selector.len())..]);
    Ok(clauses)
}

fn parse_clause(selector: &str, raw: &str, grammar: GrammarGeneration) -> PierceResult<Clause> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(PierceError::syntax(selector, "empty selector clause"));
    }

    if is_quoted(text) {
        return Ok(Clause {
            engine: TEXT_ENGINE.to_string(),
            light: false,
            body: ClauseBody::Raw(text.to_string()),
        });
    }

    if let Some((prefix, body)) = engine_prefix(text) {
        let (name, light) = match prefix.strip_suffix(LIGHT_SUFFIX) {
            Some(name) => (name, true),
            None => (prefix, false),
        };
        if name.is_empty() || !name.chars().all(is_engine_name_char) {
            return Err(PierceError::syntax(
                selector,
                format!("invalid engine name '{name}'"),
            ));
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(PierceError::syntax(
                selector,
                format!("empty body for engine '{name}'"),
            ));
        }
        let engine = name.to_ascii_lowercase();
        if engine == CSS_ENGINE {
            let (list, trailing_light) = parse_css_clause(selector, body, grammar)?;
            return Ok(Clause {
                engine,
                light: light || trailing_light,
                body: ClauseBody::Css(list),
            });
        }
        return Ok(Clause {
            engine,
            light,
            body: ClauseBody::Raw(body.to_string()),
        });
    }

    let (list, light) = parse_css_clause(selector, text, grammar)?;
    Ok(Clause {
        engine: CSS_ENGINE.to_string(),
        light,
        body: ClauseBody::Css(list),
    })
}

fn is_quoted(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    if first != '"' && first != '\'' {
        return false;
    }
    let mut chars = text[1..].char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            chars.next();
        } else if ch == first {
            return i + 2 == text.len();
        }
    }
    false
}

const fn is_engine_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

/// `NAME[:light]=` at the start of a clause
fn engine_prefix(text: &str) -> Option<(&str, &str)> {
    let end = text
        .char_indices()
        .find(|(_, ch)| !(is_engine_name_char(*ch) || *ch == ':'))
        .map_or(text.len(), |(i, _)| i);
    if end == 0 || !text[end..].starts_with('=') {
        return None;
    }
    Some((&text[..end], &text[end + 1..]))
}

fn parse_css_clause(
    selector: &str,
    body: &str,
    grammar: GrammarGeneration,
) -> PierceResult<(SelectorList, bool)> {
    let (body, light) = match body.strip_suffix(LIGHT_SUFFIX) {
        Some(rest) if !rest.ends_with('\\') => {
            if !grammar.is_extended() {
                return Err(PierceError::syntax(
                    selector,
                    "the trailing ':light' modifier is not supported by the legacy grammar",
                ));
            }
            (rest.trim_end(), true)
        }
        _ => (body, false),
    };
    if body.is_empty() {
        return Err(PierceError::syntax(selector, "empty selector clause"));
    }
    let mut parser = CssParser::new(selector, body, grammar);
    let list = parser.parse_list(false)?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(parser.error(format!("unexpected '{ch}'")));
    }
    Ok((list, light))
}

/// Recursive descent parser for the css engine's selector lists
struct CssParser<'a> {
    selector: &'a str,
    chars: Vec<char>,
    pos: usize,
    grammar: GrammarGeneration,
}

impl<'a> CssParser<'a> {
    fn new(selector: &'a str, body: &str, grammar: GrammarGeneration) -> Self {
        Self {
            selector,
            chars: body.chars().collect(),
            pos: 0,
            grammar,
        }
    }

    fn error(&self, message: impl Into<String>) -> PierceError {
        PierceError::syntax(
            self.selector,
            format!("{} (at character {})", message.into(), self.pos),
        )
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> PierceResult<()> {
        if self.eat(expected) {
            return Ok(());
        }
        match self.peek() {
            Some(ch) => Err(self.error(format!("expected '{expected}', found '{ch}'"))),
            None => Err(self.error(format!("expected '{expected}'"))),
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self, nested: bool) -> PierceResult<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex(nested)?);
            self.skip_whitespace();
            if !self.eat(',') {
                break;
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self, nested: bool) -> PierceResult<ComplexSelector> {
        let mut parts = vec![ComplexPart {
            combinator: None,
            compound: self.parse_compound()?,
        }];
        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some(')') if nested => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(ch) => return Err(self.error(format!("unexpected '{ch}'"))),
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_whitespace();
                if let Some(ch @ ('>' | '+' | '~')) = self.peek() {
                    return Err(self.error(format!("unexpected combinator '{ch}'")));
                }
            }
            parts.push(ComplexPart {
                combinator: Some(combinator),
                compound: self.parse_compound()?,
            });
        }
        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> PierceResult<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        if self.eat('*') {
            compound.universal = true;
        } else if self.peek().is_some_and(is_ident_start) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.bump();
                    compound.pseudo_classes.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(match self.peek() {
                Some(ch) => self.error(format!("expected a selector, found '{ch}'")),
                None => self.error("expected a selector"),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> PierceResult<String> {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                match self.bump() {
                    Some(escaped) => ident.push(escaped),
                    None => return Err(self.error("dangling escape")),
                }
            } else if is_ident_char(ch) {
                ident.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(ident)
    }

    fn parse_string(&mut self) -> PierceResult<String> {
        let Some(quote @ ('"' | '\'')) = self.bump() else {
            return Err(self.error("expected a quoted string"));
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("unterminated string")),
                },
                Some(ch) if ch == quote => return Ok(value),
                Some(ch) => value.push(ch),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_attribute(&mut self) -> PierceResult<AttributeSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(AttributeSelector {
                name,
                matcher: AttributeMatcher::Exists,
            });
        }
        let op = match self.bump() {
            Some('=') => None,
            Some(op @ ('~' | '^' | '$' | '*' | '|')) => {
                self.expect('=')?;
                Some(op)
            }
            Some(ch) => return Err(self.error(format!("unexpected '{ch}' in attribute selector"))),
            None => return Err(self.error("unterminated attribute selector")),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some('"' | '\'') => self.parse_string()?,
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        self.expect(']')?;
        let matcher = match op {
            None => AttributeMatcher::Equals(value),
            Some('~') => AttributeMatcher::Includes(value),
            Some('^') => AttributeMatcher::Prefix(value),
            Some('$') => AttributeMatcher::Suffix(value),
            Some('*') => AttributeMatcher::Substring(value),
            Some(_) => AttributeMatcher::DashMatch(value),
        };
        Ok(AttributeSelector { name, matcher })
    }

    fn parse_pseudo(&mut self) -> PierceResult<PseudoClass> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        let has_args = self.peek() == Some('(');
        let pseudo = match name.as_str() {
            "visible" | "index" | "light" if !self.grammar.is_extended() => {
                return Err(self.error(format!(
                    "':{name}' is not supported by the legacy selector grammar"
                )));
            }
            "light" => {
                return Err(self.error("':light' is only allowed at the end of a clause"));
            }
            "visible" => PseudoClass::Visible,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "empty" => PseudoClass::Empty,
            "index" | "not" | "is" | "has-text" | "nth-child" => {
                if !has_args {
                    return Err(self.error(format!("':{name}' expects arguments")));
                }
                self.bump();
                let pseudo = self.parse_pseudo_args(&name)?;
                self.skip_whitespace();
                self.expect(')')?;
                return Ok(pseudo);
            }
            _ => return Err(self.error(format!("unknown pseudo-class ':{name}'"))),
        };
        if has_args {
            return Err(self.error(format!("':{name}' does not take arguments")));
        }
        Ok(pseudo)
    }

    fn parse_pseudo_args(&mut self, name: &str) -> PierceResult<PseudoClass> {
        self.skip_whitespace();
        match name {
            "index" => {
                let n = self.parse_index_position()?;
                self.skip_whitespace();
                if !self.eat(',') {
                    return Err(self.error("':index' expects at least one selector after the position"));
                }
                let list = self.parse_list(true)?;
                Ok(PseudoClass::Index(IndexPseudo {
                    n,
                    selectors: list.selectors,
                }))
            }
            "not" => Ok(PseudoClass::Not(self.parse_list(true)?)),
            "is" => Ok(PseudoClass::Is(self.parse_list(true)?)),
            "has-text" => {
                if matches!(self.peek(), Some('"' | '\'')) {
                    return Ok(PseudoClass::HasText(self.parse_string()?));
                }
                let start = self.pos;
                while self.peek().is_some_and(|ch| ch != ')') {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                let text = text.trim();
                if text.is_empty() {
                    return Err(self.error("':has-text' expects text"));
                }
                Ok(PseudoClass::HasText(text.to_string()))
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|ch| ch != ')') {
                    self.pos += 1;
                }
                let raw: String = self.chars[start..self.pos].iter().collect();
                match parse_nth(&raw) {
                    Some(nth) => Ok(PseudoClass::NthChild(nth)),
                    None => Err(self.error(format!("invalid ':nth-child' argument '{}'", raw.trim()))),
                }
            }
        }
    }

    fn parse_index_position(&mut self) -> PierceResult<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        match digits.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            Ok(_) => Err(self.error("':index' position must be 1 or greater")),
            Err(_) => Err(self.error("':index' expects a positive integer position")),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

/// `odd`, `even`, `an+b`, `b`
fn parse_nth(raw: &str) -> Option<Nth> {
    let compact: String = raw
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "" => return None,
        "odd" => return Some(Nth { a: 2, b: 1 }),
        "even" => return Some(Nth { a: 2, b: 0 }),
        _ => {}
    }
    let Some((a_part, b_part)) = compact.split_once('n') else {
        return compact.parse().ok().map(|b| Nth { a: 0, b });
    };
    let a = match a_part {
        "" | "+" => 1,
        "-" => -1,
        other => other.parse().ok()?,
    };
    let b = if b_part.is_empty() {
        0
    } else {
        if !b_part.starts_with(['+', '-']) {
            return None;
        }
        b_part.trim_start_matches('+').parse().ok()?
    };
    Some(Nth { a, b })
}
