//! Selector grammar: clause splitting, css parsing, canonical printing and
//! parse memoization.

mod ast;
mod cache;
mod parser;

pub use ast::{
    AttributeMatcher, AttributeSelector, Clause, ClauseBody, Combinator, ComplexPart,
    ComplexSelector, CompoundSelector, IndexPseudo, Nth, PseudoClass, SelectorExpression,
    SelectorList, CSS_ENGINE, TEXT_ENGINE,
};
pub use cache::{ParseCache, DEFAULT_PARSE_CACHE_CAPACITY};
pub use parser::parse;
