//! Bounded memo of parsed selectors.

use super::ast::SelectorExpression;
use super::parser;
use crate::config::GrammarGeneration;
use crate::result::{PierceError, PierceResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Default number of memoized selectors
pub const DEFAULT_PARSE_CACHE_CAPACITY: usize = 256;

type CacheKey = (GrammarGeneration, String);

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<SelectorExpression>>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

/// Memoizes successful parses per selector string, evicting the oldest entry
/// once `capacity` is reached. Failed parses are never stored.
#[derive(Debug)]
pub struct ParseCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(DEFAULT_PARSE_CACHE_CAPACITY)
    }
}

impl ParseCache {
    /// Create a cache; a capacity of zero disables memoization
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Maximum number of entries
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Parse through the cache
    pub fn parse(
        &self,
        selector: &str,
        grammar: GrammarGeneration,
    ) -> PierceResult<Arc<SelectorExpression>> {
        if self.capacity == 0 {
            return parser::parse(selector, grammar).map(Arc::new);
        }
        let key = (grammar, selector.to_string());
        {
            let mut state = self.lock()?;
            if let Some(expr) = state.entries.get(&key).cloned() {
                state.hits += 1;
                return Ok(expr);
            }
            state.misses += 1;
        }

        let expr = Arc::new(parser::parse(selector, grammar)?);

        let mut state = self.lock()?;
        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.capacity {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
            }
            state.order.push_back(key.clone());
            state.entries.insert(key, Arc::clone(&expr));
        }
        Ok(expr)
    }

    /// Number of memoized selectors
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |state| state.entries.len())
    }

    /// Whether nothing is memoized
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` since creation
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        self.lock()
            .map_or((0, 0), |state| (state.hits, state.misses))
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Ok(mut state) = self.lock() {
            state.entries.clear();
            state.order.clear();
        }
    }

    fn lock(&self) -> PierceResult<std::sync::MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| PierceError::InvalidState {
            message: "parse cache lock poisoned".to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_expression() {
        let cache = ParseCache::new(4);
        let a = cache.parse("div > span", GrammarGeneration::Extended).unwrap();
        let b = cache.parse("div > span", GrammarGeneration::Extended).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = ParseCache::new(4);
        assert!(cache.parse("div >>> span", GrammarGeneration::Extended).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_grammar_is_part_of_the_key() {
        let cache = ParseCache::new(4);
        assert!(cache.parse("div:visible", GrammarGeneration::Extended).is_ok());
        assert!(cache.parse("div:visible", GrammarGeneration::Legacy).is_err());
    }

    #[test]
    fn test_evicts_oldest_entry() {
        let cache = ParseCache::new(2);
        let first = cache.parse("a", GrammarGeneration::Extended).unwrap();
        cache.parse("b", GrammarGeneration::Extended).unwrap();
        cache.parse("c", GrammarGeneration::Extended).unwrap();
        assert_eq!(cache.len(), 2);
        let again = cache.parse("a", GrammarGeneration::Extended).unwrap();
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_zero_capacity_disables_memoization() {
        let cache = ParseCache::new(0);
        cache.parse("a", GrammarGeneration::Extended).unwrap();
        assert!(cache.is_empty());
        cache.clear();
        assert_eq!(cache.capacity(), 0);
    }
}
