//! Selector engine registry.
//!
//! Built-in engines are closed variants of [`Engine`]. User engines implement
//! [`SelectorEngine`] and are registered once, process-wide, through
//! [`EngineRegistry::global`]. Registration is additive: built-ins and
//! existing names can never be replaced.

mod builtin;

pub use builtin::{
    attribute_for_engine, match_attribute, unquote, TextMatcher, ATTRIBUTE_ENGINES,
};

use crate::dom::{DomView, NodeId};
use crate::matcher::{descendants, TraversalMode};
use crate::result::{PierceError, PierceResult};
use crate::selector::{SelectorExpression, CSS_ENGINE, TEXT_ENGINE};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// A user-defined selector engine
pub trait SelectorEngine: Send + Sync {
    /// Elements inside `scope` matching `body`.
    ///
    /// Results may be in any order and contain duplicates; the matcher sorts
    /// them into document order and drops anything outside `scope`. Errors
    /// are reported as evaluation failures.
    fn query_all(&self, scope: &EngineScope<'_>, body: &str) -> Result<Vec<NodeId>, String>;
}

impl<F> SelectorEngine for F
where
    F: Fn(&EngineScope<'_>, &str) -> Result<Vec<NodeId>, String> + Send + Sync,
{
    fn query_all(&self, scope: &EngineScope<'_>, body: &str) -> Result<Vec<NodeId>, String> {
        self(scope, body)
    }
}

/// What a user engine gets to search
pub struct EngineScope<'a> {
    dom: &'a dyn DomView,
    root: NodeId,
    mode: TraversalMode,
}

impl<'a> EngineScope<'a> {
    /// Scope rooted at `root`
    #[must_use]
    pub fn new(dom: &'a dyn DomView, root: NodeId, mode: TraversalMode) -> Self {
        Self { dom, root, mode }
    }

    /// The document being searched
    #[must_use]
    pub fn dom(&self) -> &'a dyn DomView {
        self.dom
    }

    /// Scope root (never part of the result)
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Traversal mode requested by the clause
    #[must_use]
    pub const fn mode(&self) -> TraversalMode {
        self.mode
    }

    /// Candidate elements in traversal order
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        descendants(self.dom, self.root, self.mode)
    }
}

/// A resolved engine
#[derive(Clone)]
pub enum Engine {
    /// Parsed css selector lists
    Css,
    /// Attribute equality shorthand (`id=`, `data-testid=`, ...)
    Attribute(&'static str),
    /// Text content matching
    Text,
    /// Registered user engine
    Custom(Arc<dyn SelectorEngine>),
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css => f.write_str("Css"),
            Self::Attribute(attribute) => f.debug_tuple("Attribute").field(attribute).finish(),
            Self::Text => f.write_str("Text"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Whether `name` is a legal engine name (`[A-Za-z0-9_-]+`)
#[must_use]
pub fn is_valid_engine_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// Names of the built-in engines
#[must_use]
pub fn builtin_engine_names() -> Vec<&'static str> {
    let mut names = vec![CSS_ENGINE, TEXT_ENGINE];
    names.extend(ATTRIBUTE_ENGINES.iter().map(|(name, _)| *name));
    names
}

fn builtin(name: &str) -> Option<Engine> {
    match name {
        CSS_ENGINE => Some(Engine::Css),
        TEXT_ENGINE => Some(Engine::Text),
        other => attribute_for_engine(other).map(Engine::Attribute),
    }
}

/// Name → engine map
#[derive(Default)]
pub struct EngineRegistry {
    custom: RwLock<BTreeMap<String, Arc<dyn SelectorEngine>>>,
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

impl EngineRegistry {
    /// Registry holding only the built-ins
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<EngineRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Register a user engine under `name` (case-insensitive)
    pub fn register(&self, name: &str, engine: Arc<dyn SelectorEngine>) -> PierceResult<()> {
        if !is_valid_engine_name(name) {
            return Err(PierceError::InvalidEngineName {
                name: name.to_string(),
            });
        }
        let key = name.to_ascii_lowercase();
        if builtin(&key).is_some() {
            return Err(PierceError::EngineAlreadyRegistered { name: key });
        }
        let mut custom = self.custom.write().map_err(|_| PierceError::InvalidState {
            message: "engine registry lock poisoned".to_string(),
        })?;
        if custom.contains_key(&key) {
            return Err(PierceError::EngineAlreadyRegistered { name: key });
        }
        tracing::info!(engine = %key, "registered selector engine");
        custom.insert(key, engine);
        Ok(())
    }

    /// Look up an engine; `selector` is only used for the error
    pub fn resolve(&self, name: &str, selector: &str) -> PierceResult<Engine> {
        let key = name.to_ascii_lowercase();
        if let Some(engine) = builtin(&key) {
            return Ok(engine);
        }
        let custom = self.custom.read().map_err(|_| PierceError::InvalidState {
            message: "engine registry lock poisoned".to_string(),
        })?;
        custom
            .get(&key)
            .map(|engine| Engine::Custom(Arc::clone(engine)))
            .ok_or_else(|| PierceError::UnknownEngine {
                name: name.to_string(),
                selector: selector.to_string(),
            })
    }

    /// Resolve the engine of every clause, in clause order
    pub fn resolve_expression(
        &self,
        expression: &SelectorExpression,
        selector: &str,
    ) -> PierceResult<Vec<Engine>> {
        expression
            .clauses
            .iter()
            .map(|clause| self.resolve(&clause.engine, selector))
            .collect()
    }

    /// Whether `name` resolves
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        builtin(&key).is_some()
            || self
                .custom
                .read()
                .is_ok_and(|custom| custom.contains_key(&key))
    }

    /// Built-in names followed by registered names (sorted)
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = builtin_engine_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Ok(custom) = self.custom.read() {
            names.extend(custom.keys().cloned());
        }
        names
    }
}
