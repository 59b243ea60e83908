//! Public query API.

use crate::config::{GrammarGeneration, SelectorsConfig};
use crate::dom::{DomView, NodeId, SharedDocument};
use crate::engine::{EngineRegistry, SelectorEngine};
use crate::matcher::QueryPlan;
use crate::result::PierceResult;
use crate::selector::{ParseCache, SelectorExpression};
use crate::wait::{wait_async, wait_blocking, WaitOptions, WaitRequest, WaitResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum Registry {
    Global,
    Owned(Arc<EngineRegistry>),
}

impl Registry {
    fn get(&self) -> &EngineRegistry {
        match self {
            Self::Global => EngineRegistry::global(),
            Self::Owned(registry) => registry,
        }
    }
}

/// Selector engine entry point: parses, resolves and evaluates selectors,
/// immediately or with auto-waiting.
///
/// # Example
///
/// ```
/// use pierce::{Document, Selectors};
///
/// let mut doc = Document::new();
/// let body = doc.body();
/// let div = doc.append_element(body, "div", &[("id", "target")])?;
///
/// let selectors = Selectors::new();
/// assert_eq!(selectors.query_selector(&doc, "id=target")?, Some(div));
/// assert!(selectors.query_selector_all(&doc, "span")?.is_empty());
/// # Ok::<(), pierce::PierceError>(())
/// ```
#[derive(Debug)]
pub struct Selectors {
    config: SelectorsConfig,
    cache: ParseCache,
    registry: Registry,
}

impl Default for Selectors {
    fn default() -> Self {
        Self::new()
    }
}

impl Selectors {
    /// Default configuration, grammar taken from `PIERCE_SELECTORS_GRAMMAR`,
    /// engines from the process-wide registry
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SelectorsConfig::default().with_grammar(GrammarGeneration::from_env()))
    }

    /// Explicit configuration, engines from the process-wide registry
    #[must_use]
    pub fn with_config(config: SelectorsConfig) -> Self {
        Self {
            cache: ParseCache::new(config.parse_cache_capacity),
            config,
            registry: Registry::Global,
        }
    }

    /// Use a private engine registry instead of the process-wide one
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<EngineRegistry>) -> Self {
        self.registry = Registry::Owned(registry);
        self
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &SelectorsConfig {
        &self.config
    }

    /// Active grammar generation
    #[must_use]
    pub const fn grammar(&self) -> GrammarGeneration {
        self.config.grammar
    }

    /// Whether `:visible`, `:index` and trailing `:light` parse
    #[must_use]
    pub const fn supports_extended_grammar(&self) -> bool {
        self.config.grammar.is_extended()
    }

    /// Parse (memoized)
    pub fn parse(&self, selector: &str) -> PierceResult<Arc<SelectorExpression>> {
        self.cache.parse(selector, self.config.grammar)
    }

    /// Parse and resolve every engine; nothing is evaluated yet
    pub fn plan(&self, selector: &str) -> PierceResult<Arc<QueryPlan>> {
        let expression = self.parse(selector)?;
        QueryPlan::compile(selector, expression, self.registry.get()).map(Arc::new)
    }

    /// First match in document order
    pub fn query_selector(&self, dom: &dyn DomView, selector: &str) -> PierceResult<Option<NodeId>> {
        self.plan(selector)?.first(dom)
    }

    /// Every match in document order (empty when nothing matches)
    pub fn query_selector_all(&self, dom: &dyn DomView, selector: &str) -> PierceResult<Vec<NodeId>> {
        self.plan(selector)?.evaluate(dom)
    }

    /// Wait until `selector` reaches `options.state`.
    ///
    /// Resolves with the element for attached/visible and `None` for
    /// detached/hidden. Parse and engine errors surface before the first tick.
    pub async fn wait_for_selector(
        &self,
        document: &SharedDocument,
        selector: &str,
        options: WaitOptions,
    ) -> PierceResult<Option<NodeId>> {
        Ok(self.wait(document, selector, options, None).await?.element)
    }

    /// [`wait_for_selector`](Self::wait_for_selector) abandoned when `cancel` fires
    pub async fn wait_for_selector_with_cancel(
        &self,
        document: &SharedDocument,
        selector: &str,
        options: WaitOptions,
        cancel: CancellationToken,
    ) -> PierceResult<Option<NodeId>> {
        Ok(self
            .wait(document, selector, options, Some(cancel))
            .await?
            .element)
    }

    /// Blocking variant of [`wait_for_selector`](Self::wait_for_selector)
    pub fn wait_for_selector_blocking(
        &self,
        document: &SharedDocument,
        selector: &str,
        options: WaitOptions,
    ) -> PierceResult<Option<NodeId>> {
        let plan = self.plan(selector)?;
        let request = WaitRequest::new(selector, options);
        Ok(wait_blocking(plan, document, request, None)?.element)
    }

    /// Full wait outcome, including elapsed time and tick count
    pub async fn wait(
        &self,
        document: &SharedDocument,
        selector: &str,
        options: WaitOptions,
        cancel: Option<CancellationToken>,
    ) -> PierceResult<WaitResult> {
        let plan = self.plan(selector)?;
        let request = WaitRequest::new(selector, options);
        wait_async(plan, document, request, cancel).await
    }

    /// Register a user engine with this instance's registry
    pub fn register_engine(&self, name: &str, engine: Arc<dyn SelectorEngine>) -> PierceResult<()> {
        self.registry.get().register(name, engine)
    }

    /// Every resolvable engine name
    #[must_use]
    pub fn engine_names(&self) -> Vec<String> {
        self.registry.get().names()
    }
}
