//! Pierce: selector query engine with auto-waiting retrieval
//!
//! Pierce parses an extended selector grammar (css plus engine prefixes,
//! `>>` chaining, `:visible`, `:index(n, ...)` and the `:light` modifier),
//! evaluates it against a live document that may contain shadow roots, and
//! polls until a target state is reached or a timeout elapses.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ selector     │   │ engine       │   │ matcher      │   │ wait         │
//! │ parse+cache  │──►│ resolve once │──►│ one pass per │──►│ Polling →    │
//! │              │   │              │   │ tick         │   │ Resolved ... │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!                                              │
//!                                        ┌─────▼──────┐
//!                                        │ dom        │
//!                                        │ DomView    │
//!                                        └────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pierce::prelude::*;
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let host = doc.append_element(body, "div", &[])?;
//! let root = doc.attach_shadow(host, ShadowRootMode::Open)?;
//! let span = doc.append_element(root, "span", &[("id", "target")])?;
//!
//! let selectors = Selectors::new();
//! assert_eq!(selectors.query_selector(&doc, "id=target")?, Some(span));
//! assert_eq!(selectors.query_selector(&doc, "id:light=target")?, None);
//! # Ok::<(), PierceError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod config;
#[allow(clippy::missing_errors_doc)]
pub mod dom;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod engine;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
mod locator;
#[allow(clippy::missing_errors_doc)]
pub mod matcher;
mod result;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod selector;
#[allow(clippy::missing_errors_doc)]
mod selectors;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod wait;

pub use config::{
    GrammarGeneration, SelectorsConfig, ENV_DEFAULT_TIMEOUT_MS, ENV_GRAMMAR, ENV_POLL_INTERVAL_MS,
};
pub use dom::{Document, DocumentFixture, DomView, NodeId, ShadowRootMode, SharedDocument};
pub use engine::{EngineRegistry, EngineScope, SelectorEngine};
pub use locator::{Locator, LocatorOptions};
pub use matcher::{QueryPlan, TraversalMode};
pub use result::{PierceError, PierceResult};
pub use selector::SelectorExpression;
pub use selectors::Selectors;
pub use wait::{
    WaitForState, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};

/// Whether the process runs the extended selector grammar.
///
/// Controlled by `PIERCE_SELECTORS_GRAMMAR` (`legacy`/`v1` or
/// `extended`/`v2`); extended when unset.
#[must_use]
pub fn extended_grammar_enabled() -> bool {
    GrammarGeneration::from_env().is_extended()
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::dom::{
        BoundingBox, ComputedStyle, Display, Document, DocumentFixture, DomView, NodeId, NodeKind,
        ShadowRootMode, SharedDocument, Visibility,
    };
    pub use super::engine::{EngineRegistry, EngineScope, SelectorEngine};
    pub use super::selector::{parse, ParseCache, SelectorExpression};
    pub use super::wait::{WaitForState, WaitOptions, WaitResult};
    pub use super::{
        extended_grammar_enabled, GrammarGeneration, Locator, LocatorOptions, PierceError,
        PierceResult, QueryPlan, Selectors, SelectorsConfig, TraversalMode,
    };
    pub use tokio_util::sync::CancellationToken;
}
