//! Locator: a selector bound to a live document.
//!
//! Locators re-evaluate on every call, so they never hold stale element
//! handles. Waits go through the same polling controller as
//! [`Selectors::wait_for_selector`].

use crate::dom::{normalize_whitespace, DomView, NodeId, SharedDocument};
use crate::matcher::is_visible;
use crate::result::{PierceError, PierceResult};
use crate::selectors::Selectors;
use crate::wait::{WaitForState, WaitOptions};
use std::sync::Arc;
use std::time::Duration;

/// Locator options for customizing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for auto-waiting in milliseconds
    pub timeout_ms: u64,
    /// Polling interval for auto-waiting in milliseconds
    pub poll_interval_ms: u64,
    /// Whether to require strict single-element match
    pub strict: bool,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout_ms: crate::wait::DEFAULT_TIMEOUT_MS,
            poll_interval_ms: crate::wait::DEFAULT_POLL_INTERVAL_MS,
            strict: false,
        }
    }
}

impl LocatorOptions {
    /// Wait options for `state`
    #[must_use]
    pub const fn wait_options(&self, state: WaitForState) -> WaitOptions {
        WaitOptions {
            state,
            timeout_ms: self.timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
            strict: self.strict,
        }
    }
}

/// A selector bound to a [`SharedDocument`]
#[derive(Debug, Clone)]
pub struct Locator {
    selectors: Arc<Selectors>,
    document: SharedDocument,
    selector: String,
    options: LocatorOptions,
}

impl Locator {
    /// Create a locator; timeouts come from the `Selectors` configuration
    #[must_use]
    pub fn new(
        selectors: Arc<Selectors>,
        document: SharedDocument,
        selector: impl Into<String>,
    ) -> Self {
        let config = selectors.config();
        let options = LocatorOptions {
            timeout_ms: config.default_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
            strict: false,
        };
        Self {
            selectors,
            document,
            selector: selector.into(),
            options,
        }
    }

    /// Narrow to matches of `selector` inside this locator's matches
    #[must_use]
    pub fn locator(&self, selector: &str) -> Self {
        Self {
            selector: format!("{} >> {selector}", self.selector),
            ..self.clone()
        }
    }

    /// Set a custom timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the polling interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable strict mode
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Every current match
    pub fn all(&self) -> PierceResult<Vec<NodeId>> {
        let snapshot = self.document.snapshot(&self.selector)?;
        self.selectors.query_selector_all(&*snapshot, &self.selector)
    }

    /// Number of current matches
    pub fn count(&self) -> PierceResult<usize> {
        Ok(self.all()?.len())
    }

    /// First current match; strict locators fail on more than one
    pub fn first(&self) -> PierceResult<Option<NodeId>> {
        let matches = self.all()?;
        if self.options.strict && matches.len() > 1 {
            return Err(PierceError::StrictModeViolation {
                selector: self.selector.clone(),
                count: matches.len(),
            });
        }
        Ok(matches.first().copied())
    }

    /// Wait for `state` using this locator's timeout and poll interval
    pub async fn wait_for(&self, state: WaitForState) -> PierceResult<Option<NodeId>> {
        self.selectors
            .wait_for_selector(&self.document, &self.selector, self.options.wait_options(state))
            .await
    }

    /// Normalized text of the first match
    pub fn text_content(&self) -> PierceResult<Option<String>> {
        let Some(node) = self.first()? else {
            return Ok(None);
        };
        let snapshot = self.document.snapshot(&self.selector)?;
        Ok(Some(normalize_whitespace(&snapshot.text_content(node))))
    }

    /// Whether the first match is visible (false when nothing matches)
    pub fn is_visible(&self) -> PierceResult<bool> {
        let Some(node) = self.first()? else {
            return Ok(false);
        };
        let snapshot = self.document.snapshot(&self.selector)?;
        Ok(is_visible(&*snapshot, node))
    }
}
