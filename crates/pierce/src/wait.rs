//! Auto-waiting selector retrieval.
//!
//! A [`SelectorWait`] is the polling state machine; it never sleeps on its
//! own. Two drivers run it: [`wait_async`] (tokio, also woken by document
//! mutations) and [`wait_blocking`] (thread sleep).
//!
//! ```text
//! Polling ──tick: state holds──────────▶ Resolved
//!    │ ────tick at/after deadline─────▶ TimedOut
//!    │ ────token cancelled────────────▶ Cancelled
//!    └─────strict violation───────────▶ Failed
//! ```

use crate::dom::{DomView, NodeId, SharedDocument};
use crate::matcher::{is_visible, QueryPlan};
use crate::result::{PierceError, PierceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for selector waits (30 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Smallest accepted polling interval
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

/// Largest accepted polling interval
pub const MAX_POLL_INTERVAL_MS: u64 = 1_000;

// =============================================================================
// TARGET STATE
// =============================================================================

/// State a wait is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitForState {
    /// At least one element matches
    Attached,
    /// No element matches, or the one seen earlier went away
    Detached,
    /// The first match is visible
    #[default]
    Visible,
    /// Nothing matches or the first match is not visible
    Hidden,
}

impl WaitForState {
    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }

    /// Whether a successful wait yields an element
    #[must_use]
    pub const fn yields_element(self) -> bool {
        matches!(self, Self::Attached | Self::Visible)
    }
}

impl fmt::Display for WaitForState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitForState {
    type Err = PierceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attached" => Ok(Self::Attached),
            "detached" => Ok(Self::Detached),
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            other => Err(PierceError::Config {
                message: format!(
                    "unknown wait state '{other}' (expected attached, detached, visible or hidden)"
                ),
            }),
        }
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for selector waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Target state
    pub state: WaitForState,
    /// Timeout in milliseconds; 0 waits forever
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Fail when more than one element matches at resolution
    pub strict: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            state: WaitForState::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            strict: false,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target state
    #[must_use]
    pub const fn with_state(mut self, state: WaitForState) -> Self {
        self.state = state;
        self
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Enable strict mode
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Timeout as a Duration, `None` when waiting forever
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Poll interval clamped to the accepted range
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }
}

// =============================================================================
// REQUEST / RESULT
// =============================================================================

/// One call to wait for a selector
#[derive(Debug, Clone)]
pub struct WaitRequest {
    /// Unique id, recorded on the tracing span
    pub id: Uuid,
    /// The selector as written by the caller
    pub selector: String,
    /// Wait policy
    pub options: WaitOptions,
}

impl WaitRequest {
    /// Create a request with a fresh id
    #[must_use]
    pub fn new(selector: impl Into<String>, options: WaitOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            selector: selector.into(),
            options,
        }
    }
}

/// Outcome of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Matched element for attached/visible, `None` for detached/hidden
    pub element: Option<NodeId>,
    /// State that was reached
    pub state: WaitForState,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of evaluation passes
    pub ticks: u32,
}

/// Phase of a [`SelectorWait`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    /// Still evaluating
    Polling,
    /// Target state reached
    Resolved,
    /// Deadline passed
    TimedOut,
    /// Abandoned through the cancellation token
    Cancelled,
    /// Strict mode violation
    Failed,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Polling state machine for one [`WaitRequest`]
#[derive(Debug)]
pub struct SelectorWait {
    plan: Arc<QueryPlan>,
    request: WaitRequest,
    started: Instant,
    deadline: Option<Instant>,
    phase: WaitPhase,
    ticks: u32,
    observed: Option<NodeId>,
}

impl SelectorWait {
    /// Start waiting now; the deadline is fixed here
    #[must_use]
    pub fn new(plan: Arc<QueryPlan>, request: WaitRequest) -> Self {
        let started = Instant::now();
        let deadline = request
            .options
            .timeout()
            .and_then(|timeout| started.checked_add(timeout));
        Self {
            plan,
            request,
            started,
            deadline,
            phase: WaitPhase::Polling,
            ticks: 0,
            observed: None,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> WaitPhase {
        self.phase
    }

    /// The request being served
    #[must_use]
    pub const fn request(&self) -> &WaitRequest {
        &self.request
    }

    /// Evaluation passes so far
    #[must_use]
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Run one evaluation pass.
    ///
    /// `Ok(Some(_))` resolves the wait, `Ok(None)` asks for another tick and
    /// `Err(_)` is terminal.
    pub fn tick(&mut self, dom: &dyn DomView) -> PierceResult<Option<WaitResult>> {
        self.ensure_polling()?;
        self.ticks += 1;
        let matches = match self.plan.evaluate(dom) {
            Ok(matches) => matches,
            Err(err) if err.is_transient() => {
                tracing::debug!(tick = self.ticks, error = %err, "evaluation failed, retrying");
                return self.check_deadline();
            }
            Err(err) => {
                self.phase = WaitPhase::Failed;
                return Err(err);
            }
        };
        tracing::trace!(tick = self.ticks, matches = matches.len(), "evaluated selector");

        let first = matches.first().copied();
        let state = self.request.options.state;
        let resolved = match state {
            WaitForState::Attached => first.map(Some),
            WaitForState::Visible => first.filter(|&node| is_visible(dom, node)).map(Some),
            WaitForState::Hidden => match first {
                Some(node) if is_visible(dom, node) => None,
                _ => Some(None),
            },
            WaitForState::Detached => match self.observed {
                Some(observed) if !matches.contains(&observed) => Some(None),
                Some(_) => None,
                None if matches.is_empty() => Some(None),
                None => {
                    self.observed = first;
                    None
                }
            },
        };

        match resolved {
            Some(element) => {
                if self.request.options.strict && state.yields_element() && matches.len() > 1 {
                    self.phase = WaitPhase::Failed;
                    return Err(PierceError::StrictModeViolation {
                        selector: self.request.selector.clone(),
                        count: matches.len(),
                    });
                }
                self.phase = WaitPhase::Resolved;
                let result = WaitResult {
                    element,
                    state,
                    elapsed: self.started.elapsed(),
                    ticks: self.ticks,
                };
                tracing::debug!(
                    ticks = result.ticks,
                    elapsed_ms = duration_ms(result.elapsed),
                    "selector wait resolved"
                );
                Ok(Some(result))
            }
            None => self.check_deadline(),
        }
    }

    /// A tick whose snapshot could not be taken; counts as "no decision"
    pub fn skip_tick(&mut self, reason: &str) -> PierceResult<Option<WaitResult>> {
        self.ensure_polling()?;
        self.ticks += 1;
        tracing::warn!(tick = self.ticks, reason, "document snapshot unavailable");
        self.check_deadline()
    }

    /// Abandon the wait
    pub fn cancel(&mut self) -> PierceError {
        self.phase = WaitPhase::Cancelled;
        tracing::debug!(ticks = self.ticks, "selector wait cancelled");
        PierceError::Cancelled {
            selector: self.request.selector.clone(),
        }
    }

    /// How long to sleep before the next tick
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let interval = self.request.options.poll_interval();
        self.deadline.map_or(interval, |deadline| {
            interval.min(deadline.saturating_duration_since(Instant::now()))
        })
    }

    fn ensure_polling(&self) -> PierceResult<()> {
        if self.phase == WaitPhase::Polling {
            Ok(())
        } else {
            Err(PierceError::InvalidState {
                message: format!("wait for \"{}\" already finished", self.request.selector),
            })
        }
    }

    fn check_deadline(&mut self) -> PierceResult<Option<WaitResult>> {
        let Some(deadline) = self.deadline else {
            return Ok(None);
        };
        if Instant::now() < deadline {
            return Ok(None);
        }
        self.phase = WaitPhase::TimedOut;
        let elapsed_ms = duration_ms(self.started.elapsed());
        tracing::debug!(ticks = self.ticks, elapsed_ms, "selector wait timed out");
        Err(PierceError::Timeout {
            ms: self.request.options.timeout_ms,
            elapsed_ms,
            selector: self.request.selector.clone(),
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn tick_shared(wait: &mut SelectorWait, document: &SharedDocument) -> PierceResult<Option<WaitResult>> {
    match document.snapshot(&wait.request.selector) {
        Ok(snapshot) => wait.tick(&*snapshot),
        Err(err) => wait.skip_tick(&err.to_string()),
    }
}

// =============================================================================
// DRIVERS
// =============================================================================

/// Drive a wait on the tokio runtime.
///
/// Sleeps for the poll interval between ticks, waking early when the document
/// is mutated. Dropping the future abandons the wait.
#[tracing::instrument(
    name = "wait_for_selector",
    skip_all,
    fields(
        wait_id = %request.id,
        selector = %request.selector,
        state = %request.options.state,
        timeout_ms = request.options.timeout_ms,
    )
)]
pub async fn wait_async(
    plan: Arc<QueryPlan>,
    document: &SharedDocument,
    request: WaitRequest,
    cancel: Option<CancellationToken>,
) -> PierceResult<WaitResult> {
    let cancel = cancel.unwrap_or_default();
    let mut wait = SelectorWait::new(plan, request);
    tracing::debug!("selector wait started");
    loop {
        if cancel.is_cancelled() {
            return Err(wait.cancel());
        }
        let changed = document.changed();
        tokio::pin!(changed);
        changed.as_mut().enable();

        if let Some(result) = tick_shared(&mut wait, document)? {
            return Ok(result);
        }

        let delay = wait.next_delay();
        tokio::select! {
            () = cancel.cancelled() => return Err(wait.cancel()),
            () = tokio::time::sleep(delay) => {}
            () = changed.as_mut() => {}
        }
    }
}

/// Drive a wait on the current thread
pub fn wait_blocking(
    plan: Arc<QueryPlan>,
    document: &SharedDocument,
    request: WaitRequest,
    cancel: Option<&CancellationToken>,
) -> PierceResult<WaitResult> {
    let mut wait = SelectorWait::new(plan, request);
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(wait.cancel());
        }
        if let Some(result) = tick_shared(&mut wait, document)? {
            return Ok(result);
        }
        std::thread::sleep(wait.next_delay());
    }
}
