//! Selector engine configuration.
//!
//! Values come from [`SelectorsConfig::default`], an optional YAML file and
//! `PIERCE_*` environment variables, in that order of precedence (lowest
//! first).

use crate::result::{PierceError, PierceResult};
use crate::selector::DEFAULT_PARSE_CACHE_CAPACITY;
use crate::wait::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variable selecting the grammar generation
pub const ENV_GRAMMAR: &str = "PIERCE_SELECTORS_GRAMMAR";

/// Environment variable overriding the poll interval
pub const ENV_POLL_INTERVAL_MS: &str = "PIERCE_POLL_INTERVAL_MS";

/// Environment variable overriding the default wait timeout
pub const ENV_DEFAULT_TIMEOUT_MS: &str = "PIERCE_DEFAULT_TIMEOUT_MS";

/// Selector grammar generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammarGeneration {
    /// Plain css plus engine prefixes; no `:visible`, `:index` or trailing `:light`
    #[serde(alias = "v1")]
    Legacy,
    /// Full grammar
    #[default]
    #[serde(alias = "v2")]
    Extended,
}

impl GrammarGeneration {
    /// Whether `:visible`, `:index` and trailing `:light` are available
    #[must_use]
    pub const fn is_extended(self) -> bool {
        matches!(self, Self::Extended)
    }

    /// Generation selected by `PIERCE_SELECTORS_GRAMMAR`, default when unset
    /// or unrecognized
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(ENV_GRAMMAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Extended => "extended",
        }
    }
}

impl fmt::Display for GrammarGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrammarGeneration {
    type Err = PierceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "v1" => Ok(Self::Legacy),
            "extended" | "v2" => Ok(Self::Extended),
            other => Err(PierceError::Config {
                message: format!("unknown selector grammar '{other}' (expected legacy or extended)"),
            }),
        }
    }
}

/// Configuration of a [`Selectors`](crate::Selectors) instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorsConfig {
    /// Grammar generation used for parsing
    pub grammar: GrammarGeneration,
    /// Timeout applied by [`Locator`](crate::Locator) waits
    pub default_timeout_ms: u64,
    /// Poll interval applied by [`Locator`](crate::Locator) waits
    pub poll_interval_ms: u64,
    /// Number of parsed selectors to memoize
    pub parse_cache_capacity: usize,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            grammar: GrammarGeneration::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            parse_cache_capacity: DEFAULT_PARSE_CACHE_CAPACITY,
        }
    }
}

impl SelectorsConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> PierceResult<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(source: &str) -> PierceResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Load a YAML file
    pub fn load(path: impl AsRef<Path>) -> PierceResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    /// Apply `PIERCE_*` overrides looked up through `lookup`
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> PierceResult<Self> {
        if let Some(value) = lookup(ENV_GRAMMAR) {
            self.grammar = value.parse()?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_ms(ENV_POLL_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_TIMEOUT_MS) {
            self.default_timeout_ms = parse_ms(ENV_DEFAULT_TIMEOUT_MS, &value)?;
        }
        Ok(self)
    }

    /// Set the grammar generation
    #[must_use]
    pub const fn with_grammar(mut self, grammar: GrammarGeneration) -> Self {
        self.grammar = grammar;
        self
    }

    /// Set the default wait timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the default poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set the parse cache capacity (0 disables memoization)
    #[must_use]
    pub const fn with_parse_cache_capacity(mut self, capacity: usize) -> Self {
        self.parse_cache_capacity = capacity;
        self
    }
}

fn parse_ms(key: &str, value: &str) -> PierceResult<u64> {
    value.trim().parse().map_err(|_| PierceError::Config {
        message: format!("{key} must be a whole number of milliseconds, got '{value}'"),
    })
}
